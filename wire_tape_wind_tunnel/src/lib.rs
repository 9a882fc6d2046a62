// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmark fixtures for `wire_tape`: representative layouts and cheap gateways.

use wire_tape::asm::ProgramBuilder;
use wire_tape::gateway::{FieldCall, FieldValue, Gateway, GatewayError, Mode, Scalar};
use wire_tape::opcode::Opcode;
use wire_tape::trace::TraceMask;
use wire_tape::verifier::VerifiedProgram;
use wire_tape::vm::{Limits, Vm};

/// Limits that never trip on the fixtures.
pub fn wide_open_limits() -> Limits {
    Limits {
        max_scope_depth: 64,
        max_array_len: u64::MAX,
        fuel: u64::MAX,
    }
}

/// `frame { magic, seq: u32, readings: [reading { id: u16, value: i32, scaled: u16 }] * u16 } + crc32`
pub fn sensor_frame() -> VerifiedProgram {
    let mut pb = ProgramBuilder::new();
    let frame = pb.key("frame");
    let magic = pb.key("magic");
    let seq = pb.key("seq");
    let readings = pb.key("readings");
    let reading = pb.key("reading");
    let id = pb.key("id");
    let value = pb.key("value");
    let scaled = pb.key("scaled");
    pb.asm()
        .endian_be()
        .enter_struct(frame)
        .const_check(magic, Opcode::IoU16, 0xF00D)
        .io_u32(seq)
        .arr_u16(readings)
        .enter_struct(reading)
        .io_u16(id)
        .io_i32(value)
        .scale_lin(0.01, 0.0)
        .io_u16(scaled)
        .exit_struct()
        .arr_end()
        .exit_struct()
        .crc32(0x04C1_1DB7, 0xFFFF_FFFF, 0xFFFF_FFFF, 0b11);
    fixture(pb)
}

/// Wire size of [`sensor_frame`] with `n` readings.
pub fn sensor_frame_len(n: usize) -> usize {
    2 + 4 + 2 + n * (2 + 4 + 2) + 4
}

/// `fields` consecutive 5-bit fields, padded to a byte boundary.
pub fn bit_run(fields: u32) -> VerifiedProgram {
    let mut pb = ProgramBuilder::new();
    let key = pb.key("bits");
    for _ in 0..fields {
        pb.asm().bit_u(key, 5);
    }
    pb.asm().align_fill(false);
    fixture(pb)
}

/// Wire size of [`bit_run`].
pub fn bit_run_len(fields: u32) -> usize {
    (fields as usize * 5).div_ceil(8)
}

/// `names: [name: str_u8] * u16`.
pub fn string_list() -> VerifiedProgram {
    let mut pb = ProgramBuilder::new();
    let names = pb.key("names");
    let name = pb.key("name");
    pb.asm().arr_u16(names).str_u8(name).arr_end();
    fixture(pb)
}

/// Wire size of [`string_list`] with `n` copies of [`NAME`].
pub fn string_list_len(n: usize) -> usize {
    2 + n * (1 + NAME.len())
}

/// The string [`Filler`] stages for every string field.
pub const NAME: &str = "sensor-node-0042";

fn fixture(pb: ProgramBuilder) -> VerifiedProgram {
    match pb.build_verified() {
        Ok(p) => p,
        Err(e) => panic!("benchmark fixture failed to build: {e}"),
    }
}

/// Encode-side gateway answering every field with deterministic data and every array with
/// `count` elements.
#[derive(Copy, Clone, Debug)]
pub struct Filler {
    /// Elements per array.
    pub count: u64,
    n: u64,
}

impl Filler {
    /// Creates a filler producing `count`-element arrays.
    pub fn new(count: u64) -> Self {
        Self { count, n: 0 }
    }
}

impl Gateway for Filler {
    fn field(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        self.n = self.n.wrapping_add(1);
        match value {
            FieldValue::None | FieldValue::Absent | FieldValue::Text(_) => Ok(()),
            FieldValue::Wire(mut w) => w.set_raw(self.n),
            FieldValue::Scalar(s) => {
                *s = match *s {
                    Scalar::U64(_) if call.opcode.is_array_start() => Scalar::U64(self.count),
                    Scalar::U64(_) => Scalar::U64(self.n),
                    Scalar::I64(_) => Scalar::I64(self.n as i64),
                    Scalar::F64(_) => Scalar::F64((self.n % 600) as f64 * 0.25),
                    Scalar::Bool(_) => Scalar::Bool(self.n & 1 == 1),
                };
                Ok(())
            }
            FieldValue::TextSlot(mut t) => {
                t.set_str(NAME);
                Ok(())
            }
        }
    }
}

/// Decode-side gateway folding every value into a checksum.
#[derive(Copy, Clone, Debug, Default)]
pub struct Checksum {
    /// Running fold of every value seen.
    pub sum: u64,
}

impl Gateway for Checksum {
    fn field(&mut self, _call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        let v = match value {
            FieldValue::None | FieldValue::Absent | FieldValue::TextSlot(_) => 0,
            FieldValue::Wire(w) => w.raw().unwrap_or(w.len() as u64),
            FieldValue::Scalar(s) => s.as_u64(),
            FieldValue::Text(t) => t.len() as u64,
        };
        self.sum = self.sum.rotate_left(5) ^ v;
        Ok(())
    }
}

/// Encodes `program` with a [`Filler`] of `count`, returning exactly the bytes written.
pub fn encoded(program: &VerifiedProgram, count: u64, capacity: usize) -> Vec<u8> {
    let mut buf = vec![0_u8; capacity];
    let mut vm = Vm::new(Filler::new(count), wide_open_limits());
    match vm.run(
        program.program(),
        &mut buf,
        Mode::Encode,
        TraceMask::NONE,
        None,
    ) {
        Ok(summary) => buf.truncate(summary.bytes),
        Err(e) => panic!("benchmark fixture failed to encode: {e}"),
    }
    buf
}
