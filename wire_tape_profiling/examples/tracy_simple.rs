// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simple Tracy-backed example for `wire_tape_profiling`.
//!
//! Run with:
//! `cargo run -p wire_tape_profiling --example tracy_simple --features tracy`

use wire_tape::asm::ProgramBuilder;
use wire_tape::gateway::{FieldValue, GatewayError, Mode, Scalar, from_fn};
use wire_tape::opcode::Opcode;
use wire_tape::trace::TraceSink;
use wire_tape::verifier::VerifiedProgram;
use wire_tape::vm::{ExecutionContext, Limits, Vm};

use wire_tape_profiling::ProfilingTraceSink;

/// `frame { magic, seq: u32, readings: [reading { channel: u4, raw: i12 }] * u16 } + crc32`
fn build_program() -> VerifiedProgram {
    let mut pb = ProgramBuilder::new();
    let frame = pb.key("frame");
    let magic = pb.key("magic");
    let seq = pb.key("seq");
    let readings = pb.key("readings");
    let reading = pb.key("reading");
    let channel = pb.key("channel");
    let raw = pb.key("raw");
    pb.asm()
        .endian_be()
        .enter_struct(frame)
        .const_check(magic, Opcode::IoU16, 0xF00D)
        .io_u32(seq)
        .arr_u16(readings)
        .enter_struct(reading)
        .bit_u(channel, 4)
        .bit_i(raw, 12)
        .exit_struct()
        .arr_end()
        .exit_struct()
        .crc32(0x04C1_1DB7, 0xFFFF_FFFF, 0xFFFF_FFFF, 0b11);
    pb.build_verified().unwrap()
}

const READINGS: u64 = 64;

fn main() {
    // Tracy requires the client to be started before instrumentation.
    let _tracy = tracy_client::Client::start();
    println!("Waiting for Tracy connection...");
    let start = std::time::Instant::now();
    while !tracy_client::Client::is_connected()
        && start.elapsed() < std::time::Duration::from_secs(5)
    {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    if tracy_client::Client::is_connected() {
        println!("Tracy connected.");
    } else {
        println!("No Tracy connection detected; continuing.");
    }

    let program = build_program();
    let mut buf = vec![0_u8; 2 + 4 + 2 + 2 * READINGS as usize + 4];

    let mut n = 0_u64;
    let gateway = from_fn(move |call, value| match value {
        FieldValue::Wire(mut w) => w.set_u32(7),
        FieldValue::Scalar(s) => {
            *s = match call.opcode {
                Opcode::ArrU16 => Scalar::U64(READINGS),
                Opcode::IoBitU => Scalar::U64(n % 16),
                Opcode::IoBitI => {
                    n += 1;
                    Scalar::I64(n as i64 * 13 - 400)
                }
                _ => return Err(GatewayError::TypeMismatch),
            };
            Ok(())
        }
        _ => Ok(()),
    });
    let mut vm = Vm::new(gateway, Limits::default());
    let mut ctx = ExecutionContext::new();
    let mut sink = ProfilingTraceSink::default();
    let mask = sink.mask();

    let encoded = vm
        .run_with_ctx(
            &mut ctx,
            program.program(),
            &mut buf,
            Mode::Encode,
            mask,
            Some(&mut sink),
        )
        .expect("encode failed");

    let mut fields = 0_usize;
    let mut vm = Vm::new(
        from_fn(|_, _| {
            fields += 1;
            Ok(())
        }),
        Limits::default(),
    );
    let decoded = vm
        .run_with_ctx(
            &mut ctx,
            program.program(),
            &mut buf,
            Mode::Decode,
            mask,
            Some(&mut sink),
        )
        .expect("decode failed");
    drop(vm);

    println!(
        "encoded {} bytes, decoded {} bytes, {} gateway calls",
        encoded.bytes, decoded.bytes, fields
    );
}
