// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disassembler example.
//!
//! Run with:
//! `cargo run -p wire_tape --example disasm`

use wire_tape::asm::ProgramBuilder;
use wire_tape::disasm::disassemble;
use wire_tape::opcode::Opcode;
use wire_tape::program::Program;

fn main() {
    let mut pb = ProgramBuilder::new();
    let packet = pb.key("packet");
    let magic = pb.key("magic");
    let version = pb.key("version");
    let flags = pb.key("flags");
    let samples = pb.key("samples");
    let temp = pb.key("temp_c");
    let label = pb.key("label");

    // packet { magic: u16 = 0xCAFE, version: u4, flags: u4, samples: [temp]*u8, label } + crc16
    pb.asm()
        .meta_version(1)
        .endian_be()
        .enter_struct(packet)
        .const_check(magic, Opcode::IoU16, 0xCAFE)
        .bit_u(version, 4)
        .bit_u(flags, 4)
        .arr_u8(samples)
        .scale_lin(0.5, -40.0)
        .io_u8(temp)
        .arr_end()
        .mark_optional()
        .str_u8(label)
        .exit_struct()
        .crc16(0x1021, 0xFFFF, 0x0000, 0);

    let program = pb.build_verified().unwrap();
    println!("{}", disassemble(program.program()));

    // The same program survives a trip through its `CNDIL` image.
    let image = program.program().encode_image();
    let reloaded = Program::load(&image).unwrap();
    println!("image: {} bytes", image.len());
    print!("{}", disassemble(&reloaded));
}
