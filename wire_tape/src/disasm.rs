// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disassembler for `wire_tape` programs.
//!
//! [`disassemble`] gives a structured view for tooling and tests, and a stable text format via
//! [`core::fmt::Display`]: one instruction per line, prefixed with its hex offset, indented by
//! scope depth, with keys shown by name when the program carries a string table.

use alloc::vec::Vec;
use core::fmt;

use crate::format::DecodeError;
use crate::instr::{Instr, InstrIter};
use crate::keys::KeyId;
use crate::opcode::Opcode;
use crate::program::Program;
use crate::transform::Transform;

/// Disassembles `program`.
///
/// Decoding stops at the first malformed instruction; the error is kept and rendered as the last
/// line.
#[must_use]
pub fn disassemble(program: &Program) -> Disassembly<'_> {
    let mut instrs = Vec::new();
    let mut error = None;
    for item in InstrIter::new(program.bytecode()) {
        match item {
            Ok((ip, instr)) => instrs.push((ip, instr)),
            Err(e) => error = Some(e),
        }
    }
    Disassembly {
        program,
        instrs,
        error,
    }
}

/// A decoded program listing.
#[derive(Clone, Debug)]
pub struct Disassembly<'a> {
    program: &'a Program,
    instrs: Vec<(usize, Instr)>,
    error: Option<(usize, DecodeError)>,
}

impl<'a> Disassembly<'a> {
    /// The disassembled program.
    #[must_use]
    pub fn program(&self) -> &'a Program {
        self.program
    }

    /// Decoded instructions with their offsets.
    pub fn instrs(&self) -> impl Iterator<Item = (usize, &Instr)> + '_ {
        self.instrs.iter().map(|(ip, i)| (*ip, i))
    }

    /// The decode error that stopped disassembly, if any.
    #[must_use]
    pub fn error(&self) -> Option<&(usize, DecodeError)> {
        self.error.as_ref()
    }

    fn key(&self, key: KeyId) -> KeyName<'_> {
        KeyName(key, self.program.key_name(key))
    }
}

struct KeyName<'a>(KeyId, Option<&'a str>);

impl fmt::Display for KeyName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

struct Kind(u8);

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Opcode::from_byte(self.0) {
            Some(op) => f.write_str(op.mnemonic()),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0_usize;
        for &(ip, instr) in &self.instrs {
            let op = instr.opcode();
            if matches!(op, Opcode::ExitStruct | Opcode::ArrEnd) {
                depth = depth.saturating_sub(1);
            }
            write!(f, "{ip:04x}  {:indent$}{}", "", op.mnemonic(), indent = depth * 2)?;
            self.operands(f, &instr)?;
            writeln!(f)?;
            if op == Opcode::EnterStruct || op.is_array_start() {
                depth += 1;
            }
        }
        if let Some((ip, e)) = &self.error {
            writeln!(f, "{ip:04x}  <error: {e}>")?;
        }
        Ok(())
    }
}

impl Disassembly<'_> {
    fn operands(&self, f: &mut fmt::Formatter<'_>, instr: &Instr) -> fmt::Result {
        match *instr {
            Instr::Nop
            | Instr::EndianLe
            | Instr::EndianBe
            | Instr::ExitStruct
            | Instr::ArrEnd
            | Instr::MarkOptional => Ok(()),
            Instr::EnterStruct { key }
            | Instr::CtxQuery { key }
            | Instr::MetaName { key }
            | Instr::Prim { key, .. }
            | Instr::BitBool { key }
            | Instr::StrPrefixed { key, .. }
            | Instr::ArrPrefixed { key, .. }
            | Instr::ArrEof { key } => write!(f, " {}", self.key(key)),
            Instr::MetaVersion { version: v }
            | Instr::AlignPad { bits: v }
            | Instr::AlignFill { fill: v } => write!(f, " {v}"),
            Instr::BitU { key, bits } | Instr::BitI { key, bits } => {
                write!(f, " {}, {bits}", self.key(key))
            }
            Instr::StrNull { key, max_len } => write!(f, " {}, {max_len}", self.key(key)),
            Instr::ArrFixed { key, count } | Instr::RawBytes { key, count } => {
                write!(f, " {}, {count}", self.key(key))
            }
            Instr::ArrDynamic { key, count_key } => {
                write!(f, " {}, {}", self.key(key), self.key(count_key))
            }
            Instr::ConstCheck { key, kind, value } => {
                write!(f, " {}, {}, 0x{value:X}", self.key(key), Kind(kind))
            }
            Instr::ConstWrite { kind, value } => write!(f, " {}, 0x{value:X}", Kind(kind)),
            Instr::Transform(Transform::Scale { factor, offset }) => {
                write!(f, " {factor:?}, {offset:?}")
            }
            Instr::Transform(
                Transform::Add(v) | Transform::Sub(v) | Transform::Mul(v) | Transform::Div(v),
            ) => write!(f, " {v}"),
            Instr::Crc16(p) => write!(
                f,
                " 0x{:04X}, 0x{:04X}, 0x{:04X}, {}",
                p.poly, p.init, p.xor_out, p.flags
            ),
            Instr::Crc32(p) => write!(
                f,
                " 0x{:08X}, 0x{:08X}, 0x{:08X}, {}",
                p.poly, p.init, p.xor_out, p.flags
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::disassemble;
    use crate::asm::ProgramBuilder;
    use crate::keys::KeyTable;
    use crate::opcode::Opcode;
    use crate::program::Program;
    use alloc::string::ToString;

    #[test]
    fn renders_nested_listing_with_key_names() {
        let mut b = ProgramBuilder::new();
        let hdr = b.key("header");
        let magic = b.key("magic");
        let items = b.key("items");
        let temp = b.key("temp");
        b.asm()
            .enter_struct(hdr)
            .const_check(magic, Opcode::IoU16, 0xCAFE)
            .exit_struct()
            .arr_u8(items)
            .scale_lin(0.5, -40.0)
            .io_u8(temp)
            .arr_end()
            .crc16(0x1021, 0xFFFF, 0, 0);
        let p = b.build().unwrap();
        let expected = "\
0000  enter_struct header
0003    const_check magic, io_u16, 0xCAFE
000f  exit_struct
0010  arr_u8 items
0013    scale_lin 0.5, -40.0
0024    io_u8 temp
0027  arr_end
0028  crc16 0x1021, 0xFFFF, 0x0000, 0
";
        assert_eq!(disassemble(&p).to_string(), expected);
    }

    #[test]
    fn unnamed_keys_and_decode_errors() {
        let p = Program::new(alloc::vec![0x10, 0x05, 0x00, 0xEE], KeyTable::new());
        let d = disassemble(&p);
        assert_eq!(d.instrs().count(), 1);
        assert_eq!(
            d.to_string(),
            "0000  io_u8 #5\n0003  <error: unknown opcode 0xEE>\n"
        );
    }
}
