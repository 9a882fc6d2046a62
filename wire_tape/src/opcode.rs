// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opcode byte values for the layout instruction set.
//!
//! This module is a small wrapper around generated opcode tables; edit `opcodes.json` and re-run
//! `wire_tape_codegen` to change them.

include!("opcodes_gen.rs");

impl Opcode {
    /// Returns the opcode byte value.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parses an opcode from its byte value.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        Self::from_u8(b)
    }

    /// Wire width in bytes of a primitive field opcode (`io_u8` ..= `io_bool`).
    #[must_use]
    pub fn primitive_width(self) -> Option<usize> {
        Some(match self {
            Self::IoU8 | Self::IoI8 | Self::IoBool => 1,
            Self::IoU16 | Self::IoI16 => 2,
            Self::IoU32 | Self::IoI32 | Self::IoF32 => 4,
            Self::IoU64 | Self::IoI64 | Self::IoF64 => 8,
            _ => return None,
        })
    }

    /// Returns `true` for primitive opcodes whose value is a two's complement integer.
    #[must_use]
    pub fn is_signed_primitive(self) -> bool {
        matches!(self, Self::IoI8 | Self::IoI16 | Self::IoI32 | Self::IoI64)
    }

    /// Returns `true` for `io_f32`/`io_f64`.
    #[must_use]
    pub fn is_float_primitive(self) -> bool {
        matches!(self, Self::IoF32 | Self::IoF64)
    }

    /// Returns `true` for primitive integer opcodes, the valid `kind` operands of constants.
    #[must_use]
    pub fn is_integer_primitive(self) -> bool {
        self.primitive_width().is_some() && !self.is_float_primitive() && self != Self::IoBool
    }

    /// Returns `true` if a key bound by this opcode holds a single scalar value, so it can
    /// serve as an `arr_dynamic` count.
    #[must_use]
    pub fn binds_scalar(self) -> bool {
        self.primitive_width().is_some()
            || matches!(
                self,
                Self::IoBitU | Self::IoBitI | Self::IoBitBool | Self::ConstCheck
            )
    }
}

#[cfg(test)]
mod tests {
    use super::{OPCODE_INFO_BY_BYTE, Opcode};

    #[test]
    fn opcode_values_are_stable() {
        assert_eq!(Opcode::IoU8 as u8, 0x10);
        assert_eq!(Opcode::IoU16 as u8, 0x11);
        assert_eq!(Opcode::ArrFixed as u8, 0x34);
        assert_eq!(Opcode::ArrU8 as u8, 0x35);
        assert_eq!(Opcode::ArrEnd as u8, 0x38);
        assert_eq!(Opcode::Crc32 as u8, 0x49);
        assert!(Opcode::IoI16.is_integer_primitive());
        assert!(!Opcode::IoBool.is_integer_primitive());
        assert!(Opcode::IoBitU.binds_scalar());
        assert!(!Opcode::RawBytes.binds_scalar());
        assert_eq!(Opcode::MarkOptional as u8, 0x4A);
    }

    #[test]
    fn from_byte_round_trips_every_table_entry() {
        for (i, info) in OPCODE_INFO_BY_BYTE.iter().enumerate() {
            let b = u8::try_from(i).unwrap();
            match Opcode::from_byte(b) {
                Some(op) => {
                    assert_eq!(op.byte(), b);
                    assert_eq!(op.mnemonic(), info.mnemonic);
                }
                None => assert_eq!(info.mnemonic, "<invalid>"),
            }
        }
        assert_eq!(Opcode::from_byte(0x42), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn sizes_match_operand_widths() {
        assert_eq!(Opcode::Nop.size(), 1);
        assert_eq!(Opcode::IoU32.size(), 3);
        assert_eq!(Opcode::ArrFixed.size(), 7);
        assert_eq!(Opcode::ConstCheck.size(), 12);
        assert_eq!(Opcode::ScaleLin.size(), 17);
        assert_eq!(Opcode::Crc16.size(), 8);
        assert_eq!(Opcode::Crc32.size(), 14);
        for b in 0..=u8::MAX {
            if let Some(op) = Opcode::from_byte(b) {
                let operand_bytes: usize = op.operands().iter().map(|o| o.kind.width()).sum();
                assert_eq!(op.size(), 1 + operand_bytes, "{}", op.mnemonic());
            }
        }
    }

    #[test]
    fn alignment_classification() {
        assert!(Opcode::IoU8.aligns());
        assert!(Opcode::StrNull.aligns());
        assert!(Opcode::ArrEnd.aligns());
        assert!(Opcode::Crc16.aligns());
        assert!(!Opcode::IoBitU.aligns());
        assert!(!Opcode::AlignPad.aligns());
        assert!(!Opcode::ScaleLin.aligns());
        assert!(!Opcode::MarkOptional.aligns());
        assert!(Opcode::ArrDynamic.is_array_start());
        assert!(!Opcode::RawBytes.is_array_start());
        assert!(Opcode::RawBytes.is_field_io());
    }
}
