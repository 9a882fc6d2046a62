// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoded instructions and their fixed operand layouts.
//!
//! The VM, verifier, disassembler and assembler all go through [`Instr::decode_at`] and
//! [`Instr::encode`], so operand layouts are defined exactly once.

use crate::format::{DecodeError, Reader, Writer};
use crate::keys::KeyId;
use crate::opcode::Opcode;
use crate::transform::Transform;

/// Width of a string/array length prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LenPrefix {
    /// One byte.
    U8,
    /// Two bytes, in the current endianness.
    U16,
    /// Four bytes, in the current endianness.
    U32,
}

impl LenPrefix {
    /// Width of the prefix in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Largest length the prefix can carry.
    #[must_use]
    pub const fn max(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
        }
    }
}

/// Parameters of a CRC instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CrcParams<T> {
    /// Generator polynomial (normal form).
    pub poly: T,
    /// Initial register value.
    pub init: T,
    /// Value XORed into the final register.
    pub xor_out: T,
    /// Bit 0: reflect input bytes. Bit 1: reflect the output.
    pub flags: u8,
}

/// One decoded instruction.
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs, reason = "fields mirror the operand roles in opcodes.json")]
pub enum Instr {
    Nop,
    EndianLe,
    EndianBe,
    EnterStruct { key: KeyId },
    ExitStruct,
    MetaVersion { version: u8 },
    CtxQuery { key: KeyId },
    MetaName { key: KeyId },
    /// `io_u8` ..= `io_bool`; `op` is the primitive opcode.
    Prim { op: Opcode, key: KeyId },
    BitU { key: KeyId, bits: u8 },
    BitI { key: KeyId, bits: u8 },
    BitBool { key: KeyId },
    AlignPad { bits: u8 },
    AlignFill { fill: u8 },
    StrNull { key: KeyId, max_len: u16 },
    StrPrefixed { key: KeyId, prefix: LenPrefix },
    ArrFixed { key: KeyId, count: u32 },
    ArrPrefixed { key: KeyId, prefix: LenPrefix },
    ArrEnd,
    RawBytes { key: KeyId, count: u32 },
    ArrDynamic { key: KeyId, count_key: KeyId },
    ArrEof { key: KeyId },
    /// `kind` is the raw byte of an integer primitive opcode naming the width.
    ConstCheck { key: KeyId, kind: u8, value: u64 },
    ConstWrite { kind: u8, value: u64 },
    /// `scale_lin` and `trans_*`.
    Transform(Transform),
    Crc16(CrcParams<u16>),
    Crc32(CrcParams<u32>),
    MarkOptional,
}

fn key(r: &mut Reader<'_>) -> Result<KeyId, DecodeError> {
    Ok(KeyId(r.read_u16_le()?))
}

impl Instr {
    /// Decodes the instruction at byte offset `ip`, returning it with the offset of the next one.
    pub fn decode_at(code: &[u8], ip: usize) -> Result<(Self, usize), DecodeError> {
        let mut r = Reader::at(code, ip);
        let byte = r.read_u8()?;
        let op = Opcode::from_byte(byte).ok_or(DecodeError::UnknownOpcode { byte })?;
        let instr = match op {
            Opcode::Nop => Self::Nop,
            Opcode::EndianLe => Self::EndianLe,
            Opcode::EndianBe => Self::EndianBe,
            Opcode::EnterStruct => Self::EnterStruct { key: key(&mut r)? },
            Opcode::ExitStruct => Self::ExitStruct,
            Opcode::MetaVersion => Self::MetaVersion {
                version: r.read_u8()?,
            },
            Opcode::CtxQuery => Self::CtxQuery { key: key(&mut r)? },
            Opcode::MetaName => Self::MetaName { key: key(&mut r)? },
            Opcode::IoU8
            | Opcode::IoU16
            | Opcode::IoU32
            | Opcode::IoU64
            | Opcode::IoI8
            | Opcode::IoI16
            | Opcode::IoI32
            | Opcode::IoI64
            | Opcode::IoF32
            | Opcode::IoF64
            | Opcode::IoBool => Self::Prim {
                op,
                key: key(&mut r)?,
            },
            Opcode::IoBitU => Self::BitU {
                key: key(&mut r)?,
                bits: r.read_u8()?,
            },
            Opcode::IoBitI => Self::BitI {
                key: key(&mut r)?,
                bits: r.read_u8()?,
            },
            Opcode::IoBitBool => Self::BitBool { key: key(&mut r)? },
            Opcode::AlignPad => Self::AlignPad {
                bits: r.read_u8()?,
            },
            Opcode::AlignFill => Self::AlignFill {
                fill: r.read_u8()?,
            },
            Opcode::StrNull => Self::StrNull {
                key: key(&mut r)?,
                max_len: r.read_u16_le()?,
            },
            Opcode::StrU8 => Self::StrPrefixed {
                key: key(&mut r)?,
                prefix: LenPrefix::U8,
            },
            Opcode::StrU16 => Self::StrPrefixed {
                key: key(&mut r)?,
                prefix: LenPrefix::U16,
            },
            Opcode::StrU32 => Self::StrPrefixed {
                key: key(&mut r)?,
                prefix: LenPrefix::U32,
            },
            Opcode::ArrFixed => Self::ArrFixed {
                key: key(&mut r)?,
                count: r.read_u32_le()?,
            },
            Opcode::ArrU8 => Self::ArrPrefixed {
                key: key(&mut r)?,
                prefix: LenPrefix::U8,
            },
            Opcode::ArrU16 => Self::ArrPrefixed {
                key: key(&mut r)?,
                prefix: LenPrefix::U16,
            },
            Opcode::ArrU32 => Self::ArrPrefixed {
                key: key(&mut r)?,
                prefix: LenPrefix::U32,
            },
            Opcode::ArrEnd => Self::ArrEnd,
            Opcode::RawBytes => Self::RawBytes {
                key: key(&mut r)?,
                count: r.read_u32_le()?,
            },
            Opcode::ArrDynamic => Self::ArrDynamic {
                key: key(&mut r)?,
                count_key: key(&mut r)?,
            },
            Opcode::ArrEof => Self::ArrEof { key: key(&mut r)? },
            Opcode::ConstCheck => Self::ConstCheck {
                key: key(&mut r)?,
                kind: r.read_u8()?,
                value: r.read_u64_le()?,
            },
            Opcode::ConstWrite => Self::ConstWrite {
                kind: r.read_u8()?,
                value: r.read_u64_le()?,
            },
            Opcode::ScaleLin => Self::Transform(Transform::Scale {
                factor: r.read_f64_le()?,
                offset: r.read_f64_le()?,
            }),
            Opcode::TransAdd => Self::Transform(Transform::Add(r.read_i64_le()?)),
            Opcode::TransSub => Self::Transform(Transform::Sub(r.read_i64_le()?)),
            Opcode::TransMul => Self::Transform(Transform::Mul(r.read_i64_le()?)),
            Opcode::TransDiv => Self::Transform(Transform::Div(r.read_i64_le()?)),
            Opcode::Crc16 => Self::Crc16(CrcParams {
                poly: r.read_u16_le()?,
                init: r.read_u16_le()?,
                xor_out: r.read_u16_le()?,
                flags: r.read_u8()?,
            }),
            Opcode::Crc32 => Self::Crc32(CrcParams {
                poly: r.read_u32_le()?,
                init: r.read_u32_le()?,
                xor_out: r.read_u32_le()?,
                flags: r.read_u8()?,
            }),
            Opcode::MarkOptional => Self::MarkOptional,
        };
        Ok((instr, r.offset()))
    }

    /// The opcode this instruction encodes to.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match *self {
            Self::Nop => Opcode::Nop,
            Self::EndianLe => Opcode::EndianLe,
            Self::EndianBe => Opcode::EndianBe,
            Self::EnterStruct { .. } => Opcode::EnterStruct,
            Self::ExitStruct => Opcode::ExitStruct,
            Self::MetaVersion { .. } => Opcode::MetaVersion,
            Self::CtxQuery { .. } => Opcode::CtxQuery,
            Self::MetaName { .. } => Opcode::MetaName,
            Self::Prim { op, .. } => op,
            Self::BitU { .. } => Opcode::IoBitU,
            Self::BitI { .. } => Opcode::IoBitI,
            Self::BitBool { .. } => Opcode::IoBitBool,
            Self::AlignPad { .. } => Opcode::AlignPad,
            Self::AlignFill { .. } => Opcode::AlignFill,
            Self::StrNull { .. } => Opcode::StrNull,
            Self::StrPrefixed { prefix, .. } => match prefix {
                LenPrefix::U8 => Opcode::StrU8,
                LenPrefix::U16 => Opcode::StrU16,
                LenPrefix::U32 => Opcode::StrU32,
            },
            Self::ArrFixed { .. } => Opcode::ArrFixed,
            Self::ArrPrefixed { prefix, .. } => match prefix {
                LenPrefix::U8 => Opcode::ArrU8,
                LenPrefix::U16 => Opcode::ArrU16,
                LenPrefix::U32 => Opcode::ArrU32,
            },
            Self::ArrEnd => Opcode::ArrEnd,
            Self::RawBytes { .. } => Opcode::RawBytes,
            Self::ArrDynamic { .. } => Opcode::ArrDynamic,
            Self::ArrEof { .. } => Opcode::ArrEof,
            Self::ConstCheck { .. } => Opcode::ConstCheck,
            Self::ConstWrite { .. } => Opcode::ConstWrite,
            Self::Transform(t) => match t {
                Transform::Scale { .. } => Opcode::ScaleLin,
                Transform::Add(_) => Opcode::TransAdd,
                Transform::Sub(_) => Opcode::TransSub,
                Transform::Mul(_) => Opcode::TransMul,
                Transform::Div(_) => Opcode::TransDiv,
            },
            Self::Crc16(_) => Opcode::Crc16,
            Self::Crc32(_) => Opcode::Crc32,
            Self::MarkOptional => Opcode::MarkOptional,
        }
    }

    /// The field key this instruction binds or notifies, if any.
    #[must_use]
    pub fn key(&self) -> Option<KeyId> {
        match *self {
            Self::EnterStruct { key }
            | Self::CtxQuery { key }
            | Self::MetaName { key }
            | Self::Prim { key, .. }
            | Self::BitU { key, .. }
            | Self::BitI { key, .. }
            | Self::BitBool { key }
            | Self::StrNull { key, .. }
            | Self::StrPrefixed { key, .. }
            | Self::ArrFixed { key, .. }
            | Self::ArrPrefixed { key, .. }
            | Self::RawBytes { key, .. }
            | Self::ArrDynamic { key, .. }
            | Self::ArrEof { key }
            | Self::ConstCheck { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Appends this instruction's bytes to `w`.
    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.opcode().byte());
        match *self {
            Self::Nop
            | Self::EndianLe
            | Self::EndianBe
            | Self::ExitStruct
            | Self::ArrEnd
            | Self::MarkOptional => {}
            Self::EnterStruct { key }
            | Self::CtxQuery { key }
            | Self::MetaName { key }
            | Self::Prim { key, .. }
            | Self::BitBool { key }
            | Self::StrPrefixed { key, .. }
            | Self::ArrPrefixed { key, .. }
            | Self::ArrEof { key } => w.write_u16_le(key.0),
            Self::MetaVersion { version: v }
            | Self::AlignPad { bits: v }
            | Self::AlignFill { fill: v } => w.write_u8(v),
            Self::BitU { key, bits } | Self::BitI { key, bits } => {
                w.write_u16_le(key.0);
                w.write_u8(bits);
            }
            Self::StrNull { key, max_len } => {
                w.write_u16_le(key.0);
                w.write_u16_le(max_len);
            }
            Self::ArrFixed { key, count } | Self::RawBytes { key, count } => {
                w.write_u16_le(key.0);
                w.write_u32_le(count);
            }
            Self::ArrDynamic { key, count_key } => {
                w.write_u16_le(key.0);
                w.write_u16_le(count_key.0);
            }
            Self::ConstCheck { key, kind, value } => {
                w.write_u16_le(key.0);
                w.write_u8(kind);
                w.write_u64_le(value);
            }
            Self::ConstWrite { kind, value } => {
                w.write_u8(kind);
                w.write_u64_le(value);
            }
            Self::Transform(t) => match t {
                Transform::Scale { factor, offset } => {
                    w.write_f64_le(factor);
                    w.write_f64_le(offset);
                }
                Transform::Add(v) | Transform::Sub(v) | Transform::Mul(v) | Transform::Div(v) => {
                    w.write_i64_le(v);
                }
            },
            Self::Crc16(p) => {
                w.write_u16_le(p.poly);
                w.write_u16_le(p.init);
                w.write_u16_le(p.xor_out);
                w.write_u8(p.flags);
            }
            Self::Crc32(p) => {
                w.write_u32_le(p.poly);
                w.write_u32_le(p.init);
                w.write_u32_le(p.xor_out);
                w.write_u8(p.flags);
            }
        }
    }
}

/// Iterates `(ip, instr)` pairs over a bytecode slice, stopping after the first decode error.
#[derive(Clone, Debug)]
pub struct InstrIter<'a> {
    code: &'a [u8],
    ip: usize,
    failed: bool,
}

impl<'a> InstrIter<'a> {
    /// Creates an iterator starting at offset 0.
    #[must_use]
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            ip: 0,
            failed: false,
        }
    }
}

impl Iterator for InstrIter<'_> {
    type Item = Result<(usize, Instr), (usize, DecodeError)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.ip >= self.code.len() {
            return None;
        }
        let ip = self.ip;
        match Instr::decode_at(self.code, ip) {
            Ok((instr, next)) => {
                self.ip = next;
                Some(Ok((ip, instr)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err((ip, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CrcParams, Instr, InstrIter, LenPrefix};
    use crate::format::{DecodeError, Writer};
    use crate::keys::KeyId;
    use crate::opcode::Opcode;
    use crate::transform::Transform;

    #[test]
    fn decodes_operands_little_endian() {
        let code = [0x34, 0x02, 0x01, 0x10, 0x00, 0x00, 0x00, 0x38];
        let (instr, next) = Instr::decode_at(&code, 0).unwrap();
        assert_eq!(
            instr,
            Instr::ArrFixed {
                key: KeyId(0x0102),
                count: 16
            }
        );
        assert_eq!(next, 7);
        assert_eq!(Instr::decode_at(&code, 7).unwrap(), (Instr::ArrEnd, 8));
    }

    #[test]
    fn encoded_size_matches_table() {
        let samples = [
            Instr::MetaVersion { version: 3 },
            Instr::BitI {
                key: KeyId(1),
                bits: 5,
            },
            Instr::StrNull {
                key: KeyId(2),
                max_len: 255,
            },
            Instr::StrPrefixed {
                key: KeyId(2),
                prefix: LenPrefix::U16,
            },
            Instr::ArrDynamic {
                key: KeyId(3),
                count_key: KeyId(0),
            },
            Instr::ConstCheck {
                key: KeyId(4),
                kind: Opcode::IoU16.byte(),
                value: 0xCAFE,
            },
            Instr::Transform(Transform::Scale {
                factor: 0.1,
                offset: 2.0,
            }),
            Instr::Transform(Transform::Div(-3)),
            Instr::Crc32(CrcParams {
                poly: 0x04C1_1DB7,
                init: u32::MAX,
                xor_out: u32::MAX,
                flags: 3,
            }),
        ];
        for instr in samples {
            let mut w = Writer::new();
            instr.encode(&mut w);
            assert_eq!(w.len(), instr.opcode().size(), "{instr:?}");
            assert_eq!(Instr::decode_at(w.as_slice(), 0).unwrap().0, instr);
        }
    }

    #[test]
    fn truncated_operands_and_unknown_opcodes() {
        assert_eq!(
            Instr::decode_at(&[0x10, 0x01], 0),
            Err(DecodeError::UnexpectedEof)
        );
        assert_eq!(
            Instr::decode_at(&[0x42], 0),
            Err(DecodeError::UnknownOpcode { byte: 0x42 })
        );
    }

    #[test]
    fn iterator_stops_after_error() {
        let code = [0x00, 0x01, 0xEE, 0x00];
        let items: alloc::vec::Vec<_> = InstrIter::new(&code).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Ok((1, Instr::EndianLe)));
        assert_eq!(items[2], Err((2, DecodeError::UnknownOpcode { byte: 0xEE })));
    }
}
