// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bytecode builder ("assembler") for `wire_tape`.
//!
//! [`Asm`] appends instructions through [`Instr::encode`], so operand layouts never have to be
//! written by hand. [`ProgramBuilder`] pairs it with a key table and produces a [`Program`].

use alloc::vec::Vec;

use crate::format::Writer;
use crate::instr::{CrcParams, Instr, LenPrefix};
use crate::keys::{KeyId, KeyTable};
use crate::opcode::Opcode;
use crate::program::Program;
use crate::transform::Transform;
use crate::verifier::{VerifiedProgram, VerifyConfig, VerifyError, verify_program_owned};

/// A [`ProgramBuilder`] error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The key table is full (65 536 names).
    #[error("too many keys")]
    TooManyKeys,
    /// The produced program failed verification.
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),
}

/// Assembles a bytecode stream.
#[derive(Clone, Debug, Default)]
pub struct Asm {
    w: Writer,
}

macro_rules! key_ops {
    ($($name:ident => $instr:expr;)*) => {
        $(
            #[doc = concat!("Appends `", stringify!($name), " key`.")]
            pub fn $name(&mut self, key: KeyId) -> &mut Self {
                let make: fn(KeyId) -> Instr = $instr;
                self.instr(make(key))
            }
        )*
    };
}

impl Asm {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next instruction will be written at.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.w.len()
    }

    /// Bytecode assembled so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.w.as_slice()
    }

    /// Returns the bytecode.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.w.into_vec()
    }

    /// Appends an arbitrary instruction.
    pub fn instr(&mut self, instr: Instr) -> &mut Self {
        instr.encode(&mut self.w);
        self
    }

    /// Appends `nop`.
    pub fn nop(&mut self) -> &mut Self {
        self.instr(Instr::Nop)
    }

    /// Switches to little-endian.
    pub fn endian_le(&mut self) -> &mut Self {
        self.instr(Instr::EndianLe)
    }

    /// Switches to big-endian.
    pub fn endian_be(&mut self) -> &mut Self {
        self.instr(Instr::EndianBe)
    }

    /// Appends `exit_struct`.
    pub fn exit_struct(&mut self) -> &mut Self {
        self.instr(Instr::ExitStruct)
    }

    /// Appends `meta_version`.
    pub fn meta_version(&mut self, version: u8) -> &mut Self {
        self.instr(Instr::MetaVersion { version })
    }

    key_ops! {
        enter_struct => |key| Instr::EnterStruct { key };
        ctx_query => |key| Instr::CtxQuery { key };
        meta_name => |key| Instr::MetaName { key };
        io_u8 => |key| Instr::Prim { op: Opcode::IoU8, key };
        io_u16 => |key| Instr::Prim { op: Opcode::IoU16, key };
        io_u32 => |key| Instr::Prim { op: Opcode::IoU32, key };
        io_u64 => |key| Instr::Prim { op: Opcode::IoU64, key };
        io_i8 => |key| Instr::Prim { op: Opcode::IoI8, key };
        io_i16 => |key| Instr::Prim { op: Opcode::IoI16, key };
        io_i32 => |key| Instr::Prim { op: Opcode::IoI32, key };
        io_i64 => |key| Instr::Prim { op: Opcode::IoI64, key };
        io_f32 => |key| Instr::Prim { op: Opcode::IoF32, key };
        io_f64 => |key| Instr::Prim { op: Opcode::IoF64, key };
        io_bool => |key| Instr::Prim { op: Opcode::IoBool, key };
        bit_bool => |key| Instr::BitBool { key };
        str_u8 => |key| Instr::StrPrefixed { key, prefix: LenPrefix::U8 };
        str_u16 => |key| Instr::StrPrefixed { key, prefix: LenPrefix::U16 };
        str_u32 => |key| Instr::StrPrefixed { key, prefix: LenPrefix::U32 };
        arr_u8 => |key| Instr::ArrPrefixed { key, prefix: LenPrefix::U8 };
        arr_u16 => |key| Instr::ArrPrefixed { key, prefix: LenPrefix::U16 };
        arr_u32 => |key| Instr::ArrPrefixed { key, prefix: LenPrefix::U32 };
        arr_eof => |key| Instr::ArrEof { key };
    }

    /// Appends an unsigned bit field.
    pub fn bit_u(&mut self, key: KeyId, bits: u8) -> &mut Self {
        self.instr(Instr::BitU { key, bits })
    }

    /// Appends a signed bit field.
    pub fn bit_i(&mut self, key: KeyId, bits: u8) -> &mut Self {
        self.instr(Instr::BitI { key, bits })
    }

    /// Skips `bits` bits.
    pub fn align_pad(&mut self, bits: u8) -> &mut Self {
        self.instr(Instr::AlignPad { bits })
    }

    /// Pads to the next byte boundary with zero or one bits.
    pub fn align_fill(&mut self, ones: bool) -> &mut Self {
        self.instr(Instr::AlignFill {
            fill: u8::from(ones),
        })
    }

    /// Appends a NUL-terminated string of at most `max_len` body bytes.
    pub fn str_null(&mut self, key: KeyId, max_len: u16) -> &mut Self {
        self.instr(Instr::StrNull { key, max_len })
    }

    /// Opens an array of exactly `count` elements.
    pub fn arr_fixed(&mut self, key: KeyId, count: u32) -> &mut Self {
        self.instr(Instr::ArrFixed { key, count })
    }

    /// Opens an array whose count is the current value of `count_key`.
    pub fn arr_dynamic(&mut self, key: KeyId, count_key: KeyId) -> &mut Self {
        self.instr(Instr::ArrDynamic { key, count_key })
    }

    /// Closes the innermost array.
    pub fn arr_end(&mut self) -> &mut Self {
        self.instr(Instr::ArrEnd)
    }

    /// Appends a `count`-byte opaque blob.
    pub fn raw_bytes(&mut self, key: KeyId, count: u32) -> &mut Self {
        self.instr(Instr::RawBytes { key, count })
    }

    /// Appends a checked constant; `kind` names an integer primitive.
    pub fn const_check(&mut self, key: KeyId, kind: Opcode, value: u64) -> &mut Self {
        self.instr(Instr::ConstCheck {
            key,
            kind: kind.byte(),
            value,
        })
    }

    /// Appends a written constant; `kind` names an integer primitive.
    pub fn const_write(&mut self, kind: Opcode, value: u64) -> &mut Self {
        self.instr(Instr::ConstWrite {
            kind: kind.byte(),
            value,
        })
    }

    /// Arms `eng = raw * factor + offset` for the next primitive.
    pub fn scale_lin(&mut self, factor: f64, offset: f64) -> &mut Self {
        self.instr(Instr::Transform(Transform::Scale { factor, offset }))
    }

    /// Arms `eng = raw + v` for the next primitive.
    pub fn trans_add(&mut self, v: i64) -> &mut Self {
        self.instr(Instr::Transform(Transform::Add(v)))
    }

    /// Arms `eng = raw - v` for the next primitive.
    pub fn trans_sub(&mut self, v: i64) -> &mut Self {
        self.instr(Instr::Transform(Transform::Sub(v)))
    }

    /// Arms `eng = raw * v` for the next primitive.
    pub fn trans_mul(&mut self, v: i64) -> &mut Self {
        self.instr(Instr::Transform(Transform::Mul(v)))
    }

    /// Arms `eng = raw / v` for the next primitive.
    pub fn trans_div(&mut self, v: i64) -> &mut Self {
        self.instr(Instr::Transform(Transform::Div(v)))
    }

    /// Appends a CRC-16 over everything before the cursor.
    pub fn crc16(&mut self, poly: u16, init: u16, xor_out: u16, flags: u8) -> &mut Self {
        self.instr(Instr::Crc16(CrcParams {
            poly,
            init,
            xor_out,
            flags,
        }))
    }

    /// Appends a CRC-32 over everything before the cursor.
    pub fn crc32(&mut self, poly: u32, init: u32, xor_out: u32, flags: u8) -> &mut Self {
        self.instr(Instr::Crc32(CrcParams {
            poly,
            init,
            xor_out,
            flags,
        }))
    }

    /// Makes the next field optional.
    pub fn mark_optional(&mut self) -> &mut Self {
        self.instr(Instr::MarkOptional)
    }
}

/// Builds a [`Program`] from named keys and assembled bytecode.
#[derive(Clone, Debug, Default)]
pub struct ProgramBuilder {
    keys: KeyTable,
    asm: Asm,
    overflowed: bool,
}

impl ProgramBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its key.
    ///
    /// Past 65 536 names this returns the last key and [`ProgramBuilder::build`] fails.
    pub fn key(&mut self, name: &str) -> KeyId {
        match self.keys.intern(name) {
            Some(k) => k,
            None => {
                self.overflowed = true;
                KeyId(u16::MAX)
            }
        }
    }

    /// The assembler for the program body.
    pub fn asm(&mut self) -> &mut Asm {
        &mut self.asm
    }

    /// Builds the program without verification.
    pub fn build(self) -> Result<Program, BuildError> {
        if self.overflowed {
            return Err(BuildError::TooManyKeys);
        }
        Ok(Program::new(self.asm.finish(), self.keys))
    }

    /// Builds and verifies the program with the default [`VerifyConfig`].
    pub fn build_verified(self) -> Result<VerifiedProgram, BuildError> {
        self.build_verified_with(&VerifyConfig::default())
    }

    /// Builds and verifies the program under `cfg`.
    pub fn build_verified_with(self, cfg: &VerifyConfig) -> Result<VerifiedProgram, BuildError> {
        let program = self.build()?;
        Ok(verify_program_owned(program, cfg)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{Asm, BuildError, ProgramBuilder};
    use crate::keys::KeyId;
    use crate::opcode::Opcode;
    use crate::verifier::VerifyError;

    #[test]
    fn encodes_little_endian_operands() {
        let mut a = Asm::new();
        a.io_u16(KeyId(0x0201)).arr_fixed(KeyId(3), 0x0102_0304);
        assert_eq!(
            a.bytes(),
            [0x11, 0x01, 0x02, 0x34, 0x03, 0x00, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(a.pos(), 10);
    }

    #[test]
    fn builder_interns_keys() {
        let mut b = ProgramBuilder::new();
        let id = b.key("id");
        let name = b.key("name");
        assert_eq!(b.key("id"), id);
        b.asm().io_u32(id).str_u8(name);
        let p = b.build_verified().unwrap();
        assert_eq!(p.program().key_name(name), Some("name"));
        assert_eq!(p.program().bytecode()[0], Opcode::IoU32.byte());
    }

    #[test]
    fn verification_errors_surface() {
        let mut b = ProgramBuilder::new();
        let k = b.key("k");
        b.asm().enter_struct(k);
        assert_eq!(
            b.build_verified().unwrap_err(),
            BuildError::Verify(VerifyError::UnclosedScope { open: 1 })
        );
    }
}
