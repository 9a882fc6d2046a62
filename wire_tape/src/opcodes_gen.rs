// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// @generated by wire_tape_codegen. Do not edit by hand.

/// Operand kinds used by the opcode table.
///
/// Every operand is stored little-endian in the bytecode, regardless of the runtime endianness.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// A field key id (`u16`).
    Key,
    /// An immediate `u8`.
    ImmU8,
    /// An immediate `u16`.
    ImmU16,
    /// An immediate `u32`.
    ImmU32,
    /// An immediate `i64`.
    ImmI64,
    /// An immediate `u64`.
    ImmU64,
    /// An immediate `f64` (IEEE-754 bits).
    ImmF64,
}

impl OperandKind {
    /// Encoded width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::ImmU8 => 1,
            Self::Key | Self::ImmU16 => 2,
            Self::ImmU32 => 4,
            Self::ImmI64 | Self::ImmU64 | Self::ImmF64 => 8,
        }
    }
}

/// Operand roles used by the opcode table.
///
/// Roles are a best-effort description for disassembly/tooling.
#[allow(missing_docs, reason = "generated")]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandRole {
    Key,
    CountKey,
    Version,
    Bits,
    Fill,
    MaxLen,
    Count,
    Kind,
    Value,
    Factor,
    Offset,
    Poly,
    Init,
    XorOut,
    Flags,
}

/// Operand schema metadata (kind/role).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperandSchema {
    /// Operand kind (wire type).
    pub kind: OperandKind,
    /// Operand role (how this operand is used).
    pub role: OperandRole,
}

impl OperandSchema {
    const fn new(kind: OperandKind, role: OperandRole) -> Self {
        Self { kind, role }
    }
}

/// Operand layout for an opcode (indices into `OPERANDS`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperandLayout {
    /// Start index in `OPERANDS`.
    pub start: u16,
    /// Number of operand entries.
    pub len: u8,
}

/// Optional per-opcode traits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct OpcodeFlags(u8);

impl OpcodeFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Rounds a partial byte up to the next boundary before executing.
    pub const ALIGNS: Self = Self(1 << 0);
    /// Binds a key to a single field value.
    pub const FIELD_IO: Self = Self(1 << 1);
    /// Opens an array scope.
    pub const ARRAY_START: Self = Self(1 << 2);

    /// Returns `true` if `other` is a subset of `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Per-opcode metadata used by decode, disasm, and verification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Stable, parseable opcode name.
    pub mnemonic: &'static str,
    /// Encoded instruction size in bytes, including the opcode byte.
    pub size: u8,
    /// Optional per-opcode traits.
    pub flags: OpcodeFlags,
    /// Operand layout for this opcode.
    pub operands: OperandLayout,
}

/// Flat operand schema table indexed by `OperandLayout`.
pub const OPERANDS: &[OperandSchema] = &[
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Version),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Bits),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Bits),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Bits),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Fill),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU16, OperandRole::MaxLen),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU32, OperandRole::Count),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU32, OperandRole::Count),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::CountKey),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::Key, OperandRole::Key),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Kind),
    OperandSchema::new(OperandKind::ImmU64, OperandRole::Value),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Kind),
    OperandSchema::new(OperandKind::ImmU64, OperandRole::Value),
    OperandSchema::new(OperandKind::ImmF64, OperandRole::Factor),
    OperandSchema::new(OperandKind::ImmF64, OperandRole::Offset),
    OperandSchema::new(OperandKind::ImmU16, OperandRole::Poly),
    OperandSchema::new(OperandKind::ImmU16, OperandRole::Init),
    OperandSchema::new(OperandKind::ImmU16, OperandRole::XorOut),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Flags),
    OperandSchema::new(OperandKind::ImmI64, OperandRole::Value),
    OperandSchema::new(OperandKind::ImmI64, OperandRole::Value),
    OperandSchema::new(OperandKind::ImmI64, OperandRole::Value),
    OperandSchema::new(OperandKind::ImmI64, OperandRole::Value),
    OperandSchema::new(OperandKind::ImmU32, OperandRole::Poly),
    OperandSchema::new(OperandKind::ImmU32, OperandRole::Init),
    OperandSchema::new(OperandKind::ImmU32, OperandRole::XorOut),
    OperandSchema::new(OperandKind::ImmU8, OperandRole::Flags),
];

/// Metadata indexed by opcode byte.
pub const OPCODE_INFO_BY_BYTE: &[OpcodeInfo] = &[
    OpcodeInfo { mnemonic: "nop", size: 1, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 0, len: 0 } }, // 0x00 Nop
    OpcodeInfo { mnemonic: "endian_le", size: 1, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 0, len: 0 } }, // 0x01 EndianLe
    OpcodeInfo { mnemonic: "endian_be", size: 1, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 0, len: 0 } }, // 0x02 EndianBe
    OpcodeInfo { mnemonic: "enter_struct", size: 3, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 0, len: 1 } }, // 0x03 EnterStruct
    OpcodeInfo { mnemonic: "exit_struct", size: 1, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 1, len: 0 } }, // 0x04 ExitStruct
    OpcodeInfo { mnemonic: "meta_version", size: 2, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 1, len: 1 } }, // 0x05 MetaVersion
    OpcodeInfo { mnemonic: "ctx_query", size: 3, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 2, len: 1 } }, // 0x06 CtxQuery
    OpcodeInfo { mnemonic: "meta_name", size: 3, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 3, len: 1 } }, // 0x07 MetaName
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x08
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x09
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x0A
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x0B
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x0C
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x0D
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x0E
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x0F
    OpcodeInfo { mnemonic: "io_u8", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 4, len: 1 } }, // 0x10 IoU8
    OpcodeInfo { mnemonic: "io_u16", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 5, len: 1 } }, // 0x11 IoU16
    OpcodeInfo { mnemonic: "io_u32", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 6, len: 1 } }, // 0x12 IoU32
    OpcodeInfo { mnemonic: "io_u64", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 7, len: 1 } }, // 0x13 IoU64
    OpcodeInfo { mnemonic: "io_i8", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 8, len: 1 } }, // 0x14 IoI8
    OpcodeInfo { mnemonic: "io_i16", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 9, len: 1 } }, // 0x15 IoI16
    OpcodeInfo { mnemonic: "io_i32", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 10, len: 1 } }, // 0x16 IoI32
    OpcodeInfo { mnemonic: "io_i64", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 11, len: 1 } }, // 0x17 IoI64
    OpcodeInfo { mnemonic: "io_f32", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 12, len: 1 } }, // 0x18 IoF32
    OpcodeInfo { mnemonic: "io_f64", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 13, len: 1 } }, // 0x19 IoF64
    OpcodeInfo { mnemonic: "io_bool", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 14, len: 1 } }, // 0x1A IoBool
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x1B
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x1C
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x1D
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x1E
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x1F
    OpcodeInfo { mnemonic: "io_bit_u", size: 4, flags: OpcodeFlags(0x02), operands: OperandLayout { start: 15, len: 2 } }, // 0x20 IoBitU
    OpcodeInfo { mnemonic: "io_bit_i", size: 4, flags: OpcodeFlags(0x02), operands: OperandLayout { start: 17, len: 2 } }, // 0x21 IoBitI
    OpcodeInfo { mnemonic: "io_bit_bool", size: 3, flags: OpcodeFlags(0x02), operands: OperandLayout { start: 19, len: 1 } }, // 0x22 IoBitBool
    OpcodeInfo { mnemonic: "align_pad", size: 2, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 20, len: 1 } }, // 0x23 AlignPad
    OpcodeInfo { mnemonic: "align_fill", size: 2, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 21, len: 1 } }, // 0x24 AlignFill
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x25
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x26
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x27
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x28
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x29
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x2A
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x2B
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x2C
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x2D
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x2E
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x2F
    OpcodeInfo { mnemonic: "str_null", size: 5, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 22, len: 2 } }, // 0x30 StrNull
    OpcodeInfo { mnemonic: "str_u8", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 24, len: 1 } }, // 0x31 StrU8
    OpcodeInfo { mnemonic: "str_u16", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 25, len: 1 } }, // 0x32 StrU16
    OpcodeInfo { mnemonic: "str_u32", size: 3, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 26, len: 1 } }, // 0x33 StrU32
    OpcodeInfo { mnemonic: "arr_fixed", size: 7, flags: OpcodeFlags(0x05), operands: OperandLayout { start: 27, len: 2 } }, // 0x34 ArrFixed
    OpcodeInfo { mnemonic: "arr_u8", size: 3, flags: OpcodeFlags(0x05), operands: OperandLayout { start: 29, len: 1 } }, // 0x35 ArrU8
    OpcodeInfo { mnemonic: "arr_u16", size: 3, flags: OpcodeFlags(0x05), operands: OperandLayout { start: 30, len: 1 } }, // 0x36 ArrU16
    OpcodeInfo { mnemonic: "arr_u32", size: 3, flags: OpcodeFlags(0x05), operands: OperandLayout { start: 31, len: 1 } }, // 0x37 ArrU32
    OpcodeInfo { mnemonic: "arr_end", size: 1, flags: OpcodeFlags(0x01), operands: OperandLayout { start: 32, len: 0 } }, // 0x38 ArrEnd
    OpcodeInfo { mnemonic: "raw_bytes", size: 7, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 32, len: 2 } }, // 0x39 RawBytes
    OpcodeInfo { mnemonic: "arr_dynamic", size: 5, flags: OpcodeFlags(0x05), operands: OperandLayout { start: 34, len: 2 } }, // 0x3A ArrDynamic
    OpcodeInfo { mnemonic: "arr_eof", size: 3, flags: OpcodeFlags(0x05), operands: OperandLayout { start: 36, len: 1 } }, // 0x3B ArrEof
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x3C
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x3D
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x3E
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x3F
    OpcodeInfo { mnemonic: "const_check", size: 12, flags: OpcodeFlags(0x03), operands: OperandLayout { start: 37, len: 3 } }, // 0x40 ConstCheck
    OpcodeInfo { mnemonic: "const_write", size: 10, flags: OpcodeFlags(0x01), operands: OperandLayout { start: 40, len: 2 } }, // 0x41 ConstWrite
    OpcodeInfo { mnemonic: "<invalid>", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout { start: 0, len: 0 } }, // 0x42
    OpcodeInfo { mnemonic: "scale_lin", size: 17, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 42, len: 2 } }, // 0x43 ScaleLin
    OpcodeInfo { mnemonic: "crc16", size: 8, flags: OpcodeFlags(0x01), operands: OperandLayout { start: 44, len: 4 } }, // 0x44 Crc16
    OpcodeInfo { mnemonic: "trans_add", size: 9, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 48, len: 1 } }, // 0x45 TransAdd
    OpcodeInfo { mnemonic: "trans_sub", size: 9, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 49, len: 1 } }, // 0x46 TransSub
    OpcodeInfo { mnemonic: "trans_mul", size: 9, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 50, len: 1 } }, // 0x47 TransMul
    OpcodeInfo { mnemonic: "trans_div", size: 9, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 51, len: 1 } }, // 0x48 TransDiv
    OpcodeInfo { mnemonic: "crc32", size: 14, flags: OpcodeFlags(0x01), operands: OperandLayout { start: 52, len: 4 } }, // 0x49 Crc32
    OpcodeInfo { mnemonic: "mark_optional", size: 1, flags: OpcodeFlags(0x00), operands: OperandLayout { start: 56, len: 0 } }, // 0x4A MarkOptional
];

/// Layout bytecode opcodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Opcode {
    /// No operation.
    Nop = 0x00,
    /// Switch subsequent multi-byte fields to little-endian.
    EndianLe = 0x01,
    /// Switch subsequent multi-byte fields to big-endian.
    EndianBe = 0x02,
    /// Open a nested struct scope.
    EnterStruct = 0x03,
    /// Close the innermost struct scope.
    ExitStruct = 0x04,
    /// Informational schema version marker.
    MetaVersion = 0x05,
    /// Ask the gateway for the current value of an already-bound field.
    CtxQuery = 0x06,
    /// Informational schema name marker.
    MetaName = 0x07,
    /// Primitive `u8` field.
    IoU8 = 0x10,
    /// Primitive `u16` field.
    IoU16 = 0x11,
    /// Primitive `u32` field.
    IoU32 = 0x12,
    /// Primitive `u64` field.
    IoU64 = 0x13,
    /// Primitive `i8` field.
    IoI8 = 0x14,
    /// Primitive `i16` field.
    IoI16 = 0x15,
    /// Primitive `i32` field.
    IoI32 = 0x16,
    /// Primitive `i64` field.
    IoI64 = 0x17,
    /// Primitive `f32` field.
    IoF32 = 0x18,
    /// Primitive `f64` field.
    IoF64 = 0x19,
    /// Primitive one-byte boolean field.
    IoBool = 0x1A,
    /// Unsigned bit field of 1..=64 bits.
    IoBitU = 0x20,
    /// Signed (two's complement) bit field of 1..=64 bits.
    IoBitI = 0x21,
    /// Single-bit boolean field.
    IoBitBool = 0x22,
    /// Skip a number of bits without writing them.
    AlignPad = 0x23,
    /// Pad to the next byte boundary with zero or one bits.
    AlignFill = 0x24,
    /// NUL-terminated string of at most `max_len` bytes.
    StrNull = 0x30,
    /// String with a `u8` length prefix.
    StrU8 = 0x31,
    /// String with a `u16` length prefix.
    StrU16 = 0x32,
    /// String with a `u32` length prefix.
    StrU32 = 0x33,
    /// Array with a count fixed in the program.
    ArrFixed = 0x34,
    /// Array with a `u8` count prefix.
    ArrU8 = 0x35,
    /// Array with a `u16` count prefix.
    ArrU16 = 0x36,
    /// Array with a `u32` count prefix.
    ArrU32 = 0x37,
    /// End of an array body.
    ArrEnd = 0x38,
    /// Opaque blob of `count` bytes.
    RawBytes = 0x39,
    /// Array whose count is the value of a previously bound field.
    ArrDynamic = 0x3A,
    /// Array that repeats until the buffer is exhausted.
    ArrEof = 0x3B,
    /// Constant field: written on encode, verified on decode.
    ConstCheck = 0x40,
    /// Constant written in both modes without a gateway call.
    ConstWrite = 0x41,
    /// Linear scale applied to the next primitive field.
    ScaleLin = 0x43,
    /// CRC-16 over all bytes before the cursor.
    Crc16 = 0x44,
    /// Additive offset applied to the next primitive field.
    TransAdd = 0x45,
    /// Subtractive offset applied to the next primitive field.
    TransSub = 0x46,
    /// Multiplicative factor applied to the next primitive field.
    TransMul = 0x47,
    /// Divisor applied to the next primitive field.
    TransDiv = 0x48,
    /// CRC-32 over all bytes before the cursor.
    Crc32 = 0x49,
    /// Marks the next field as optional.
    MarkOptional = 0x4A,
}

impl Opcode {
    /// Decodes an opcode byte.
    #[must_use]
    pub fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0x00 => Self::Nop,
            0x01 => Self::EndianLe,
            0x02 => Self::EndianBe,
            0x03 => Self::EnterStruct,
            0x04 => Self::ExitStruct,
            0x05 => Self::MetaVersion,
            0x06 => Self::CtxQuery,
            0x07 => Self::MetaName,
            0x10 => Self::IoU8,
            0x11 => Self::IoU16,
            0x12 => Self::IoU32,
            0x13 => Self::IoU64,
            0x14 => Self::IoI8,
            0x15 => Self::IoI16,
            0x16 => Self::IoI32,
            0x17 => Self::IoI64,
            0x18 => Self::IoF32,
            0x19 => Self::IoF64,
            0x1A => Self::IoBool,
            0x20 => Self::IoBitU,
            0x21 => Self::IoBitI,
            0x22 => Self::IoBitBool,
            0x23 => Self::AlignPad,
            0x24 => Self::AlignFill,
            0x30 => Self::StrNull,
            0x31 => Self::StrU8,
            0x32 => Self::StrU16,
            0x33 => Self::StrU32,
            0x34 => Self::ArrFixed,
            0x35 => Self::ArrU8,
            0x36 => Self::ArrU16,
            0x37 => Self::ArrU32,
            0x38 => Self::ArrEnd,
            0x39 => Self::RawBytes,
            0x3A => Self::ArrDynamic,
            0x3B => Self::ArrEof,
            0x40 => Self::ConstCheck,
            0x41 => Self::ConstWrite,
            0x43 => Self::ScaleLin,
            0x44 => Self::Crc16,
            0x45 => Self::TransAdd,
            0x46 => Self::TransSub,
            0x47 => Self::TransMul,
            0x48 => Self::TransDiv,
            0x49 => Self::Crc32,
            0x4A => Self::MarkOptional,
            _ => return None,
        })
    }
}

impl Opcode {
    /// Returns opcode metadata for this opcode.
    #[must_use]
    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODE_INFO_BY_BYTE[usize::from(self as u8)]
    }

    /// Stable, parseable opcode name.
    ///
    /// This string is used by the disassembler output.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    /// Encoded instruction size in bytes, including the opcode byte.
    #[must_use]
    pub fn size(self) -> usize {
        usize::from(self.info().size)
    }

    /// Returns operand schema descriptors for this opcode.
    #[must_use]
    pub fn operands(self) -> &'static [OperandSchema] {
        let layout = self.info().operands;
        let start = usize::from(layout.start);
        let end = start + usize::from(layout.len);
        &OPERANDS[start..end]
    }

    /// Returns `true` if a partial byte is rounded up before this opcode executes.
    #[must_use]
    pub fn aligns(self) -> bool {
        self.info().flags.contains(OpcodeFlags::ALIGNS)
    }

    /// Returns `true` if this opcode binds its key to a single field value.
    #[must_use]
    pub fn is_field_io(self) -> bool {
        self.info().flags.contains(OpcodeFlags::FIELD_IO)
    }

    /// Returns `true` if this opcode opens an array scope.
    #[must_use]
    pub fn is_array_start(self) -> bool {
        self.info().flags.contains(OpcodeFlags::ARRAY_START)
    }
}
