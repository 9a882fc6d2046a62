// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Field-binding gateway: the callback boundary between the VM and host field storage.
//!
//! The VM never sees host types. For every field-class instruction it calls
//! [`Gateway::field`] once with a [`FieldCall`] describing the field and a [`FieldValue`]
//! view. In [`Mode::Encode`] the host writes its value into the view; in [`Mode::Decode`] it
//! reads the value out. Views borrow the record buffer (or VM-owned staging) and cannot outlive
//! the call.
//!
//! What a host receives, by opcode:
//!
//! | opcode | value |
//! |---|---|
//! | `io_u8` ..= `io_bool`, `raw_bytes` | [`FieldValue::Wire`] over the field's bytes |
//! | `io_i64` / `io_f64` after a transform | [`FieldValue::Scalar`] holding the engineering value |
//! | `io_bit_*` | [`FieldValue::Scalar`] |
//! | strings | [`FieldValue::Text`] (decode) or [`FieldValue::TextSlot`] (encode) |
//! | array starts | [`FieldValue::Scalar`] with the element count |
//! | `ctx_query` | [`FieldValue::Scalar`] the host fills with the field's current value |
//! | `const_check` (decode) | [`FieldValue::Scalar`] with the verified value |
//! | `enter_struct`, `exit_struct`, `arr_end` | [`FieldValue::None`] |
//! | optional field missing from input | [`FieldValue::Absent`] |

use alloc::vec::Vec;

use crate::cursor::{Endian, load_uint, store_uint};
use crate::keys::KeyId;
use crate::opcode::Opcode;
use crate::transform::truncate_f64;

/// Direction of a run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Host value to bytes.
    Encode,
    /// Bytes to host value.
    Decode,
}

/// Identifies the field a gateway call is about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldCall {
    /// Run direction.
    pub mode: Mode,
    /// Endianness in effect for this field.
    pub endian: Endian,
    /// Field key.
    pub key: KeyId,
    /// Instruction opcode (or `io_i64`/`io_f64` for transformed fields).
    pub opcode: Opcode,
}

/// Errors a gateway can report. Any of them aborts the run, except [`GatewayError::Missing`]
/// for a field marked optional during encode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The host has no field for this key.
    #[error("unknown key {key}")]
    UnknownKey {
        /// The unrecognized key.
        key: KeyId,
    },
    /// The view does not have the shape the host expected.
    #[error("field type mismatch")]
    TypeMismatch,
    /// The host has no value for this field.
    #[error("field value missing")]
    Missing,
    /// The host failed for its own reasons.
    #[error("gateway failed")]
    Failed,
}

/// A host implementation of the field-binding callback.
pub trait Gateway {
    /// Supplies (encode) or accepts (decode) one field.
    fn field(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError>;
}

impl<G: Gateway + ?Sized> Gateway for &mut G {
    fn field(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        (**self).field(call, value)
    }
}

/// Adapts a closure into a [`Gateway`].
#[derive(Clone, Debug)]
pub struct FnGateway<F>(pub F);

impl<F> Gateway for FnGateway<F>
where
    F: FnMut(&FieldCall, FieldValue<'_>) -> Result<(), GatewayError>,
{
    fn field(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        (self.0)(call, value)
    }
}

/// Creates a [`Gateway`] from a closure.
///
/// The bound lets closure parameter types be inferred at the call site.
pub fn from_fn<F>(f: F) -> FnGateway<F>
where
    F: FnMut(&FieldCall, FieldValue<'_>) -> Result<(), GatewayError>,
{
    FnGateway(f)
}

/// A transient view handed to the gateway for one call.
#[derive(Debug)]
pub enum FieldValue<'a> {
    /// Structural notification; nothing to read or write.
    None,
    /// The field's bytes in the record buffer (zero copy).
    Wire(WireSlot<'a>),
    /// A staged scalar value.
    Scalar(&'a mut Scalar),
    /// A decoded string body and its framing.
    Text(TextView<'a>),
    /// Staging for a string to encode.
    TextSlot(TextSlot<'a>),
    /// An optional field that is not present in the input (or does not fit the output).
    Absent,
}

/// A staged scalar.
///
/// The VM seeds the variant it expects; hosts may answer with any variant and the VM coerces
/// it (integers reinterpret, floats truncate toward zero, booleans map to `0`/`1`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Unsigned integer.
    U64(u64),
    /// Signed integer.
    I64(i64),
    /// Float.
    F64(f64),
    /// Boolean.
    Bool(bool),
}

impl Scalar {
    /// The value as `u64`.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        match self {
            Self::U64(v) => v,
            Self::I64(v) => v as u64,
            Self::F64(v) => truncate_f64(v) as u64,
            Self::Bool(b) => u64::from(b),
        }
    }

    /// The value as `i64`.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::U64(v) => v as i64,
            Self::I64(v) => v,
            Self::F64(v) => truncate_f64(v),
            Self::Bool(b) => i64::from(b),
        }
    }

    /// The value as `f64`.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::U64(v) => v as f64,
            Self::I64(v) => v as f64,
            Self::F64(v) => v,
            Self::Bool(b) => f64::from(u8::from(b)),
        }
    }

    /// The value as `bool` (non-zero is `true`).
    #[must_use]
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::F64(v) => v != 0.0,
            other => other.as_u64() != 0,
        }
    }
}

/// A field's bytes in the record buffer, with endian-aware typed access.
#[derive(Debug)]
pub struct WireSlot<'a> {
    bytes: &'a mut [u8],
    endian: Endian,
}

macro_rules! wire_accessors {
    ($($get:ident, $set:ident, $t:ty, $u:ty;)*) => {
        $(
            #[doc = concat!("Reads the slot as `", stringify!($t), "`.")]
            pub fn $get(&self) -> Result<$t, GatewayError> {
                let raw = self.uint(core::mem::size_of::<$t>())?;
                Ok(<$u>::try_from(raw).map_err(|_| GatewayError::TypeMismatch)? as $t)
            }

            #[doc = concat!("Writes `v` into the slot as `", stringify!($t), "`.")]
            pub fn $set(&mut self, v: $t) -> Result<(), GatewayError> {
                self.set_uint(core::mem::size_of::<$t>(), u64::from(v as $u))
            }
        )*
    };
}

impl<'a> WireSlot<'a> {
    /// Wraps `bytes` with the endianness in effect.
    #[must_use]
    pub fn new(bytes: &'a mut [u8], endian: Endian) -> Self {
        Self { bytes, endian }
    }

    /// Number of bytes in the slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Endianness of multi-byte values in this slot.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    /// The raw bytes, mutably.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Copies `src` into the slot; lengths must match.
    pub fn copy_from(&mut self, src: &[u8]) -> Result<(), GatewayError> {
        if src.len() != self.bytes.len() {
            return Err(GatewayError::TypeMismatch);
        }
        self.bytes.copy_from_slice(src);
        Ok(())
    }

    /// Reads the slot as an unsigned integer of whatever width it has (at most 8 bytes).
    pub fn raw(&self) -> Result<u64, GatewayError> {
        if self.bytes.len() > 8 {
            return Err(GatewayError::TypeMismatch);
        }
        Ok(load_uint(self.bytes, self.endian))
    }

    /// Writes the low bytes of `v`, whatever the slot width (at most 8 bytes).
    pub fn set_raw(&mut self, v: u64) -> Result<(), GatewayError> {
        if self.bytes.len() > 8 {
            return Err(GatewayError::TypeMismatch);
        }
        store_uint(self.bytes, v, self.endian);
        Ok(())
    }

    fn uint(&self, width: usize) -> Result<u64, GatewayError> {
        if self.bytes.len() != width {
            return Err(GatewayError::TypeMismatch);
        }
        Ok(load_uint(self.bytes, self.endian))
    }

    fn set_uint(&mut self, width: usize, v: u64) -> Result<(), GatewayError> {
        if self.bytes.len() != width {
            return Err(GatewayError::TypeMismatch);
        }
        store_uint(self.bytes, v, self.endian);
        Ok(())
    }

    wire_accessors! {
        u8, set_u8, u8, u8;
        u16, set_u16, u16, u16;
        u32, set_u32, u32, u32;
        u64, set_u64, u64, u64;
        i8, set_i8, i8, u8;
        i16, set_i16, i16, u16;
        i32, set_i32, i32, u32;
        i64, set_i64, i64, u64;
    }

    /// Reads the slot as `f32`.
    pub fn f32(&self) -> Result<f32, GatewayError> {
        Ok(f32::from_bits(self.u32()?))
    }

    /// Writes `v` into the slot as `f32`.
    pub fn set_f32(&mut self, v: f32) -> Result<(), GatewayError> {
        self.set_u32(v.to_bits())
    }

    /// Reads the slot as `f64`.
    pub fn f64(&self) -> Result<f64, GatewayError> {
        Ok(f64::from_bits(self.u64()?))
    }

    /// Writes `v` into the slot as `f64`.
    pub fn set_f64(&mut self, v: f64) -> Result<(), GatewayError> {
        self.set_u64(v.to_bits())
    }

    /// Reads a one-byte boolean (non-zero is `true`).
    pub fn bool(&self) -> Result<bool, GatewayError> {
        Ok(self.u8()? != 0)
    }

    /// Writes a one-byte boolean.
    pub fn set_bool(&mut self, v: bool) -> Result<(), GatewayError> {
        self.set_u8(u8::from(v))
    }
}

/// A decoded string: the body plus the length prefix immediately in front of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextView<'a> {
    framed: &'a [u8],
    prefix_len: usize,
}

impl<'a> TextView<'a> {
    /// Creates a view over `framed`, whose first `prefix_len` bytes are the length prefix.
    #[must_use]
    pub fn new(framed: &'a [u8], prefix_len: usize) -> Self {
        debug_assert!(prefix_len <= framed.len());
        Self { framed, prefix_len }
    }

    /// The string body, without prefix or terminator.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        &self.framed[self.prefix_len..]
    }

    /// The raw length-prefix bytes (empty for NUL-terminated strings).
    #[must_use]
    pub fn prefix(&self) -> &'a [u8] {
        &self.framed[..self.prefix_len]
    }

    /// Body length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.framed.len() - self.prefix_len
    }

    /// Returns `true` for an empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The body as UTF-8.
    pub fn as_str(&self) -> Result<&'a str, GatewayError> {
        core::str::from_utf8(self.body()).map_err(|_| GatewayError::TypeMismatch)
    }
}

/// Staging for a string the host wants encoded.
///
/// The VM copies the staged bytes into the buffer after the call, truncating them to what the
/// instruction can represent, and writes the length framing itself.
#[derive(Debug)]
pub struct TextSlot<'a> {
    staged: &'a mut Vec<u8>,
    limit: u64,
}

impl<'a> TextSlot<'a> {
    /// Wraps VM-owned staging storage. `limit` is the longest body the instruction can carry.
    #[must_use]
    pub fn new(staged: &'a mut Vec<u8>, limit: u64) -> Self {
        staged.clear();
        Self { staged, limit }
    }

    /// Longest body that will be written; longer input is truncated.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Stages raw bytes.
    pub fn set(&mut self, bytes: &[u8]) {
        self.staged.clear();
        self.staged.extend_from_slice(bytes);
    }

    /// Stages a UTF-8 string.
    pub fn set_str(&mut self, s: &str) {
        self.set(s.as_bytes());
    }

    /// The currently staged bytes.
    #[must_use]
    pub fn staged(&self) -> &[u8] {
        self.staged
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldCall, FieldValue, Gateway, GatewayError, Mode, Scalar, TextSlot, from_fn};
    use super::{TextView, WireSlot};
    use crate::cursor::Endian;
    use crate::keys::KeyId;
    use crate::opcode::Opcode;
    use alloc::vec::Vec;

    #[test]
    fn wire_slot_typed_access() {
        let mut buf = [0_u8; 4];
        let mut slot = WireSlot::new(&mut buf, Endian::Big);
        slot.set_i32(-2).unwrap();
        assert_eq!(slot.u32(), Ok(0xFFFF_FFFE));
        assert_eq!(slot.i32(), Ok(-2));
        assert_eq!(slot.u16(), Err(GatewayError::TypeMismatch));
        slot.set_f32(1.5).unwrap();
        assert_eq!(slot.f32(), Ok(1.5));
        assert_eq!(buf, 1.5_f32.to_be_bytes());
    }

    #[test]
    fn wire_slot_raw_access_ignores_width() {
        let mut buf = [0_u8; 3];
        let mut slot = WireSlot::new(&mut buf, Endian::Little);
        slot.set_raw(0xAABB_CCDD).unwrap();
        assert_eq!(slot.raw(), Ok(0x00BB_CCDD));
        assert_eq!(buf, [0xDD, 0xCC, 0xBB]);

        let mut wide = [0_u8; 9];
        let slot = WireSlot::new(&mut wide, Endian::Little);
        assert_eq!(slot.raw(), Err(GatewayError::TypeMismatch));
    }

    #[test]
    fn text_view_exposes_prefix_behind_body() {
        let framed = [3, b'a', b'b', b'c'];
        let v = TextView::new(&framed, 1);
        assert_eq!(v.prefix(), &[3]);
        assert_eq!(v.as_str(), Ok("abc"));
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn text_slot_restages() {
        let mut storage = Vec::from(*b"stale");
        let mut slot = TextSlot::new(&mut storage, 8);
        assert!(slot.staged().is_empty());
        slot.set_str("hi");
        assert_eq!(slot.staged(), b"hi");
        assert_eq!(slot.limit(), 8);
    }

    #[test]
    fn scalar_coercions() {
        assert_eq!(Scalar::I64(-1).as_u64(), u64::MAX);
        assert_eq!(Scalar::F64(-2.9).as_i64(), -2);
        assert_eq!(Scalar::Bool(true).as_f64(), 1.0);
        assert!(Scalar::U64(2).as_bool());
    }

    #[test]
    fn closures_and_references_are_gateways() {
        let mut seen = Vec::new();
        let mut g = from_fn(|call, _v| {
            seen.push(call.key);
            Ok(())
        });
        let call = FieldCall {
            mode: Mode::Decode,
            endian: Endian::Little,
            key: KeyId(7),
            opcode: Opcode::EnterStruct,
        };
        let by_ref: &mut dyn Gateway = &mut g;
        by_ref.field(&call, FieldValue::None).unwrap();
        (&mut g).field(&call, FieldValue::None).unwrap();
        drop(g);
        assert_eq!(seen, [KeyId(7), KeyId(7)]);
    }
}
