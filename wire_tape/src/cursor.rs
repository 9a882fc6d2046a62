// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte/bit cursor over the caller's record buffer.
//!
//! The cursor holds only positions; buffers are passed per call so the VM can lend disjoint
//! slices of the same buffer to the gateway. Every access is bounds-checked before any byte is
//! touched, so a failed access leaves both the cursor and the buffer unchanged.
//!
//! Bit fields fill each byte from its least significant bit and emit a field's value least
//! significant bit first, whatever the current [`Endian`].

use core::ops::Range;

/// Byte order for multi-byte fields.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// An access would run past the end of the buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("access of {needed} bits at byte {at} exceeds {available} available bits")]
pub struct OutOfBounds {
    /// Byte position of the cursor.
    pub at: usize,
    /// Bits requested.
    pub needed: u64,
    /// Bits left in the buffer.
    pub available: u64,
}

/// Byte position plus sub-byte bit offset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pos: usize,
    bit: u8,
}

impl Cursor {
    /// A cursor at the start of the buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { pos: 0, bit: 0 }
    }

    /// Byte position of the next access.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bits already used in the byte at [`Cursor::position`] (0..=7).
    #[must_use]
    pub const fn bit_offset(&self) -> u8 {
        self.bit
    }

    /// Bytes touched so far, counting a trailing partial byte.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.pos + (self.bit != 0) as usize
    }

    /// Rounds a partial byte up to the next byte boundary.
    pub fn align(&mut self) {
        if self.bit != 0 {
            self.pos += 1;
            self.bit = 0;
        }
    }

    /// Whole bytes left between the cursor and the end of a `len`-byte buffer.
    #[must_use]
    pub fn remaining(&self, len: usize) -> usize {
        len.saturating_sub(self.pos)
    }

    /// Bits left between the cursor and the end of a `len`-byte buffer.
    #[must_use]
    pub fn available_bits(&self, len: usize) -> u64 {
        (self.remaining(len) as u64 * 8).saturating_sub(u64::from(self.bit))
    }

    fn oob(&self, len: usize, needed: u64) -> OutOfBounds {
        OutOfBounds {
            at: self.pos,
            needed,
            available: self.available_bits(len),
        }
    }

    /// Returns the byte range of the next `n` bytes, without moving.
    ///
    /// The cursor must be byte-aligned.
    pub fn span(&self, len: usize, n: usize) -> Result<Range<usize>, OutOfBounds> {
        debug_assert_eq!(self.bit, 0, "byte access on an unaligned cursor");
        match self.pos.checked_add(n) {
            Some(end) if end <= len => Ok(self.pos..end),
            _ => Err(self.oob(len, (n as u64).saturating_mul(8))),
        }
    }

    /// Moves forward `n` bytes after a successful [`Cursor::span`].
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Reads an unsigned integer of `width` bytes and advances.
    pub fn read_uint(
        &mut self,
        buf: &[u8],
        width: usize,
        endian: Endian,
    ) -> Result<u64, OutOfBounds> {
        let range = self.span(buf.len(), width)?;
        let v = load_uint(&buf[range], endian);
        self.advance(width);
        Ok(v)
    }

    /// Writes the low `width` bytes of `v` and advances.
    pub fn write_uint(
        &mut self,
        buf: &mut [u8],
        width: usize,
        v: u64,
        endian: Endian,
    ) -> Result<(), OutOfBounds> {
        let range = self.span(buf.len(), width)?;
        store_uint(&mut buf[range], v, endian);
        self.advance(width);
        Ok(())
    }

    fn check_bits(&self, len: usize, n: u64) -> Result<(), OutOfBounds> {
        if n > self.available_bits(len) {
            return Err(self.oob(len, n));
        }
        Ok(())
    }

    fn step_bit(&mut self) {
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.pos += 1;
        }
    }

    fn bit_mask(&self) -> u8 {
        1 << self.bit
    }

    /// Reads an `n`-bit unsigned value (`n` in `1..=64`).
    pub fn read_bits(&mut self, buf: &[u8], n: u8) -> Result<u64, OutOfBounds> {
        debug_assert!((1..=64).contains(&n));
        self.check_bits(buf.len(), u64::from(n))?;
        let mut v = 0_u64;
        for i in 0..n {
            let set = buf[self.pos] & self.bit_mask() != 0;
            v |= u64::from(set) << i;
            self.step_bit();
        }
        Ok(v)
    }

    /// Writes the low `n` bits of `v` (`n` in `1..=64`).
    pub fn write_bits(&mut self, buf: &mut [u8], n: u8, v: u64) -> Result<(), OutOfBounds> {
        debug_assert!((1..=64).contains(&n));
        self.check_bits(buf.len(), u64::from(n))?;
        for i in 0..n {
            let mask = self.bit_mask();
            if (v >> i) & 1 == 1 {
                buf[self.pos] |= mask;
            } else {
                buf[self.pos] &= !mask;
            }
            self.step_bit();
        }
        Ok(())
    }

    /// Skips `n` bits without touching the buffer.
    pub fn skip_bits(&mut self, len: usize, n: u64) -> Result<(), OutOfBounds> {
        self.check_bits(len, n)?;
        let total = u64::from(self.bit) + n;
        self.pos += (total / 8) as usize;
        self.bit = (total % 8) as u8;
        Ok(())
    }

    /// Pads to the next byte boundary with all-zero or all-one bits.
    pub fn fill_to_boundary(&mut self, buf: &mut [u8], ones: bool) -> Result<(), OutOfBounds> {
        if self.bit == 0 {
            return Ok(());
        }
        let n = 8 - self.bit;
        let v = if ones { u64::MAX } else { 0 };
        self.write_bits(buf, n, v)
    }
}

/// Loads an unsigned integer from `bytes` (at most 8).
#[must_use]
pub fn load_uint(bytes: &[u8], endian: Endian) -> u64 {
    debug_assert!(bytes.len() <= 8);
    let fold = |v: u64, b: &u8| (v << 8) | u64::from(*b);
    match endian {
        Endian::Little => bytes.iter().rev().fold(0, fold),
        Endian::Big => bytes.iter().fold(0, fold),
    }
}

/// Stores the low `bytes.len()` bytes of `v` (at most 8).
pub fn store_uint(bytes: &mut [u8], v: u64, endian: Endian) {
    debug_assert!(bytes.len() <= 8);
    let n = bytes.len();
    for i in 0..n {
        let b = (v >> (8 * i)) as u8;
        match endian {
            Endian::Little => bytes[i] = b,
            Endian::Big => bytes[n - 1 - i] = b,
        }
    }
}

/// Mask selecting the low `bits` bits.
#[must_use]
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1_u64 << bits) - 1
    }
}

/// Sign-extends the low `bits` bits of `v`.
#[must_use]
pub const fn sign_extend(v: u64, bits: u32) -> i64 {
    if bits == 0 || bits >= 64 {
        return v as i64;
    }
    let shift = 64 - bits;
    ((v << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::{Cursor, Endian, load_uint, sign_extend, store_uint};

    #[test]
    fn bits_pack_lsb_first() {
        let mut buf = [0_u8; 2];
        let mut c = Cursor::new();
        c.write_bits(&mut buf, 4, 0xF).unwrap();
        c.write_bits(&mut buf, 6, 0x2A).unwrap();
        c.write_bits(&mut buf, 6, 0x15).unwrap();
        assert_eq!(buf, [0xAF, 0x56]);
        assert_eq!(c.position(), 2);
        assert_eq!(c.bit_offset(), 0);

        let mut r = Cursor::new();
        assert_eq!(r.read_bits(&buf, 4), Ok(0xF));
        assert_eq!(r.read_bits(&buf, 6), Ok(0x2A));
        assert_eq!(r.read_bits(&buf, 6), Ok(0x15));
    }

    #[test]
    fn bit_runs_straddle_bytes_lsb_first() {
        let mut buf = [0_u8; 2];
        let mut c = Cursor::new();
        c.write_bits(&mut buf, 3, 0b101).unwrap();
        c.write_bits(&mut buf, 5, 0b00011).unwrap();
        c.write_bits(&mut buf, 4, 0b1110).unwrap();
        assert_eq!(buf, [0x1D, 0x0E]);
        assert_eq!(c.consumed(), 2);

        let mut r = Cursor::new();
        assert_eq!(r.read_bits(&buf, 3), Ok(0b101));
        assert_eq!(r.read_bits(&buf, 5), Ok(0b00011));
        assert_eq!(r.read_bits(&buf, 4), Ok(0b1110));
    }

    #[test]
    fn writes_clear_stale_bits() {
        let mut buf = [0xFF_u8];
        let mut c = Cursor::new();
        c.write_bits(&mut buf, 4, 0).unwrap();
        assert_eq!(buf, [0xF0]);
    }

    #[test]
    fn bit_access_is_bounds_checked_up_front() {
        let mut buf = [0_u8; 1];
        let mut c = Cursor::new();
        c.write_bits(&mut buf, 5, 0x1F).unwrap();
        let err = c.write_bits(&mut buf, 4, 0xF).unwrap_err();
        assert_eq!(err.available, 3);
        assert_eq!(buf, [0x1F]);
        assert_eq!((c.position(), c.bit_offset()), (0, 5));
        assert!(c.skip_bits(1, 4).is_err());
        c.skip_bits(1, 3).unwrap();
        assert_eq!((c.position(), c.bit_offset()), (1, 0));
    }

    #[test]
    fn fill_pads_to_boundary() {
        let mut buf = [0_u8; 1];
        let mut c = Cursor::new();
        c.write_bits(&mut buf, 3, 0).unwrap();
        c.fill_to_boundary(&mut buf, true).unwrap();
        assert_eq!(buf, [0xF8]);
        assert_eq!(c.bit_offset(), 0);
        c.fill_to_boundary(&mut buf, true).unwrap();
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn uint_helpers_honour_endianness() {
        let mut buf = [0_u8; 4];
        store_uint(&mut buf, 0x1122_3344, Endian::Big);
        assert_eq!(buf, [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(load_uint(&buf, Endian::Little), 0x4433_2211);
        let mut c = Cursor::new();
        assert!(c.read_uint(&buf[..3], 4, Endian::Little).is_err());
        assert_eq!(c.position(), 0);
        assert_eq!(c.read_uint(&buf, 2, Endian::Big), Ok(0x1122));
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0b111, 3), -1);
        assert_eq!(sign_extend(0b100, 3), -4);
        assert_eq!(sign_extend(0b011, 3), 3);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
    }
}
