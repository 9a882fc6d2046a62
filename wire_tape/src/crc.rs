// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parameterized CRC-16 and CRC-32 used by the `crc16`/`crc32` instructions.

use crate::instr::CrcParams;

/// Flag bit: reflect each input byte.
pub const REFLECT_IN: u8 = 1 << 0;
/// Flag bit: reflect the final register.
pub const REFLECT_OUT: u8 = 1 << 1;

const CRC32_POLY: u32 = 0x04C1_1DB7;

const CRC32_TABLE: [u32; 256] = {
    let poly = CRC32_POLY.reverse_bits();
    let mut table = [0_u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut k = 0;
        while k < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
            k += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

fn reflect(v: u64, width: u32) -> u64 {
    v.reverse_bits() >> (64 - width)
}

fn generic(data: &[u8], width: u32, poly: u64, init: u64, xor_out: u64, flags: u8) -> u64 {
    let mask = crate::cursor::low_mask(width);
    let top = 1_u64 << (width - 1);
    let mut crc = init & mask;
    for &b in data {
        let b = if flags & REFLECT_IN != 0 {
            b.reverse_bits()
        } else {
            b
        };
        crc ^= u64::from(b) << (width - 8);
        for _ in 0..8 {
            let shifted = if crc & top != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            };
            crc = shifted & mask;
        }
    }
    if flags & REFLECT_OUT != 0 {
        crc = reflect(crc, width);
    }
    (crc ^ xor_out) & mask
}

/// Computes a CRC-16 over `data`.
#[must_use]
pub fn crc16(data: &[u8], p: &CrcParams<u16>) -> u16 {
    let v = generic(
        data,
        16,
        u64::from(p.poly),
        u64::from(p.init),
        u64::from(p.xor_out),
        p.flags,
    );
    v as u16
}

/// Computes a CRC-32 over `data`.
#[must_use]
pub fn crc32(data: &[u8], p: &CrcParams<u32>) -> u32 {
    let reflected = REFLECT_IN | REFLECT_OUT;
    if p.poly == CRC32_POLY && p.flags & reflected == reflected {
        let mut crc = p.init.reverse_bits();
        for &b in data {
            crc = (crc >> 8) ^ CRC32_TABLE[usize::from((crc as u8) ^ b)];
        }
        return crc ^ p.xor_out;
    }
    let v = generic(
        data,
        32,
        u64::from(p.poly),
        u64::from(p.init),
        u64::from(p.xor_out),
        p.flags,
    );
    v as u32
}

#[cfg(test)]
mod tests {
    use super::{REFLECT_IN, REFLECT_OUT, crc16, crc32};
    use crate::instr::CrcParams;

    const CHECK: &[u8] = b"123456789";

    #[test]
    fn crc32_iso_hdlc() {
        let p = CrcParams {
            poly: 0x04C1_1DB7,
            init: u32::MAX,
            xor_out: u32::MAX,
            flags: REFLECT_IN | REFLECT_OUT,
        };
        assert_eq!(crc32(CHECK, &p), 0xCBF4_3926);
    }

    #[test]
    fn crc32_table_matches_bitwise() {
        // A non-symmetric init exercises the reflected register setup.
        let table = CrcParams {
            poly: 0x04C1_1DB7,
            init: 0x1234_5678,
            xor_out: 0,
            flags: REFLECT_IN | REFLECT_OUT,
        };
        let bitwise = super::generic(
            CHECK,
            32,
            0x04C1_1DB7,
            0x1234_5678,
            0,
            REFLECT_IN | REFLECT_OUT,
        );
        assert_eq!(u64::from(crc32(CHECK, &table)), bitwise);
    }

    #[test]
    fn crc32_bzip2_unreflected() {
        let p = CrcParams {
            poly: 0x04C1_1DB7,
            init: u32::MAX,
            xor_out: u32::MAX,
            flags: 0,
        };
        assert_eq!(crc32(CHECK, &p), 0xFC89_1918);
    }

    #[test]
    fn crc16_variants() {
        let ccitt_false = CrcParams {
            poly: 0x1021,
            init: 0xFFFF,
            xor_out: 0,
            flags: 0,
        };
        assert_eq!(crc16(CHECK, &ccitt_false), 0x29B1);

        let modbus = CrcParams {
            poly: 0x8005,
            init: 0xFFFF,
            xor_out: 0,
            flags: REFLECT_IN | REFLECT_OUT,
        };
        assert_eq!(crc16(CHECK, &modbus), 0x4B37);
    }
}
