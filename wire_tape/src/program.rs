// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory programs and the packaged IL image container.
//!
//! Packaged image layout (all header fields little-endian):
//!
//! ```text
//! 0..5    magic "CNDIL"
//! 5       version (1)
//! 6..8    string-entry count u16
//! 8..12   string-table offset u32
//! 12..16  bytecode offset u32
//! 16..    string table (packed NUL-terminated names) and bytecode, in either order
//! ```
//!
//! Input without the magic tag is raw bytecode with an empty key table.

use alloc::vec::Vec;

use crate::format::{DecodeError, Reader, Writer};
use crate::keys::{KeyId, KeyTable};

/// Magic tag identifying a packaged IL image.
pub const MAGIC: &[u8; 5] = b"CNDIL";
/// Image format version understood by this loader.
pub const IMAGE_VERSION: u8 = 1;
/// Size of the fixed image header.
pub const HEADER_LEN: usize = 16;

/// A structural error found while loading an IL image.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Input is shorter than the fixed header.
    #[error("image is {len} bytes, shorter than the {HEADER_LEN}-byte header")]
    TooShort {
        /// Input length.
        len: usize,
    },
    /// The magic tag is missing.
    #[error("bad magic header")]
    BadMagic,
    /// The image version is not supported.
    #[error("unsupported image version {version}")]
    UnsupportedVersion {
        /// Version byte found in the header.
        version: u8,
    },
    /// A header offset points into the header or past the end of input.
    #[error("{field} offset {offset} is outside {HEADER_LEN}..={len}")]
    OffsetOutOfBounds {
        /// Which header field was bad.
        field: &'static str,
        /// The offending offset.
        offset: u32,
        /// Input length.
        len: usize,
    },
    /// The string table ended before `count` names were read.
    #[error("string table truncated at entry {index}")]
    TruncatedStringTable {
        /// Index of the first missing/unterminated entry.
        index: u16,
    },
    /// A key name was not valid UTF-8.
    #[error("key name {index} is not valid UTF-8")]
    InvalidKeyName {
        /// Index of the bad entry.
        index: u16,
    },
}

/// A loaded layout program.
///
/// Immutable once built: runs borrow it read-only and it can be shared across threads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    version: u8,
    keys: KeyTable,
    bytecode: Vec<u8>,
}

impl Program {
    /// Creates a program from bytecode and a key table.
    #[must_use]
    pub fn new(bytecode: Vec<u8>, keys: KeyTable) -> Self {
        Self {
            version: IMAGE_VERSION,
            keys,
            bytecode,
        }
    }

    /// Loads either a packaged image or raw bytecode, chosen by the magic tag.
    pub fn load(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.starts_with(MAGIC) {
            Self::from_image(bytes)
        } else {
            Ok(Self::from_bytecode(bytes))
        }
    }

    /// Wraps raw bytecode with an empty key table.
    #[must_use]
    pub fn from_bytecode(bytecode: &[u8]) -> Self {
        tracing::debug!(bytecode_len = bytecode.len(), "loaded raw bytecode");
        Self {
            version: 0,
            keys: KeyTable::new(),
            bytecode: bytecode.to_vec(),
        }
    }

    /// Parses a packaged image.
    pub fn from_image(bytes: &[u8]) -> Result<Self, LoadError> {
        let len = bytes.len();
        if len < HEADER_LEN {
            return Err(LoadError::TooShort { len });
        }
        let header = read_header(bytes).map_err(|_| LoadError::TooShort { len })?;
        if header.magic != MAGIC {
            return Err(LoadError::BadMagic);
        }
        if header.version != IMAGE_VERSION {
            return Err(LoadError::UnsupportedVersion {
                version: header.version,
            });
        }
        let Header {
            version,
            count,
            str_offset,
            bc_offset,
            ..
        } = header;

        let str_start = check_offset("string table", str_offset, len)?;
        let bc_start = check_offset("bytecode", bc_offset, len)?;

        // Each region runs up to the other one when that one follows it, else to end of input.
        let str_end = if bc_start > str_start { bc_start } else { len };
        let bc_end = if str_start > bc_start { str_start } else { len };

        let keys = parse_key_table(&bytes[str_start..str_end], count)?;
        let bytecode = bytes[bc_start..bc_end].to_vec();
        tracing::debug!(
            version,
            keys = keys.len(),
            bytecode_len = bytecode.len(),
            "loaded packaged program"
        );
        Ok(Self {
            version,
            keys,
            bytecode,
        })
    }

    /// Serializes this program as a packaged image: header, string table, then bytecode.
    #[must_use]
    pub fn encode_image(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_bytes(MAGIC);
        w.write_u8(IMAGE_VERSION);
        let count = u16::try_from(self.keys.len()).unwrap_or(u16::MAX);
        w.write_u16_le(count);
        let str_offset_at = w.len();
        w.write_u32_le(0);
        let bc_offset_at = w.len();
        w.write_u32_le(0);

        let str_offset = w.len();
        for (_, name) in self.keys.iter().take(usize::from(count)) {
            w.write_cstr(name);
        }
        let bc_offset = w.len();
        w.write_bytes(&self.bytecode);

        let str_offset = u32::try_from(str_offset).unwrap_or(u32::MAX);
        let bc_offset = u32::try_from(bc_offset).unwrap_or(u32::MAX);
        w.patch_u32_le(str_offset_at, str_offset);
        w.patch_u32_le(bc_offset_at, bc_offset);
        w.into_vec()
    }

    /// Image version; `0` for programs loaded from raw bytecode.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The instruction bytes.
    #[must_use]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// The key/name table.
    #[must_use]
    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    /// Resolves `key` to its field name, if the program carries one.
    #[must_use]
    pub fn key_name(&self, key: KeyId) -> Option<&str> {
        self.keys.name_for(key)
    }
}

struct Header<'a> {
    magic: &'a [u8],
    version: u8,
    count: u16,
    str_offset: u32,
    bc_offset: u32,
}

fn read_header(bytes: &[u8]) -> Result<Header<'_>, DecodeError> {
    let mut r = Reader::new(bytes);
    Ok(Header {
        magic: r.read_bytes(MAGIC.len())?,
        version: r.read_u8()?,
        count: r.read_u16_le()?,
        str_offset: r.read_u32_le()?,
        bc_offset: r.read_u32_le()?,
    })
}

fn check_offset(field: &'static str, offset: u32, len: usize) -> Result<usize, LoadError> {
    let off = usize::try_from(offset).unwrap_or(usize::MAX);
    if off < HEADER_LEN || off > len {
        return Err(LoadError::OffsetOutOfBounds { field, offset, len });
    }
    Ok(off)
}

fn parse_key_table(region: &[u8], count: u16) -> Result<KeyTable, LoadError> {
    let mut r = Reader::new(region);
    let mut keys = KeyTable::new();
    for index in 0..count {
        let name = r.read_cstr().map_err(|e| match e {
            DecodeError::InvalidUtf8 => LoadError::InvalidKeyName { index },
            _ => LoadError::TruncatedStringTable { index },
        })?;
        keys.push(name);
    }
    Ok(keys)
}
