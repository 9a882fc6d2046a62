// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key ids and the key/name table.
//!
//! The interpreter dispatches purely on [`KeyId`]; names exist for hosts, tooling and
//! disassembly.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A field key id as carried in bytecode operands.
///
/// Key ids are stable across encode/decode of one program and repeat for every element of a
/// homogeneous array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyId(pub u16);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered key names; entry `n` names [`KeyId`]`(n)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyTable {
    names: Vec<String>,
}

impl KeyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of named keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no keys are named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Appends `name`, returning its key id.
    ///
    /// Returns `None` once the table holds `u16::MAX + 1` entries.
    pub fn push(&mut self, name: impl Into<String>) -> Option<KeyId> {
        let id = u16::try_from(self.names.len()).ok()?;
        self.names.push(name.into());
        Some(KeyId(id))
    }

    /// Returns the id of `name`, adding it if it is not already present.
    pub fn intern(&mut self, name: &str) -> Option<KeyId> {
        match self.lookup(name) {
            Some(id) => Some(id),
            None => self.push(name),
        }
    }

    /// Resolves `key` to its name.
    #[must_use]
    pub fn name_for(&self, key: KeyId) -> Option<&str> {
        self.names.get(usize::from(key.0)).map(String::as_str)
    }

    /// Finds the first key with the given name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<KeyId> {
        let idx = self.names.iter().position(|n| n == name)?;
        u16::try_from(idx).ok().map(KeyId)
    }

    /// Iterates `(key, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (KeyId, &str)> + '_ {
        self.names
            .iter()
            .zip(0_u16..)
            .map(|(n, i)| (KeyId(i), n.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyId, KeyTable};

    #[test]
    fn names_resolve_by_position() {
        let mut t = KeyTable::new();
        assert_eq!(t.push("id"), Some(KeyId(0)));
        assert_eq!(t.push("temp"), Some(KeyId(1)));
        assert_eq!(t.intern("id"), Some(KeyId(0)));
        assert_eq!(t.intern("flags"), Some(KeyId(2)));
        assert_eq!(t.name_for(KeyId(1)), Some("temp"));
        assert_eq!(t.name_for(KeyId(9)), None);
        assert_eq!(t.lookup("flags"), Some(KeyId(2)));
        let pairs: alloc::vec::Vec<_> = t.iter().collect();
        assert_eq!(pairs[2], (KeyId(2), "flags"));
    }
}
