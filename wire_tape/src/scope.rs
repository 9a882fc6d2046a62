// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded scope stack for nested structs and arrays.
//!
//! Nesting is tracked with an explicit stack rather than native recursion, so corrupt or
//! hostile programs hit [`ScopeError::Overflow`] instead of exhausting the native stack.

use alloc::vec::Vec;

use crate::keys::KeyId;

/// One open scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A nested struct.
    Struct {
        /// Struct key.
        key: KeyId,
    },
    /// An array whose body is being repeated.
    Array {
        /// Array key.
        key: KeyId,
        /// Offset of the first body instruction.
        body_ip: usize,
        /// Elements left, including the one in progress. Unused when `until_end` is set.
        remaining: u64,
        /// Cursor position at the start of the element in progress.
        start_cursor: usize,
        /// Repeat until the buffer is exhausted (`arr_eof`).
        until_end: bool,
    },
}

impl Frame {
    /// The key of the construct that opened this frame.
    #[must_use]
    pub fn key(&self) -> KeyId {
        match *self {
            Self::Struct { key, .. } | Self::Array { key, .. } => key,
        }
    }

    /// Returns `true` for array frames.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }
}

/// A scope stack operation failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// Pushing would exceed the maximum depth.
    #[error("scope depth limit {max} exceeded")]
    Overflow {
        /// Configured maximum depth.
        max: usize,
    },
    /// Popped with no open scope.
    #[error("no open scope to close")]
    Underflow,
}

/// A scope stack with a hard depth limit.
#[derive(Clone, Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl ScopeStack {
    /// Creates an empty stack allowing at most `max_depth` open frames.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Clears all frames and sets a new depth limit, keeping the allocation.
    pub fn reset(&mut self, max_depth: usize) {
        self.frames.clear();
        self.max_depth = max_depth;
    }

    /// Number of open frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no frame is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pushes `frame`.
    pub fn push(&mut self, frame: Frame) -> Result<(), ScopeError> {
        if self.frames.len() >= self.max_depth {
            return Err(ScopeError::Overflow {
                max: self.max_depth,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the innermost frame.
    pub fn pop(&mut self) -> Result<Frame, ScopeError> {
        self.frames.pop().ok_or(ScopeError::Underflow)
    }

    /// The innermost frame.
    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The innermost frame, mutably.
    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Returns `true` if any open frame is an array.
    #[must_use]
    pub fn inside_array(&self) -> bool {
        self.frames.iter().any(Frame::is_array)
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, ScopeError, ScopeStack};
    use crate::keys::KeyId;

    fn st(k: u16) -> Frame {
        Frame::Struct { key: KeyId(k) }
    }

    #[test]
    fn depth_limit_is_exact() {
        let mut s = ScopeStack::new(2);
        s.push(st(1)).unwrap();
        s.push(st(2)).unwrap();
        assert_eq!(s.push(st(3)), Err(ScopeError::Overflow { max: 2 }));
        assert_eq!(s.depth(), 2);
        assert_eq!(s.pop().map(|f| f.key()), Ok(KeyId(2)));
        assert_eq!(s.pop().map(|f| f.key()), Ok(KeyId(1)));
        assert_eq!(s.pop(), Err(ScopeError::Underflow));
    }

    #[test]
    fn tracks_array_ancestry() {
        let mut s = ScopeStack::new(4);
        s.push(st(0)).unwrap();
        assert!(!s.inside_array());
        s.push(Frame::Array {
            key: KeyId(1),
            body_ip: 7,
            remaining: 3,
            start_cursor: 0,
            until_end: false,
        })
        .unwrap();
        s.push(st(2)).unwrap();
        assert!(s.inside_array());
        s.reset(4);
        assert!(s.is_empty());
    }
}
