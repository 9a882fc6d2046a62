// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for `wire_tape`.
//!
//! Tracing is optional and `no_std` friendly. The VM only emits events requested by a
//! [`TraceMask`]; with [`TraceMask::NONE`] the hooks cost one branch per event site.
//!
//! To enable tracing, pass a [`TraceMask`] and [`TraceSink`] to [`Vm::run`].

#[cfg(doc)]
use crate::vm::Vm;

use crate::cursor::Cursor;
use crate::gateway::Mode;
use crate::keys::KeyId;
use crate::opcode::Opcode;
use crate::program::Program;
use crate::vm::{ExecError, RunSummary};

/// A set of trace events requested by a [`TraceSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceMask(u32);

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TraceMask {
    /// No tracing.
    pub const NONE: Self = Self(0);
    /// Trace run boundaries.
    ///
    /// Enables:
    /// - [`TraceSink::run_start`]
    /// - [`TraceSink::run_end`]
    pub const RUN: Self = Self(1 << 0);
    /// Trace each executed instruction.
    ///
    /// Enables:
    /// - [`TraceSink::instr`]
    pub const INSTR: Self = Self(1 << 1);
    /// Trace struct and array scopes.
    ///
    /// Enables (for [`ScopeKind::Struct`] and [`ScopeKind::Array`]):
    /// - [`TraceSink::scope_enter`]
    /// - [`TraceSink::scope_exit`]
    pub const SCOPE: Self = Self(1 << 2);
    /// Trace gateway calls.
    ///
    /// Enables (for [`ScopeKind::Gateway`]):
    /// - [`TraceSink::scope_enter`]
    /// - [`TraceSink::scope_exit`]
    pub const GATEWAY: Self = Self(1 << 3);

    /// Every event.
    pub const ALL: Self = Self(0b1111);

    /// Returns `true` if this mask includes all bits in `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// The kind of scope being entered/exited.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// A nested struct.
    Struct {
        /// Struct key.
        key: KeyId,
    },
    /// An array, spanning all of its elements.
    Array {
        /// Array key.
        key: KeyId,
    },
    /// One gateway call.
    Gateway {
        /// Field key.
        key: KeyId,
        /// Opcode reported to the gateway.
        opcode: Opcode,
    },
}

impl ScopeKind {
    pub(crate) fn mask(self) -> TraceMask {
        match self {
            Self::Struct { .. } | Self::Array { .. } => TraceMask::SCOPE,
            Self::Gateway { .. } => TraceMask::GATEWAY,
        }
    }
}

/// Run outcome for tracing.
#[derive(Clone, Debug)]
pub enum TraceOutcome<'a> {
    /// Successful run.
    Ok(&'a RunSummary),
    /// Faulted.
    Fault(&'a ExecError),
}

/// A trace sink that can receive VM events.
pub trait TraceSink {
    /// Returns the set of events the sink wants.
    fn mask(&self) -> TraceMask {
        TraceMask::NONE
    }

    /// Called at the start of a VM run.
    ///
    /// Called only if the run's mask includes [`TraceMask::RUN`].
    ///
    /// - `program`: program being executed
    /// - `mode`: encode or decode
    /// - `buf_len`: length of the record buffer
    fn run_start(&mut self, _program: &Program, _mode: Mode, _buf_len: usize) {}

    /// Called for each executed instruction, after it completes.
    ///
    /// Called only if the run's mask includes [`TraceMask::INSTR`].
    ///
    /// - `ip`: byte offset of the instruction
    /// - `next_ip`: byte offset execution continues at
    /// - `cursor`: cursor after the instruction
    fn instr(
        &mut self,
        _program: &Program,
        _ip: usize,
        _next_ip: usize,
        _opcode: Opcode,
        _cursor: Cursor,
    ) {
    }

    /// Called when entering a scope.
    ///
    /// `depth` is the scope depth after entering (gateway scopes report the enclosing depth).
    fn scope_enter(&mut self, _program: &Program, _kind: ScopeKind, _depth: usize, _ip: usize) {}

    /// Called when exiting a scope.
    ///
    /// `depth` is the scope depth before exiting.
    fn scope_exit(&mut self, _program: &Program, _kind: ScopeKind, _depth: usize, _ip: usize) {}

    /// Called at the end of a VM run.
    ///
    /// Called only if the run's mask includes [`TraceMask::RUN`].
    fn run_end(&mut self, _program: &Program, _outcome: TraceOutcome<'_>) {}
}
