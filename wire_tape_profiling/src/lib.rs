// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace sinks for `wire_tape`.
//!
//! [`LogTraceSink`] forwards VM events to [`tracing`]. [`ProfilingTraceSink`] turns struct, array
//! and gateway scopes into Tracy zones (build with the `tracy` feature to connect to a profiler),
//! labelled through a [`LabelResolver`].

use std::collections::HashMap;
use std::fmt;

use tracy_client::{Client, Span};
use wire_tape::cursor::Cursor;
use wire_tape::gateway::Mode;
use wire_tape::keys::KeyId;
use wire_tape::opcode::Opcode;
use wire_tape::program::Program;
use wire_tape::trace::{ScopeKind, TraceMask, TraceOutcome, TraceSink};

/// Produces zone labels for scopes.
///
/// Returning `None` falls back to a generic label.
pub trait LabelResolver {
    /// Label for a struct scope.
    fn struct_label(&mut self, key: KeyId, program: &Program) -> Option<String>;

    /// Label for an array scope (spanning all elements).
    fn array_label(&mut self, key: KeyId, program: &Program) -> Option<String>;

    /// Label for a single gateway call.
    fn gateway_label(&mut self, key: KeyId, opcode: Opcode, program: &Program) -> Option<String>;
}

/// What a cached label names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Zone {
    Struct(KeyId),
    Array(KeyId),
    Gateway(KeyId, Opcode),
}

impl Zone {
    fn key(self) -> KeyId {
        match self {
            Self::Struct(key) | Self::Array(key) | Self::Gateway(key, _) => key,
        }
    }
}

/// Labels scopes with the program's key names, caching the formatted strings.
#[derive(Clone, Debug, Default)]
pub struct ProgramKeyResolver {
    cache: HashMap<Zone, String>,
}

impl ProgramKeyResolver {
    fn label(&mut self, zone: Zone, program: &Program) -> Option<String> {
        let label = self.cache.entry(zone).or_insert_with(|| {
            let key = zone.key();
            let name = match program.key_name(key) {
                Some(name) => name.to_owned(),
                None => key.to_string(),
            };
            match zone {
                Zone::Struct(_) => format!("struct {name}"),
                Zone::Array(_) => format!("array {name}"),
                Zone::Gateway(_, op) => format!("{} {name}", op.mnemonic()),
            }
        });
        Some(label.clone())
    }
}

impl LabelResolver for ProgramKeyResolver {
    fn struct_label(&mut self, key: KeyId, program: &Program) -> Option<String> {
        self.label(Zone::Struct(key), program)
    }

    fn array_label(&mut self, key: KeyId, program: &Program) -> Option<String> {
        self.label(Zone::Array(key), program)
    }

    fn gateway_label(&mut self, key: KeyId, opcode: Opcode, program: &Program) -> Option<String> {
        self.label(Zone::Gateway(key, opcode), program)
    }
}

/// A [`TraceSink`] that opens one Tracy zone per run, struct, array and gateway call.
///
/// Zones nest the way the scopes do; anything still open when a run ends (after a fault) is
/// closed with it.
pub struct ProfilingTraceSink<R = ProgramKeyResolver> {
    resolver: R,
    spans: Vec<Option<Span>>,
    mask: TraceMask,
}

impl<R: fmt::Debug> fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("resolver", &self.resolver)
            .field("open_zones", &self.spans.len())
            .field("mask", &self.mask)
            .finish()
    }
}

impl Default for ProfilingTraceSink {
    fn default() -> Self {
        Self::with_resolver(ProgramKeyResolver::default())
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Creates a sink that labels zones through `resolver`.
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            spans: Vec::new(),
            mask: TraceMask::RUN | TraceMask::SCOPE | TraceMask::GATEWAY,
        }
    }

    /// Drops gateway zones, keeping only runs and structural scopes.
    #[must_use]
    pub fn without_gateway_zones(mut self) -> Self {
        self.mask = TraceMask::RUN | TraceMask::SCOPE;
        self
    }

    /// The label resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Number of zones currently open.
    pub fn open_zones(&self) -> usize {
        self.spans.len()
    }

    fn open(&mut self, label: &str) {
        let span = Client::running()
            .map(|client| client.span_alloc(Some(label), "wire_tape::vm", file!(), line!(), 0));
        self.spans.push(span);
    }
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        self.mask
    }

    fn run_start(&mut self, _program: &Program, mode: Mode, _buf_len: usize) {
        let label = match mode {
            Mode::Encode => "wire_tape encode",
            Mode::Decode => "wire_tape decode",
        };
        self.open(label);
    }

    fn scope_enter(&mut self, program: &Program, kind: ScopeKind, _depth: usize, _ip: usize) {
        let label = match kind {
            ScopeKind::Struct { key } => self.resolver.struct_label(key, program),
            ScopeKind::Array { key } => self.resolver.array_label(key, program),
            ScopeKind::Gateway { key, opcode } => {
                self.resolver.gateway_label(key, opcode, program)
            }
        };
        self.open(label.as_deref().unwrap_or("wire_tape scope"));
    }

    fn scope_exit(&mut self, _program: &Program, _kind: ScopeKind, _depth: usize, _ip: usize) {
        self.spans.pop();
    }

    fn run_end(&mut self, _program: &Program, _outcome: TraceOutcome<'_>) {
        // Inner zones first.
        while self.spans.pop().is_some() {}
    }
}

/// A [`TraceSink`] that emits [`tracing`] events.
///
/// Runs log at `debug`, scopes and instructions at `trace`, faults at `warn`.
#[derive(Clone, Debug)]
pub struct LogTraceSink {
    mask: TraceMask,
}

impl Default for LogTraceSink {
    fn default() -> Self {
        Self::new(TraceMask::RUN | TraceMask::SCOPE)
    }
}

impl LogTraceSink {
    /// Creates a sink requesting `mask`.
    pub fn new(mask: TraceMask) -> Self {
        Self { mask }
    }
}

fn key_field(program: &Program, key: KeyId) -> String {
    match program.key_name(key) {
        Some(name) => name.to_owned(),
        None => key.to_string(),
    }
}

impl TraceSink for LogTraceSink {
    fn mask(&self) -> TraceMask {
        self.mask
    }

    fn run_start(&mut self, program: &Program, mode: Mode, buf_len: usize) {
        tracing::debug!(
            ?mode,
            buf_len,
            bytecode_len = program.bytecode().len(),
            "run start"
        );
    }

    fn instr(
        &mut self,
        _program: &Program,
        ip: usize,
        next_ip: usize,
        opcode: Opcode,
        cursor: Cursor,
    ) {
        tracing::trace!(
            ip,
            next_ip,
            opcode = opcode.mnemonic(),
            byte = cursor.position(),
            bit = cursor.bit_offset(),
            "instr"
        );
    }

    fn scope_enter(&mut self, program: &Program, kind: ScopeKind, depth: usize, ip: usize) {
        match kind {
            ScopeKind::Struct { key } => {
                tracing::trace!(ip, depth, key = %key_field(program, key), "enter struct");
            }
            ScopeKind::Array { key } => {
                tracing::trace!(ip, depth, key = %key_field(program, key), "enter array");
            }
            ScopeKind::Gateway { key, opcode } => tracing::trace!(
                ip,
                depth,
                key = %key_field(program, key),
                opcode = opcode.mnemonic(),
                "gateway call"
            ),
        }
    }

    fn scope_exit(&mut self, program: &Program, kind: ScopeKind, depth: usize, ip: usize) {
        match kind {
            ScopeKind::Struct { key } => {
                tracing::trace!(ip, depth, key = %key_field(program, key), "exit struct");
            }
            ScopeKind::Array { key } => {
                tracing::trace!(ip, depth, key = %key_field(program, key), "exit array");
            }
            ScopeKind::Gateway { .. } => {}
        }
    }

    fn run_end(&mut self, _program: &Program, outcome: TraceOutcome<'_>) {
        match outcome {
            TraceOutcome::Ok(summary) => tracing::debug!(
                bytes = summary.bytes,
                instructions = summary.instructions,
                "run end"
            ),
            TraceOutcome::Fault(e) => tracing::warn!(
                ip = e.ip,
                code = e.kind().code(),
                "run faulted: {e}"
            ),
        }
    }
}
