// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout interpreter for `wire_tape`.
//!
//! The VM walks a [`Program`]'s bytecode once per record, moving a [`Cursor`] over the caller's
//! buffer and handing every field to a [`Gateway`]. All layout decisions (widths, endianness, bit
//! packing, alignment, length framing, repetition) are made here; the gateway only converts
//! values. Runs are bounded by explicit [`Limits`].

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
use core::mem;
use core::ops::Range;

use crate::crc::{crc16, crc32};
use crate::cursor::{Cursor, Endian, OutOfBounds, load_uint, low_mask, sign_extend, store_uint};
use crate::format::DecodeError;
use crate::gateway::{
    FieldCall, FieldValue, Gateway, GatewayError, Mode, Scalar, TextSlot, TextView, WireSlot,
};
use crate::instr::{Instr, LenPrefix};
use crate::keys::KeyId;
use crate::opcode::Opcode;
use crate::program::Program;
use crate::scope::{Frame, ScopeError, ScopeStack};
use crate::trace::{ScopeKind, TraceMask, TraceOutcome, TraceSink};
use crate::transform::{Transform, TransformError};

/// Execution limits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of simultaneously open structs and arrays.
    pub max_scope_depth: usize,
    /// Maximum element count of a single array.
    pub max_array_len: u64,
    /// Instruction budget. Each executed instruction (including repeated array bodies) costs 1.
    pub fuel: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_scope_depth: 32,
            max_array_len: 1 << 24,
            fuel: 1 << 32,
        }
    }
}

/// Coarse fault classes with stable numeric codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A buffer access ran past the end.
    OutOfBounds,
    /// Malformed or disallowed instruction.
    InvalidOp,
    /// The data or program failed a consistency check.
    Validation,
    /// The gateway reported an error.
    Gateway,
    /// Too many open scopes.
    StackOverflow,
    /// A scope was closed with none open.
    StackUnderflow,
    /// Anything else (arithmetic overflow, fuel).
    Other,
}

impl ErrorKind {
    /// Stable numeric code; `0` is reserved for success.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::OutOfBounds => 1,
            Self::InvalidOp => 2,
            Self::Validation => 3,
            Self::Gateway => 4,
            Self::StackOverflow => 5,
            Self::StackUnderflow => 6,
            Self::Other => 7,
        }
    }
}

/// A runtime fault.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Fault {
    /// A buffer access ran past the end.
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),
    /// Unknown opcode or truncated operands.
    #[error("malformed instruction: {0}")]
    Decode(#[from] DecodeError),
    /// The instruction is not allowed here.
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// What was rejected.
        reason: &'static str,
    },
    /// A data or structure consistency check failed.
    #[error("validation failed: {reason}")]
    Validation {
        /// What failed.
        reason: &'static str,
    },
    /// The gateway reported an error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    /// Opening a scope would exceed [`Limits::max_scope_depth`].
    #[error("scope depth limit {max} exceeded")]
    ScopeOverflow {
        /// Configured maximum.
        max: usize,
    },
    /// A scope was closed with none open.
    #[error("no open scope to close")]
    ScopeUnderflow,
    /// An array count exceeds [`Limits::max_array_len`].
    #[error("array of {count} elements exceeds limit {max}")]
    ArrayTooLong {
        /// Requested count.
        count: u64,
        /// Configured maximum.
        max: u64,
    },
    /// A numeric transform failed.
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    /// [`Limits::fuel`] ran out.
    #[error("fuel limit exceeded")]
    FuelExceeded,
}

impl From<ScopeError> for Fault {
    fn from(e: ScopeError) -> Self {
        match e {
            ScopeError::Overflow { max } => Self::ScopeOverflow { max },
            ScopeError::Underflow => Self::ScopeUnderflow,
        }
    }
}

impl Fault {
    /// The coarse class of this fault.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds(_) => ErrorKind::OutOfBounds,
            Self::Decode(_) | Self::InvalidOperation { .. } => ErrorKind::InvalidOp,
            Self::Validation { .. }
            | Self::ArrayTooLong { .. }
            | Self::Transform(TransformError::DivideByZero) => ErrorKind::Validation,
            Self::Gateway(_) => ErrorKind::Gateway,
            Self::ScopeOverflow { .. } => ErrorKind::StackOverflow,
            Self::ScopeUnderflow => ErrorKind::StackUnderflow,
            Self::Transform(TransformError::Overflow) | Self::FuelExceeded => ErrorKind::Other,
        }
    }
}

/// A fault annotated with the instruction that raised it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub struct ExecError {
    /// Byte offset of the faulting instruction (bytecode length for end-of-program checks).
    pub ip: usize,
    /// Opcode of the faulting instruction, if it could be identified.
    pub opcode: Option<Opcode>,
    /// What went wrong.
    #[source]
    pub fault: Fault,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Some(op) => write!(f, "fault at ip={} ({}): {}", self.ip, op.mnemonic(), self.fault),
            None => write!(f, "fault at ip={}: {}", self.ip, self.fault),
        }
    }
}

impl ExecError {
    /// Shorthand for `self.fault.kind()`.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.fault.kind()
    }
}

/// Outcome of a successful run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Bytes touched, counting a trailing partial byte.
    pub bytes: usize,
    /// Instructions executed.
    pub instructions: u64,
}

/// Per-run execution state for [`Vm`].
///
/// Embedders may reuse an [`ExecutionContext`] across [`Vm::run_with_ctx`] calls to amortize the
/// scope stack and string staging allocations. After a failed run it still describes where
/// execution stopped.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    ip: usize,
    cursor: Cursor,
    endian: Endian,
    scopes: ScopeStack,
    pending: Option<Transform>,
    optional: bool,
    // Layout opcode each key was last bound with, for `arr_dynamic` count checks.
    bound: BTreeMap<KeyId, Opcode>,
    staging: Vec<u8>,
    fuel: u64,
    instructions: u64,
}

impl ExecutionContext {
    /// Creates an empty per-run execution context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor position reached by the last run.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Endianness in effect when the last run stopped.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Scopes left open when the last run stopped.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Offset of the next instruction when the last run stopped.
    #[must_use]
    pub fn ip(&self) -> usize {
        self.ip
    }

    fn reset(&mut self, limits: &Limits) {
        self.ip = 0;
        self.cursor = Cursor::new();
        self.endian = Endian::Little;
        self.scopes.reset(limits.max_scope_depth);
        self.pending = None;
        self.optional = false;
        self.bound.clear();
        self.staging.clear();
        self.fuel = limits.fuel;
        self.instructions = 0;
    }
}

/// The layout interpreter, bound to one host gateway.
pub struct Vm<G: Gateway> {
    gateway: G,
    limits: Limits,
}

impl<G: Gateway> fmt::Debug for Vm<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl<G: Gateway> Vm<G> {
    /// Creates a new VM with `gateway` and `limits`.
    #[must_use]
    pub fn new(gateway: G, limits: Limits) -> Self {
        Self { gateway, limits }
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The host gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The host gateway, mutably.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Consumes the VM, returning the gateway.
    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Runs `program` over `buf` in `mode`.
    ///
    /// Encode writes host values into `buf`; decode reads them out. On failure a decode buffer's
    /// contents are unspecified and an encode buffer holds a possibly-partial prefix.
    ///
    /// Tracing is controlled by `trace_mask`; pass `None` for `trace` to disable tracing.
    pub fn run(
        &mut self,
        program: &Program,
        buf: &mut [u8],
        mode: Mode,
        trace_mask: TraceMask,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, ExecError> {
        let mut ctx = ExecutionContext::new();
        self.run_with_ctx(&mut ctx, program, buf, mode, trace_mask, trace)
    }

    /// Runs `program` using an explicit per-run [`ExecutionContext`].
    pub fn run_with_ctx(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &Program,
        buf: &mut [u8],
        mode: Mode,
        trace_mask: TraceMask,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, ExecError> {
        if trace_mask.contains(TraceMask::RUN)
            && let Some(t) = trace.as_mut()
        {
            let t: &mut dyn TraceSink = &mut **t;
            t.run_start(program, mode, buf.len());
        }

        let result = self.run_body(ctx, program, buf, mode, trace_mask, &mut trace);

        if let Err(e) = &result {
            tracing::debug!(ip = e.ip, code = e.kind().code(), "layout run failed: {e}");
        }

        if trace_mask.contains(TraceMask::RUN)
            && let Some(t) = trace.as_mut()
        {
            let outcome = match &result {
                Ok(summary) => TraceOutcome::Ok(summary),
                Err(e) => TraceOutcome::Fault(e),
            };
            let t: &mut dyn TraceSink = &mut **t;
            t.run_end(program, outcome);
        }

        result
    }

    fn run_body(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &Program,
        buf: &mut [u8],
        mode: Mode,
        trace_mask: TraceMask,
        trace: &mut Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, ExecError> {
        ctx.reset(&self.limits);
        let code = program.bytecode();
        let mut m = Machine {
            io: Io {
                gateway: &mut self.gateway,
                program,
                trace_mask,
                trace,
            },
            ctx,
            buf,
            mode,
            limits: &self.limits,
        };

        loop {
            let ip = m.ctx.ip;
            if ip >= code.len() {
                break;
            }
            if m.ctx.fuel == 0 {
                return Err(ExecError {
                    ip,
                    opcode: Opcode::from_byte(code[ip]),
                    fault: Fault::FuelExceeded,
                });
            }
            m.ctx.fuel -= 1;

            let (instr, next) = Instr::decode_at(code, ip).map_err(|e| ExecError {
                ip,
                opcode: Opcode::from_byte(code[ip]),
                fault: e.into(),
            })?;
            let opcode = instr.opcode();
            m.exec(code, ip, next, instr).map_err(|fault| ExecError {
                ip,
                opcode: Some(opcode),
                fault,
            })?;
            m.ctx.instructions += 1;

            if trace_mask.contains(TraceMask::INSTR)
                && let Some(t) = m.io.trace.as_mut()
            {
                let t: &mut dyn TraceSink = &mut **t;
                t.instr(program, ip, m.ctx.ip, opcode, m.ctx.cursor);
            }
        }

        if !m.ctx.scopes.is_empty() {
            return Err(ExecError {
                ip: code.len(),
                opcode: None,
                fault: Fault::Validation {
                    reason: "program ended with open scopes",
                },
            });
        }
        Ok(RunSummary {
            bytes: m.ctx.cursor.consumed(),
            instructions: m.ctx.instructions,
        })
    }
}

/// Runs `program` once with default [`Limits`] and no tracing.
pub fn execute<G: Gateway>(
    program: &Program,
    buf: &mut [u8],
    mode: Mode,
    gateway: G,
) -> Result<RunSummary, ExecError> {
    Vm::new(gateway, Limits::default()).run(program, buf, mode, TraceMask::NONE, None)
}

/// Gateway and trace plumbing, split from the buffer so views into the buffer can be handed out
/// while it is borrowed.
struct Io<'r, 's, G> {
    gateway: &'r mut G,
    program: &'r Program,
    trace_mask: TraceMask,
    trace: &'r mut Option<&'s mut dyn TraceSink>,
}

impl<G: Gateway> Io<'_, '_, G> {
    fn scope_enter(&mut self, kind: ScopeKind, depth: usize, ip: usize) {
        if self.trace_mask.contains(kind.mask())
            && let Some(t) = self.trace.as_mut()
        {
            let t: &mut dyn TraceSink = &mut **t;
            t.scope_enter(self.program, kind, depth, ip);
        }
    }

    fn scope_exit(&mut self, kind: ScopeKind, depth: usize, ip: usize) {
        if self.trace_mask.contains(kind.mask())
            && let Some(t) = self.trace.as_mut()
        {
            let t: &mut dyn TraceSink = &mut **t;
            t.scope_exit(self.program, kind, depth, ip);
        }
    }

    fn field(
        &mut self,
        call: FieldCall,
        depth: usize,
        ip: usize,
        value: FieldValue<'_>,
    ) -> Result<(), GatewayError> {
        let kind = ScopeKind::Gateway {
            key: call.key,
            opcode: call.opcode,
        };
        self.scope_enter(kind, depth, ip);
        let r = self.gateway.field(&call, value);
        self.scope_exit(kind, depth, ip);
        r
    }
}

struct Machine<'r, 's, G> {
    io: Io<'r, 's, G>,
    ctx: &'r mut ExecutionContext,
    buf: &'r mut [u8],
    mode: Mode,
    limits: &'r Limits,
}

impl<G: Gateway> Machine<'_, '_, G> {
    fn call(&self, key: KeyId, opcode: Opcode) -> FieldCall {
        FieldCall {
            mode: self.mode,
            endian: self.ctx.endian,
            key,
            opcode,
        }
    }

    fn depth(&self) -> usize {
        self.ctx.scopes.depth()
    }

    fn encoding(&self) -> bool {
        self.mode == Mode::Encode
    }

    /// Notifies the gateway with a value that does not borrow the buffer.
    fn notify(
        &mut self,
        ip: usize,
        key: KeyId,
        opcode: Opcode,
        value: FieldValue<'_>,
    ) -> Result<(), Fault> {
        let call = self.call(key, opcode);
        let depth = self.depth();
        self.io.field(call, depth, ip, value)?;
        Ok(())
    }

    /// Maps a gateway result to "continue with the field" (`true`) or "skip it" (`false`).
    fn proceed(&self, r: Result<(), GatewayError>, optional: bool) -> Result<bool, Fault> {
        match r {
            Ok(()) => Ok(true),
            Err(GatewayError::Missing) if optional && self.encoding() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves a bounds check, reporting an optional field that does not fit as absent.
    fn fit<T>(
        &mut self,
        checked: Result<T, OutOfBounds>,
        optional: bool,
        ip: usize,
        key: KeyId,
        opcode: Opcode,
    ) -> Result<Option<T>, Fault> {
        match checked {
            Ok(v) => Ok(Some(v)),
            Err(_) if optional => {
                self.notify(ip, key, opcode, FieldValue::Absent)?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exec(&mut self, code: &[u8], ip: usize, next: usize, instr: Instr) -> Result<(), Fault> {
        let opcode = instr.opcode();
        if opcode.aligns() {
            self.ctx.cursor.align();
        }
        self.ctx.ip = next;
        let optional = if opcode.is_field_io() {
            mem::take(&mut self.ctx.optional)
        } else {
            false
        };

        match instr {
            Instr::Nop | Instr::MetaVersion { .. } | Instr::MetaName { .. } => {}
            Instr::EndianLe => self.ctx.endian = Endian::Little,
            Instr::EndianBe => self.ctx.endian = Endian::Big,
            Instr::EnterStruct { key } => {
                self.ctx.scopes.push(Frame::Struct { key })?;
                self.io
                    .scope_enter(ScopeKind::Struct { key }, self.ctx.scopes.depth(), ip);
                self.notify(ip, key, opcode, FieldValue::None)?;
            }
            Instr::ExitStruct => {
                let key = match self.ctx.scopes.top() {
                    // Exiting the outermost scope ends the run.
                    None => {
                        self.ctx.ip = code.len();
                        return Ok(());
                    }
                    Some(Frame::Array { .. }) => {
                        return Err(Fault::Validation {
                            reason: "exit_struct while an array is open",
                        });
                    }
                    Some(frame) => frame.key(),
                };
                let depth = self.depth();
                self.ctx.scopes.pop()?;
                self.io.scope_exit(ScopeKind::Struct { key }, depth, ip);
                self.notify(ip, key, opcode, FieldValue::None)?;
            }
            Instr::CtxQuery { key } => {
                let mut s = Scalar::U64(0);
                self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
            }
            Instr::Prim { op, key } => {
                let pending = self.ctx.pending.take();
                self.primitive(ip, op, key, pending, optional)?;
            }
            Instr::BitU { key, bits } => self.bits(ip, opcode, key, bits, optional)?,
            Instr::BitI { key, bits } => self.bits(ip, opcode, key, bits, optional)?,
            Instr::BitBool { key } => self.bits(ip, opcode, key, 1, optional)?,
            Instr::AlignPad { bits } => {
                self.ctx
                    .cursor
                    .skip_bits(self.buf.len(), u64::from(bits))?;
            }
            Instr::AlignFill { fill } => {
                if self.encoding() {
                    self.ctx.cursor.fill_to_boundary(self.buf, fill != 0)?;
                } else {
                    self.ctx.cursor.align();
                }
            }
            Instr::StrNull { key, max_len } => {
                if self.encoding() {
                    self.encode_str_null(ip, key, max_len, optional)?;
                } else {
                    self.decode_str_null(ip, key, max_len, optional)?;
                }
            }
            Instr::StrPrefixed { key, prefix } => {
                if self.encoding() {
                    self.encode_str_prefixed(ip, opcode, key, prefix, optional)?;
                } else {
                    self.decode_str_prefixed(ip, opcode, key, prefix, optional)?;
                }
            }
            Instr::ArrFixed { key, count } => {
                let count = u64::from(count);
                self.check_count(count)?;
                let mut s = Scalar::U64(count);
                self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
                self.open_array(code, ip, next, opcode, key, Some(count))?;
            }
            Instr::ArrPrefixed { key, prefix } => {
                let count = self.array_prefix(ip, opcode, key, prefix)?;
                self.open_array(code, ip, next, opcode, key, Some(count))?;
            }
            Instr::ArrDynamic { key, count_key } => {
                if let Some(bound) = self.ctx.bound.get(&count_key)
                    && !bound.binds_scalar()
                {
                    return Err(Fault::InvalidOperation {
                        reason: "arr_dynamic count key is not a scalar field",
                    });
                }
                let mut s = Scalar::U64(0);
                self.notify(ip, count_key, Opcode::CtxQuery, FieldValue::Scalar(&mut s))?;
                let count = s.as_u64();
                self.check_count(count)?;
                let mut s = Scalar::U64(count);
                self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
                self.open_array(code, ip, next, opcode, key, Some(count))?;
            }
            Instr::ArrEof { key } => {
                if self.ctx.scopes.inside_array() {
                    return Err(Fault::InvalidOperation {
                        reason: "arr_eof nested inside another array",
                    });
                }
                let count = if self.encoding() {
                    let mut s = Scalar::U64(0);
                    self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
                    let count = s.as_u64();
                    self.check_count(count)?;
                    Some(count)
                } else {
                    self.notify(ip, key, opcode, FieldValue::None)?;
                    None
                };
                self.open_array(code, ip, next, opcode, key, count)?;
            }
            Instr::ArrEnd => self.array_end(ip)?,
            Instr::RawBytes { key, count } => {
                let n = count as usize;
                let span = self.ctx.cursor.span(self.buf.len(), n);
                let Some(range) = self.fit(span, optional, ip, key, opcode)? else {
                    return Ok(());
                };
                self.ctx.bound.insert(key, opcode);
                let call = self.call(key, opcode);
                let depth = self.depth();
                let slot = WireSlot::new(&mut self.buf[range], self.ctx.endian);
                let r = self.io.field(call, depth, ip, FieldValue::Wire(slot));
                if self.proceed(r, optional)? {
                    self.ctx.cursor.advance(n);
                }
            }
            Instr::ConstCheck { key, kind, value } => {
                self.const_check(ip, key, kind, value, optional)?;
            }
            Instr::ConstWrite { kind, value } => {
                let width = const_width(kind)?;
                if self.encoding() {
                    self.ctx
                        .cursor
                        .write_uint(self.buf, width, value, self.ctx.endian)?;
                } else {
                    self.ctx.cursor.span(self.buf.len(), width)?;
                    self.ctx.cursor.advance(width);
                }
            }
            Instr::Transform(t) => self.ctx.pending = Some(t),
            Instr::Crc16(p) => {
                let crc = crc16(&self.buf[..self.ctx.cursor.position()], &p);
                self.checksum(2, u64::from(crc))?;
            }
            Instr::Crc32(p) => {
                let crc = crc32(&self.buf[..self.ctx.cursor.position()], &p);
                self.checksum(4, u64::from(crc))?;
            }
            Instr::MarkOptional => self.ctx.optional = true,
        }
        Ok(())
    }

    fn primitive(
        &mut self,
        ip: usize,
        op: Opcode,
        key: KeyId,
        pending: Option<Transform>,
        optional: bool,
    ) -> Result<(), Fault> {
        let width = op.primitive_width().ok_or(Fault::InvalidOperation {
            reason: "not a primitive opcode",
        })?;
        let span = self.ctx.cursor.span(self.buf.len(), width);
        let Some(range) = self.fit(span, optional, ip, key, op)? else {
            return Ok(());
        };
        self.ctx.bound.insert(key, op);
        let proceed = match pending {
            None => {
                let call = self.call(key, op);
                let depth = self.depth();
                let slot = WireSlot::new(&mut self.buf[range], self.ctx.endian);
                let r = self.io.field(call, depth, ip, FieldValue::Wire(slot));
                self.proceed(r, optional)?
            }
            Some(t) => self.transformed(ip, op, key, t, range, optional)?,
        };
        if proceed {
            self.ctx.cursor.advance(width);
        }
        Ok(())
    }

    /// A primitive behind a pending transform: the gateway sees the engineering value.
    fn transformed(
        &mut self,
        ip: usize,
        op: Opcode,
        key: KeyId,
        t: Transform,
        range: Range<usize>,
        optional: bool,
    ) -> Result<bool, Fault> {
        let endian = self.ctx.endian;
        let host_op = if t.is_float() {
            Opcode::IoF64
        } else {
            Opcode::IoI64
        };
        if self.encoding() {
            let mut eng = if t.is_float() {
                Scalar::F64(0.0)
            } else {
                Scalar::I64(0)
            };
            let call = self.call(key, host_op);
            let depth = self.depth();
            let r = self.io.field(call, depth, ip, FieldValue::Scalar(&mut eng));
            if !self.proceed(r, optional)? {
                return Ok(false);
            }
            let raw = if t.is_float() {
                Scalar::F64(t.inverse_f64(eng.as_f64())?)
            } else {
                Scalar::I64(t.inverse_i64(eng.as_i64())?)
            };
            store_uint(&mut self.buf[range], to_wire(op, raw), endian);
        } else {
            let width = range.len();
            let raw = from_wire(op, load_uint(&self.buf[range], endian), width);
            let mut eng = if t.is_float() {
                Scalar::F64(t.forward_f64(raw.as_f64())?)
            } else {
                Scalar::I64(t.forward_i64(raw.as_i64())?)
            };
            self.notify(ip, key, host_op, FieldValue::Scalar(&mut eng))?;
        }
        Ok(true)
    }

    fn bits(
        &mut self,
        ip: usize,
        opcode: Opcode,
        key: KeyId,
        bits: u8,
        optional: bool,
    ) -> Result<(), Fault> {
        if !(1..=64).contains(&bits) {
            return Err(Fault::InvalidOperation {
                reason: "bit field width must be 1..=64",
            });
        }
        let mut ahead = self.ctx.cursor;
        let fits = ahead.skip_bits(self.buf.len(), u64::from(bits));
        if self.fit(fits, optional, ip, key, opcode)?.is_none() {
            return Ok(());
        }
        self.ctx.bound.insert(key, opcode);
        if self.encoding() {
            let mut s = match opcode {
                Opcode::IoBitBool => Scalar::Bool(false),
                Opcode::IoBitI => Scalar::I64(0),
                _ => Scalar::U64(0),
            };
            let call = self.call(key, opcode);
            let depth = self.depth();
            let r = self.io.field(call, depth, ip, FieldValue::Scalar(&mut s));
            if !self.proceed(r, optional)? {
                return Ok(());
            }
            let v = match opcode {
                Opcode::IoBitBool => u64::from(s.as_bool()),
                _ => s.as_u64() & low_mask(u32::from(bits)),
            };
            self.ctx.cursor.write_bits(self.buf, bits, v)?;
        } else {
            let v = self.ctx.cursor.read_bits(self.buf, bits)?;
            let mut s = match opcode {
                Opcode::IoBitBool => Scalar::Bool(v != 0),
                Opcode::IoBitI => Scalar::I64(sign_extend(v, u32::from(bits))),
                _ => Scalar::U64(v),
            };
            self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
        }
        Ok(())
    }

    fn decode_str_null(
        &mut self,
        ip: usize,
        key: KeyId,
        max_len: u16,
        optional: bool,
    ) -> Result<(), Fault> {
        let start = self.ctx.cursor.position();
        let rest = self.buf.get(start..).unwrap_or(&[]);
        let limit = usize::from(max_len) + 1;
        let window = &rest[..rest.len().min(limit)];
        let found = match window.iter().position(|&b| b == 0) {
            Some(n) => Ok(n),
            None if rest.len() < limit => Err(OutOfBounds {
                at: start,
                needed: (rest.len() as u64 + 1) * 8,
                available: rest.len() as u64 * 8,
            }),
            None => {
                return Err(Fault::Validation {
                    reason: "str_null terminator not found within max_len",
                });
            }
        };
        let Some(n) = self.fit(found, optional, ip, key, Opcode::StrNull)? else {
            return Ok(());
        };
        self.ctx.bound.insert(key, Opcode::StrNull);
        let call = self.call(key, Opcode::StrNull);
        let depth = self.depth();
        let view = TextView::new(&self.buf[start..start + n], 0);
        self.io.field(call, depth, ip, FieldValue::Text(view))?;
        self.ctx.cursor.advance(n + 1);
        Ok(())
    }

    fn encode_str_null(
        &mut self,
        ip: usize,
        key: KeyId,
        max_len: u16,
        optional: bool,
    ) -> Result<(), Fault> {
        self.ctx.bound.insert(key, Opcode::StrNull);
        let call = self.call(key, Opcode::StrNull);
        let depth = self.depth();
        let slot = TextSlot::new(&mut self.ctx.staging, u64::from(max_len));
        let r = self.io.field(call, depth, ip, FieldValue::TextSlot(slot));
        if !self.proceed(r, optional)? {
            return Ok(());
        }
        let staged = &self.ctx.staging;
        let body = staged
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(staged.len())
            .min(usize::from(max_len));
        let range = self.ctx.cursor.span(self.buf.len(), body + 1)?;
        let out = &mut self.buf[range];
        out[..body].copy_from_slice(&staged[..body]);
        out[body] = 0;
        self.ctx.cursor.advance(body + 1);
        Ok(())
    }

    fn decode_str_prefixed(
        &mut self,
        ip: usize,
        opcode: Opcode,
        key: KeyId,
        prefix: LenPrefix,
        optional: bool,
    ) -> Result<(), Fault> {
        let w = prefix.width();
        let endian = self.ctx.endian;
        let head = self.ctx.cursor.span(self.buf.len(), w);
        let Some(head) = self.fit(head, optional, ip, key, opcode)? else {
            return Ok(());
        };
        let n = load_uint(&self.buf[head], endian);
        let total = usize::try_from(n).unwrap_or(usize::MAX).saturating_add(w);
        let framed = self.ctx.cursor.span(self.buf.len(), total);
        let Some(range) = self.fit(framed, optional, ip, key, opcode)? else {
            return Ok(());
        };
        self.ctx.bound.insert(key, opcode);
        let call = self.call(key, opcode);
        let depth = self.depth();
        let view = TextView::new(&self.buf[range], w);
        self.io.field(call, depth, ip, FieldValue::Text(view))?;
        self.ctx.cursor.advance(total);
        Ok(())
    }

    fn encode_str_prefixed(
        &mut self,
        ip: usize,
        opcode: Opcode,
        key: KeyId,
        prefix: LenPrefix,
        optional: bool,
    ) -> Result<(), Fault> {
        self.ctx.bound.insert(key, opcode);
        let call = self.call(key, opcode);
        let depth = self.depth();
        let slot = TextSlot::new(&mut self.ctx.staging, prefix.max());
        let r = self.io.field(call, depth, ip, FieldValue::TextSlot(slot));
        if !self.proceed(r, optional)? {
            return Ok(());
        }
        let w = prefix.width();
        let staged = &self.ctx.staging;
        let body = staged
            .len()
            .min(usize::try_from(prefix.max()).unwrap_or(usize::MAX));
        let range = self.ctx.cursor.span(self.buf.len(), w + body)?;
        let out = &mut self.buf[range];
        store_uint(&mut out[..w], body as u64, self.ctx.endian);
        out[w..].copy_from_slice(&staged[..body]);
        self.ctx.cursor.advance(w + body);
        Ok(())
    }

    fn check_count(&self, count: u64) -> Result<(), Fault> {
        let max = self.limits.max_array_len;
        if count > max {
            return Err(Fault::ArrayTooLong { count, max });
        }
        Ok(())
    }

    /// Reads (decode) or writes (encode) a length-prefixed array's count and announces it.
    fn array_prefix(
        &mut self,
        ip: usize,
        opcode: Opcode,
        key: KeyId,
        prefix: LenPrefix,
    ) -> Result<u64, Fault> {
        let w = prefix.width();
        let endian = self.ctx.endian;
        let head = self.ctx.cursor.span(self.buf.len(), w)?;
        if self.encoding() {
            let mut s = Scalar::U64(0);
            self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
            let count = s.as_u64();
            if count > prefix.max() {
                return Err(Fault::Validation {
                    reason: "array count does not fit its length prefix",
                });
            }
            self.check_count(count)?;
            store_uint(&mut self.buf[head], count, endian);
            self.ctx.cursor.advance(w);
            Ok(count)
        } else {
            let count = load_uint(&self.buf[head], endian);
            self.check_count(count)?;
            self.ctx.cursor.advance(w);
            let mut s = Scalar::U64(count);
            self.notify(ip, key, opcode, FieldValue::Scalar(&mut s))?;
            Ok(count)
        }
    }

    /// Opens an array scope, or skips its body when there is nothing to repeat.
    ///
    /// `count` is `None` for a decode-side `arr_eof`, which repeats until the buffer is exhausted.
    fn open_array(
        &mut self,
        code: &[u8],
        ip: usize,
        body_ip: usize,
        opcode: Opcode,
        key: KeyId,
        count: Option<u64>,
    ) -> Result<(), Fault> {
        self.ctx.bound.insert(key, opcode);
        let empty = match count {
            Some(n) => n == 0,
            None => self.ctx.cursor.consumed() >= self.buf.len(),
        };
        if empty {
            self.ctx.ip = skip_body(code, body_ip)?;
            let depth = self.depth();
            self.io.scope_enter(ScopeKind::Array { key }, depth + 1, ip);
            self.io.scope_exit(ScopeKind::Array { key }, depth + 1, ip);
            return self.notify(ip, key, Opcode::ArrEnd, FieldValue::None);
        }
        self.ctx.scopes.push(Frame::Array {
            key,
            body_ip,
            remaining: count.unwrap_or(0),
            start_cursor: self.ctx.cursor.position(),
            until_end: count.is_none(),
        })?;
        self.io
            .scope_enter(ScopeKind::Array { key }, self.ctx.scopes.depth(), ip);
        Ok(())
    }

    fn array_end(&mut self, ip: usize) -> Result<(), Fault> {
        let pos = self.ctx.cursor.position();
        let len = self.buf.len();
        let depth = self.ctx.scopes.depth();
        let (key, again) = match self.ctx.scopes.top_mut() {
            None => return Err(Fault::ScopeUnderflow),
            Some(Frame::Struct { .. }) => {
                return Err(Fault::Validation {
                    reason: "arr_end while a struct is open",
                });
            }
            Some(Frame::Array {
                key,
                body_ip,
                remaining,
                start_cursor,
                until_end,
            }) => {
                let again = if *until_end {
                    if pos == *start_cursor {
                        return Err(Fault::Validation {
                            reason: "arr_eof element consumed no bytes",
                        });
                    }
                    pos < len
                } else {
                    *remaining = remaining.saturating_sub(1);
                    *remaining > 0
                };
                if again {
                    *start_cursor = pos;
                    self.ctx.ip = *body_ip;
                }
                (*key, again)
            }
        };
        if again {
            return Ok(());
        }
        self.ctx.scopes.pop()?;
        self.io.scope_exit(ScopeKind::Array { key }, depth, ip);
        self.notify(ip, key, Opcode::ArrEnd, FieldValue::None)
    }

    fn const_check(
        &mut self,
        ip: usize,
        key: KeyId,
        kind: u8,
        value: u64,
        optional: bool,
    ) -> Result<(), Fault> {
        let width = const_width(kind)?;
        let endian = self.ctx.endian;
        let span = self.ctx.cursor.span(self.buf.len(), width);
        let Some(range) = self.fit(span, optional, ip, key, Opcode::ConstCheck)? else {
            return Ok(());
        };
        self.ctx.bound.insert(key, Opcode::ConstCheck);
        if self.encoding() {
            store_uint(&mut self.buf[range], value, endian);
            self.ctx.cursor.advance(width);
            return Ok(());
        }
        let bits = (width * 8) as u32;
        let raw = load_uint(&self.buf[range], endian);
        if raw != value & low_mask(bits) {
            return Err(Fault::Validation {
                reason: "constant mismatch",
            });
        }
        let signed = Opcode::from_byte(kind).is_some_and(Opcode::is_signed_primitive);
        let mut s = if signed {
            Scalar::I64(sign_extend(raw, bits))
        } else {
            Scalar::U64(raw)
        };
        self.notify(ip, key, Opcode::ConstCheck, FieldValue::Scalar(&mut s))?;
        self.ctx.cursor.advance(width);
        Ok(())
    }

    fn checksum(&mut self, width: usize, crc: u64) -> Result<(), Fault> {
        let endian = self.ctx.endian;
        if self.encoding() {
            self.ctx.cursor.write_uint(self.buf, width, crc, endian)?;
        } else {
            let stored = self.ctx.cursor.read_uint(self.buf, width, endian)?;
            if stored != crc {
                return Err(Fault::Validation {
                    reason: "checksum mismatch",
                });
            }
        }
        Ok(())
    }
}

/// Width of an integer constant named by a primitive opcode byte.
fn const_width(kind: u8) -> Result<usize, Fault> {
    Opcode::from_byte(kind)
        .filter(|op| op.is_integer_primitive())
        .and_then(Opcode::primitive_width)
        .ok_or(Fault::InvalidOperation {
            reason: "constant kind must name an integer primitive",
        })
}

/// Offset just past the `arr_end` matching an array whose body starts at `from`.
fn skip_body(code: &[u8], from: usize) -> Result<usize, Fault> {
    let mut depth = 0_usize;
    let mut ip = from;
    while ip < code.len() {
        let (instr, next) = Instr::decode_at(code, ip)?;
        match instr.opcode() {
            op if op.is_array_start() => depth += 1,
            Opcode::ArrEnd if depth == 0 => return Ok(next),
            Opcode::ArrEnd => depth -= 1,
            _ => {}
        }
        ip = next;
    }
    Err(Fault::Validation {
        reason: "array without matching arr_end",
    })
}

/// Interprets raw wire bits as a scalar of the primitive's type.
fn from_wire(op: Opcode, raw: u64, width: usize) -> Scalar {
    match op {
        Opcode::IoF32 => Scalar::F64(f64::from(f32::from_bits(raw as u32))),
        Opcode::IoF64 => Scalar::F64(f64::from_bits(raw)),
        Opcode::IoBool => Scalar::Bool(raw != 0),
        op if op.is_signed_primitive() => Scalar::I64(sign_extend(raw, (width * 8) as u32)),
        _ => Scalar::U64(raw),
    }
}

/// Converts a scalar to the primitive's wire bits; integers narrow by truncation.
fn to_wire(op: Opcode, v: Scalar) -> u64 {
    match op {
        Opcode::IoF32 => u64::from((v.as_f64() as f32).to_bits()),
        Opcode::IoF64 => v.as_f64().to_bits(),
        Opcode::IoBool => u64::from(v.as_bool()),
        _ => v.as_u64(),
    }
}
