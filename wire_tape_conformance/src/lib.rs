// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for the `wire_tape` conformance suite.
//!
//! [`Tape`] is a gateway that treats a record as a flat, ordered list of [`Value`]s: encoding
//! pops one value per data-carrying field, decoding pushes one. Structural notifications
//! (struct entry/exit, array end) are logged but carry no value, and `ctx_query` is answered from
//! the most recent integer bound to the queried key.

use std::collections::{BTreeMap, VecDeque};

use wire_tape::gateway::{FieldCall, FieldValue, Gateway, GatewayError, Mode, Scalar, WireSlot};
use wire_tape::keys::KeyId;
use wire_tape::opcode::Opcode;
use wire_tape::program::Program;
use wire_tape::trace::TraceMask;
use wire_tape::vm::{ExecError, Limits, RunSummary, Vm};

/// One host-side field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Unsigned integer or unsigned bit field.
    Uint(u64),
    /// Signed integer, signed bit field, or integer-transformed value.
    Int(i64),
    /// Float, or scale-transformed value.
    Float(f64),
    /// Boolean byte or bit.
    Bool(bool),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// String body.
    Text(String),
    /// Element count of a prefixed or `arr_eof` array.
    Count(u64),
    /// An optional field that is not present.
    Absent,
}

/// A gateway call as seen by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Call {
    /// Field key.
    pub key: KeyId,
    /// Opcode reported for the call.
    pub opcode: Opcode,
}

/// A value-list gateway; see the crate docs.
#[derive(Clone, Debug, Default)]
pub struct Tape {
    input: VecDeque<Value>,
    output: Vec<Value>,
    calls: Vec<Call>,
    last: BTreeMap<KeyId, u64>,
}

impl Tape {
    /// A tape that feeds `values` to an encode run.
    pub fn encoder(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            input: values.into_iter().collect(),
            ..Self::default()
        }
    }

    /// An empty tape for a decode run.
    pub fn decoder() -> Self {
        Self::default()
    }

    /// Pre-binds `key` for `ctx_query`, as if an earlier field had produced `v`.
    #[must_use]
    pub fn with_context(mut self, key: KeyId, v: u64) -> Self {
        self.last.insert(key, v);
        self
    }

    /// Values produced by a decode run.
    pub fn values(&self) -> &[Value] {
        &self.output
    }

    /// Values an encode run did not consume.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Every gateway call, in order.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    fn next(&mut self) -> Result<Value, GatewayError> {
        match self.input.pop_front() {
            Some(Value::Absent) | None => Err(GatewayError::Missing),
            Some(v) => Ok(v),
        }
    }

    fn bind(&mut self, key: KeyId, v: u64) {
        self.last.insert(key, v);
    }

    fn encode(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        match value {
            FieldValue::None => Ok(()),
            FieldValue::Absent => {
                if self.input.front() == Some(&Value::Absent) {
                    self.input.pop_front();
                }
                Ok(())
            }
            FieldValue::Scalar(s) if call.opcode == Opcode::CtxQuery => {
                *s = Scalar::U64(self.query(call.key)?);
                Ok(())
            }
            // Fixed and dynamic array counts come from the program or the context.
            FieldValue::Scalar(_)
                if matches!(call.opcode, Opcode::ArrFixed | Opcode::ArrDynamic) =>
            {
                Ok(())
            }
            FieldValue::Scalar(s) => {
                *s = match (self.next()?, *s) {
                    (Value::Uint(v) | Value::Count(v), Scalar::U64(_)) => Scalar::U64(v),
                    (Value::Int(v), Scalar::I64(_)) => Scalar::I64(v),
                    (Value::Float(v), Scalar::F64(_)) => Scalar::F64(v),
                    (Value::Bool(v), Scalar::Bool(_)) => Scalar::Bool(v),
                    _ => return Err(GatewayError::TypeMismatch),
                };
                if let Scalar::U64(v) = *s {
                    self.bind(call.key, v);
                }
                Ok(())
            }
            FieldValue::Wire(mut w) => {
                let v = self.next()?;
                write_wire(&mut w, call.opcode, v)?;
                if call.opcode.is_integer_primitive() {
                    let raw = w.raw()?;
                    self.bind(call.key, raw);
                }
                Ok(())
            }
            FieldValue::TextSlot(mut t) => {
                match self.next()? {
                    Value::Text(s) => t.set_str(&s),
                    Value::Bytes(b) => t.set(&b),
                    _ => return Err(GatewayError::TypeMismatch),
                }
                Ok(())
            }
            FieldValue::Text(_) => Err(GatewayError::TypeMismatch),
        }
    }

    fn decode(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        let v = match value {
            FieldValue::None => return Ok(()),
            FieldValue::Absent => Value::Absent,
            FieldValue::Scalar(s) => match call.opcode {
                Opcode::CtxQuery => {
                    *s = Scalar::U64(self.query(call.key)?);
                    return Ok(());
                }
                Opcode::ArrFixed | Opcode::ArrDynamic | Opcode::ConstCheck => return Ok(()),
                op if op.is_array_start() => Value::Count(s.as_u64()),
                _ => match *s {
                    Scalar::U64(v) => {
                        self.bind(call.key, v);
                        Value::Uint(v)
                    }
                    Scalar::I64(v) => Value::Int(v),
                    Scalar::F64(v) => Value::Float(v),
                    Scalar::Bool(v) => Value::Bool(v),
                },
            },
            FieldValue::Wire(w) => {
                let v = read_wire(&w, call.opcode)?;
                if call.opcode.is_integer_primitive() {
                    self.bind(call.key, w.raw()?);
                }
                v
            }
            FieldValue::Text(t) => Value::Text(String::from_utf8_lossy(t.body()).into_owned()),
            FieldValue::TextSlot(_) => return Err(GatewayError::TypeMismatch),
        };
        self.output.push(v);
        Ok(())
    }

    fn query(&self, key: KeyId) -> Result<u64, GatewayError> {
        self.last
            .get(&key)
            .copied()
            .ok_or(GatewayError::UnknownKey { key })
    }
}

impl Gateway for Tape {
    fn field(&mut self, call: &FieldCall, value: FieldValue<'_>) -> Result<(), GatewayError> {
        self.calls.push(Call {
            key: call.key,
            opcode: call.opcode,
        });
        match call.mode {
            Mode::Encode => self.encode(call, value),
            Mode::Decode => self.decode(call, value),
        }
    }
}

fn write_wire(w: &mut WireSlot<'_>, opcode: Opcode, v: Value) -> Result<(), GatewayError> {
    match (opcode, v) {
        (Opcode::IoF32, Value::Float(f)) => w.set_f32(f as f32),
        (Opcode::IoF64, Value::Float(f)) => w.set_f64(f),
        (Opcode::IoBool, Value::Bool(b)) => w.set_bool(b),
        (Opcode::RawBytes, Value::Bytes(b)) => w.copy_from(&b),
        (_, Value::Uint(u)) => w.set_raw(u),
        (_, Value::Int(i)) => w.set_raw(i as u64),
        _ => Err(GatewayError::TypeMismatch),
    }
}

fn read_wire(w: &WireSlot<'_>, opcode: Opcode) -> Result<Value, GatewayError> {
    Ok(match opcode {
        Opcode::IoF32 => Value::Float(f64::from(w.f32()?)),
        Opcode::IoF64 => Value::Float(w.f64()?),
        Opcode::IoBool => Value::Bool(w.bool()?),
        Opcode::RawBytes => Value::Bytes(w.bytes().to_vec()),
        Opcode::IoI8 => Value::Int(i64::from(w.i8()?)),
        Opcode::IoI16 => Value::Int(i64::from(w.i16()?)),
        Opcode::IoI32 => Value::Int(i64::from(w.i32()?)),
        Opcode::IoI64 => Value::Int(w.i64()?),
        _ => Value::Uint(w.raw()?),
    })
}

/// Encodes `values` into `buf`, returning the run summary and the spent tape.
pub fn encode(
    program: &Program,
    values: impl IntoIterator<Item = Value>,
    buf: &mut [u8],
) -> Result<(RunSummary, Tape), ExecError> {
    let mut vm = Vm::new(Tape::encoder(values), Limits::default());
    let summary = vm.run(program, buf, Mode::Encode, TraceMask::NONE, None)?;
    Ok((summary, vm.into_gateway()))
}

/// Decodes `buf`, returning the values in field order.
pub fn decode(program: &Program, buf: &mut [u8]) -> Result<Vec<Value>, ExecError> {
    let mut vm = Vm::new(Tape::decoder(), Limits::default());
    vm.run(program, buf, Mode::Decode, TraceMask::NONE, None)?;
    Ok(vm.into_gateway().output)
}
