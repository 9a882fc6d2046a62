// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static checks for layout programs.
//!
//! The VM is fully bounds-checked and never needs a verified program, but verification rejects
//! the structural mistakes that would otherwise only surface mid-record: malformed operands,
//! unbalanced scopes, disallowed nesting and modifiers that apply to nothing.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::format::DecodeError;
use crate::instr::{Instr, InstrIter};
use crate::keys::KeyId;
use crate::opcode::Opcode;
use crate::program::Program;

#[cfg(doc)]
use crate::vm::Vm;

/// A program that passed [`verify_program_owned`].
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedProgram {
    program: Program,
    max_depth: usize,
}

impl VerifiedProgram {
    /// Returns the underlying program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Deepest static scope nesting in the program.
    ///
    /// A [`Vm`] whose scope limit is at least this value cannot overflow on this program.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Consumes `self` and returns the underlying program.
    #[must_use]
    pub fn into_program(self) -> Program {
        self.program
    }
}

/// A verification error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// An instruction failed to decode.
    #[error("decode error at ip={ip}: {source}")]
    Decode {
        /// Offset of the instruction.
        ip: usize,
        /// Underlying decode error.
        #[source]
        source: DecodeError,
    },
    /// A bit field width outside `1..=64`.
    #[error("bit width {bits} at ip={ip} is outside 1..=64")]
    BadBitWidth {
        /// Offset of the instruction.
        ip: usize,
        /// Declared width.
        bits: u8,
    },
    /// A constant kind that does not name an integer primitive.
    #[error("constant kind 0x{kind:02X} at ip={ip} is not an integer primitive")]
    BadConstKind {
        /// Offset of the instruction.
        ip: usize,
        /// Declared kind byte.
        kind: u8,
    },
    /// `arr_end` with no open scope.
    #[error("arr_end at ip={ip} with no open array")]
    UnbalancedScope {
        /// Offset of the closing instruction.
        ip: usize,
    },
    /// `exit_struct` closing an array, or `arr_end` closing a struct.
    #[error("scope closed at ip={ip} does not match the open scope")]
    MismatchedScope {
        /// Offset of the closing instruction.
        ip: usize,
    },
    /// Static nesting deeper than [`VerifyConfig::max_scope_depth`].
    #[error("nesting at ip={ip} exceeds depth {max}")]
    DepthExceeded {
        /// Offset of the opening instruction.
        ip: usize,
        /// Configured maximum.
        max: usize,
    },
    /// `arr_eof` inside another array.
    #[error("arr_eof at ip={ip} is nested inside an array")]
    NestedEofArray {
        /// Offset of the instruction.
        ip: usize,
    },
    /// `arr_dynamic` whose count key is bound to a string, raw blob or array.
    #[error("count key {key} at ip={ip} is not bound to a scalar field")]
    NonScalarCountKey {
        /// Offset of the instruction.
        ip: usize,
        /// The count key.
        key: KeyId,
    },
    /// `mark_optional` not followed by a field instruction.
    #[error("mark_optional at ip={ip} does not precede a field")]
    DanglingOptional {
        /// Offset of the modifier.
        ip: usize,
    },
    /// A transform not followed by a primitive field.
    #[error("transform at ip={ip} does not precede a primitive field")]
    DanglingTransform {
        /// Offset of the modifier.
        ip: usize,
    },
    /// The program ends with scopes open.
    #[error("{open} scope(s) left open at end of program")]
    UnclosedScope {
        /// Number of open scopes.
        open: usize,
    },
}

/// Verifier configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Maximum static scope nesting.
    pub max_scope_depth: usize,
    /// Reject programs that end with open scopes.
    pub require_closed_scopes: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            max_scope_depth: 32,
            require_closed_scopes: true,
        }
    }
}

/// Verifies `program`.
pub fn verify_program(program: &Program, cfg: &VerifyConfig) -> Result<(), VerifyError> {
    verify_bytecode(program.bytecode(), cfg).map(|_| ())
}

/// Verifies `program` and returns a [`VerifiedProgram`] wrapper on success.
pub fn verify_program_owned(
    program: Program,
    cfg: &VerifyConfig,
) -> Result<VerifiedProgram, VerifyError> {
    let max_depth = verify_bytecode(program.bytecode(), cfg)?;
    Ok(VerifiedProgram { program, max_depth })
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Open {
    Struct,
    Array,
}

/// Checks one instruction stream, returning the deepest nesting seen.
fn verify_bytecode(code: &[u8], cfg: &VerifyConfig) -> Result<usize, VerifyError> {
    let mut scopes: Vec<Open> = Vec::new();
    let mut max_depth = 0;
    let mut bound: BTreeMap<KeyId, Opcode> = BTreeMap::new();
    let mut pending_optional: Option<usize> = None;
    let mut pending_transform: Option<usize> = None;

    for item in InstrIter::new(code) {
        let (ip, instr) = item.map_err(|(ip, source)| VerifyError::Decode { ip, source })?;
        let op = instr.opcode();

        match instr {
            Instr::Transform(_) => {
                if let Some(ip) = pending_transform {
                    return Err(VerifyError::DanglingTransform { ip });
                }
                pending_transform = Some(ip);
                continue;
            }
            Instr::MarkOptional => {
                if let Some(ip) = pending_optional {
                    return Err(VerifyError::DanglingOptional { ip });
                }
                pending_optional = Some(ip);
                continue;
            }
            Instr::Prim { .. } => pending_transform = None,
            _ => {}
        }
        if let Some(ip) = pending_transform {
            return Err(VerifyError::DanglingTransform { ip });
        }
        if let Some(ip) = pending_optional.take()
            && !op.is_field_io()
        {
            return Err(VerifyError::DanglingOptional { ip });
        }

        match instr {
            Instr::BitU { bits, .. } | Instr::BitI { bits, .. } if !(1..=64).contains(&bits) => {
                return Err(VerifyError::BadBitWidth { ip, bits });
            }
            Instr::ConstCheck { kind, .. } | Instr::ConstWrite { kind, .. }
                if !Opcode::from_byte(kind).is_some_and(Opcode::is_integer_primitive) =>
            {
                return Err(VerifyError::BadConstKind { ip, kind });
            }
            Instr::ArrEof { .. } if scopes.contains(&Open::Array) => {
                return Err(VerifyError::NestedEofArray { ip });
            }
            Instr::ArrDynamic { count_key, .. } => {
                if let Some(b) = bound.get(&count_key)
                    && !b.binds_scalar()
                {
                    return Err(VerifyError::NonScalarCountKey { ip, key: count_key });
                }
            }
            _ => {}
        }

        if (op.is_field_io() || op.is_array_start())
            && let Some(key) = instr.key()
        {
            bound.insert(key, op);
        }

        match op {
            Opcode::EnterStruct => scopes.push(Open::Struct),
            op if op.is_array_start() => scopes.push(Open::Array),
            Opcode::ExitStruct | Opcode::ArrEnd => {
                let want = if op == Opcode::ExitStruct {
                    Open::Struct
                } else {
                    Open::Array
                };
                match scopes.pop() {
                    // The outermost `exit_struct` terminates the program; what follows is dead.
                    None if op == Opcode::ExitStruct => break,
                    None => return Err(VerifyError::UnbalancedScope { ip }),
                    Some(open) if open != want => {
                        return Err(VerifyError::MismatchedScope { ip });
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
        if scopes.len() > cfg.max_scope_depth {
            return Err(VerifyError::DepthExceeded {
                ip,
                max: cfg.max_scope_depth,
            });
        }
        max_depth = max_depth.max(scopes.len());
    }

    if let Some(ip) = pending_transform {
        return Err(VerifyError::DanglingTransform { ip });
    }
    if let Some(ip) = pending_optional {
        return Err(VerifyError::DanglingOptional { ip });
    }
    if cfg.require_closed_scopes && !scopes.is_empty() {
        return Err(VerifyError::UnclosedScope { open: scopes.len() });
    }
    Ok(max_depth)
}
