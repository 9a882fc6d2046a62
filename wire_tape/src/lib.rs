// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `wire_tape`: a schema-driven binary codec.
//!
//! A record layout is compiled ahead of time into a compact bytecode [`program::Program`]
//! (optionally packaged as a `CNDIL` image with a key-name table). The [`vm::Vm`] walks that
//! bytecode over a caller-supplied buffer in encode or decode mode, making every layout decision
//! itself and exchanging field values with the host through the [`gateway::Gateway`] callback.
//!
//! ## Example
//!
//! ```no_run
//! use wire_tape::asm::ProgramBuilder;
//! use wire_tape::gateway::{FieldValue, GatewayError, Mode, from_fn};
//! use wire_tape::vm::execute;
//!
//! let mut pb = ProgramBuilder::new();
//! let id = pb.key("id");
//! let flags = pb.key("flags");
//! pb.asm().endian_be().io_u16(id).bit_u(flags, 4).align_fill(false);
//! let program = pb.build_verified()?;
//!
//! let mut buf = [0_u8; 3];
//! execute(
//!     program.program(),
//!     &mut buf,
//!     Mode::Encode,
//!     from_fn(|call, value| match value {
//!         FieldValue::Wire(mut w) if call.key == id => w.set_u16(0x1234),
//!         FieldValue::Scalar(s) => {
//!             *s = wire_tape::gateway::Scalar::U64(0b1010);
//!             Ok(())
//!         }
//!         _ => Err(GatewayError::TypeMismatch),
//!     }),
//! )
//! .unwrap();
//! assert_eq!(buf, [0x12, 0x34, 0b0000_1010]);
//! # Ok::<(), wire_tape::asm::BuildError>(())
//! ```

#![no_std]

extern crate alloc;

pub mod asm;
pub mod crc;
pub mod cursor;
pub mod disasm;
pub mod format;
pub mod gateway;
pub mod instr;
pub mod keys;
pub mod opcode;
pub mod program;
pub mod scope;
pub mod trace;
pub mod transform;
pub mod verifier;
pub mod vm;
