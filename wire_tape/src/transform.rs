// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Field-level numeric transforms.
//!
//! A transform instruction arms a [`Transform`] for the next primitive field only. The host
//! always deals in engineering values (`f64` for [`Transform::Scale`], `i64` otherwise); the
//! VM converts to and from the raw wire value around the primitive I/O step.
//!
//! Forward (decode) is `eng = f(raw)`; inverse (encode) is `raw = f⁻¹(eng)`, narrowed with
//! truncation toward zero. Inverting is lossy: `trans_mul 2` stores eng `11` as raw `5`, which
//! decodes to `10`.

/// A pending numeric transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Transform {
    /// `eng = raw * factor + offset`.
    Scale {
        /// Multiplier.
        factor: f64,
        /// Additive offset.
        offset: f64,
    },
    /// `eng = raw + v`.
    Add(i64),
    /// `eng = raw - v`.
    Sub(i64),
    /// `eng = raw * v`.
    Mul(i64),
    /// `eng = raw / v`.
    Div(i64),
}

/// A transform that cannot be applied to a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A division by a zero factor or divisor.
    #[error("transform divides by zero")]
    DivideByZero,
    /// The result does not fit in 64 bits.
    #[error("transform overflowed")]
    Overflow,
}

impl Transform {
    /// Returns `true` if the host sees an `f64` for this transform.
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Scale { .. })
    }

    /// Raw integer to engineering integer (decode direction).
    pub fn forward_i64(self, raw: i64) -> Result<i64, TransformError> {
        match self {
            Self::Add(v) => raw.checked_add(v).ok_or(TransformError::Overflow),
            Self::Sub(v) => raw.checked_sub(v).ok_or(TransformError::Overflow),
            Self::Mul(v) => raw.checked_mul(v).ok_or(TransformError::Overflow),
            Self::Div(0) => Err(TransformError::DivideByZero),
            Self::Div(v) => raw.checked_div(v).ok_or(TransformError::Overflow),
            Self::Scale { .. } => Ok(truncate_f64(self.forward_f64(raw as f64)?)),
        }
    }

    /// Engineering integer to raw integer (encode direction).
    pub fn inverse_i64(self, eng: i64) -> Result<i64, TransformError> {
        match self {
            Self::Add(v) => eng.checked_sub(v).ok_or(TransformError::Overflow),
            Self::Sub(v) => eng.checked_add(v).ok_or(TransformError::Overflow),
            Self::Mul(0) => Err(TransformError::DivideByZero),
            Self::Mul(v) => eng.checked_div(v).ok_or(TransformError::Overflow),
            Self::Div(v) => eng.checked_mul(v).ok_or(TransformError::Overflow),
            Self::Scale { .. } => Ok(truncate_f64(self.inverse_f64(eng as f64)?)),
        }
    }

    /// Raw value to engineering value as `f64` (decode direction).
    pub fn forward_f64(self, raw: f64) -> Result<f64, TransformError> {
        match self {
            Self::Scale { factor, offset } => Ok(raw * factor + offset),
            _ => Ok(self.forward_i64(truncate_f64(raw))? as f64),
        }
    }

    /// Engineering value to raw value as `f64` (encode direction).
    ///
    /// The result is not yet narrowed; callers truncate when the wire type is an integer.
    pub fn inverse_f64(self, eng: f64) -> Result<f64, TransformError> {
        match self {
            Self::Scale { factor, .. } if factor == 0.0 => Err(TransformError::DivideByZero),
            Self::Scale { factor, offset } => Ok((eng - offset) / factor),
            _ => Ok(self.inverse_i64(truncate_f64(eng))? as f64),
        }
    }
}

/// Truncates toward zero, saturating at the `i64` range (NaN maps to `0`).
#[must_use]
pub fn truncate_f64(v: f64) -> i64 {
    // `as` saturates and truncates toward zero.
    v as i64
}
