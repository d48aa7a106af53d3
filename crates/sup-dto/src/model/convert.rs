//! Scalar conversion, comparison and stepping.
//!
//! Every conversion goes through a small intermediate representation: the
//! source scalar is widened to a boolean, a signed or unsigned 64-bit integer,
//! or a 64-bit float, and then checked against the range of the target kind.
//! A failed check never produces a partially converted value.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::model::scalar::{Scalar, ScalarType};
use crate::model::value::AnyValue;
use crate::model::TypeKind;

/// Outcome of comparing two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Less,
    Equivalent,
    Greater,
    /// The values have no defined order (non-numeric or mixed signedness).
    Unordered,
}

impl From<Ordering> for CompareResult {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => CompareResult::Less,
            Ordering::Equal => CompareResult::Equivalent,
            Ordering::Greater => CompareResult::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

fn number_of(scalar: &Scalar) -> Option<Number> {
    let number = match *scalar {
        Scalar::Bool(b) => Number::Bool(b),
        Scalar::Char8(c) => Number::Unsigned(u64::from(c)),
        Scalar::Int8(v) => Number::Signed(i64::from(v)),
        Scalar::UInt8(v) => Number::Unsigned(u64::from(v)),
        Scalar::Int16(v) => Number::Signed(i64::from(v)),
        Scalar::UInt16(v) => Number::Unsigned(u64::from(v)),
        Scalar::Int32(v) => Number::Signed(i64::from(v)),
        Scalar::UInt32(v) => Number::Unsigned(u64::from(v)),
        Scalar::Int64(v) => Number::Signed(v),
        Scalar::UInt64(v) => Number::Unsigned(v),
        Scalar::Float32(v) => Number::Float(f64::from(v)),
        Scalar::Float64(v) => Number::Float(v),
        Scalar::String(_) => return None,
    };
    Some(number)
}

/// Converts to a signed integer of `bits` width.
fn to_signed(number: Number, bits: u32) -> Option<i64> {
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << (bits - 1)) - 1;
    match number {
        Number::Bool(b) => Some(i64::from(b)),
        Number::Signed(v) => (i128::from(v) >= min && i128::from(v) <= max).then_some(v),
        Number::Unsigned(v) => (i128::from(v) <= max).then_some(v as i64),
        Number::Float(f) => {
            if f.is_nan() {
                return None;
            }
            // Both bounds are powers of two and therefore exact in f64.
            let bound = 2f64.powi(bits as i32 - 1);
            let t = f.trunc();
            (t >= -bound && t < bound).then_some(t as i64)
        }
    }
}

/// Converts to an unsigned integer of `bits` width.
fn to_unsigned(number: Number, bits: u32) -> Option<u64> {
    let max = (1u128 << bits) - 1;
    match number {
        Number::Bool(b) => Some(u64::from(b)),
        Number::Signed(v) => (v >= 0 && (v as u128) <= max).then_some(v as u64),
        Number::Unsigned(v) => (u128::from(v) <= max).then_some(v),
        Number::Float(f) => {
            if f.is_nan() {
                return None;
            }
            let bound = 2f64.powi(bits as i32);
            let t = f.trunc();
            (t >= 0.0 && t < bound).then_some(t as u64)
        }
    }
}

fn to_f64(number: Number) -> f64 {
    match number {
        Number::Bool(b) => f64::from(u8::from(b)),
        Number::Signed(v) => v as f64,
        Number::Unsigned(v) => v as f64,
        Number::Float(f) => f,
    }
}

/// Rounds once, straight to `f32`.
fn as_f32(number: Number) -> f32 {
    match number {
        Number::Bool(b) => f32::from(u8::from(b)),
        Number::Signed(v) => v as f32,
        Number::Unsigned(v) => v as f32,
        Number::Float(f) => f as f32,
    }
}

fn to_f32(number: Number) -> Option<f32> {
    match number {
        Number::Float(f) => {
            let narrowed = f as f32;
            narrowed.is_finite().then_some(narrowed)
        }
        other => Some(as_f32(other)),
    }
}

fn truthy(number: Number) -> bool {
    match number {
        Number::Bool(b) => b,
        Number::Signed(v) => v != 0,
        Number::Unsigned(v) => v != 0,
        Number::Float(f) => f != 0.0,
    }
}

/// Converts scalar data to the given kind.
///
/// Same-kind conversion is the identity. Strings convert only to strings.
/// Integer targets reject out-of-range and NaN sources; floats are truncated
/// toward zero first. Narrowing to `float32` rejects NaN, infinities and
/// magnitudes that round beyond `f32::MAX`; widening to `float64` always
/// succeeds.
pub fn convert_scalar(src: &Scalar, to: TypeKind) -> Result<Scalar> {
    let from = src.kind();
    if from == to {
        return Ok(src.clone());
    }
    let fail = || Error::ScalarConversion { from, to };
    let number = match number_of(src) {
        Some(number) if to.is_scalar() && to != TypeKind::String => number,
        _ => return Err(fail()),
    };

    let converted = match to {
        TypeKind::Bool => Some(Scalar::Bool(truthy(number))),
        TypeKind::Char8 => to_unsigned(number, 8).map(|v| Scalar::Char8(v as u8)),
        TypeKind::Int8 => to_signed(number, 8).map(|v| Scalar::Int8(v as i8)),
        TypeKind::UInt8 => to_unsigned(number, 8).map(|v| Scalar::UInt8(v as u8)),
        TypeKind::Int16 => to_signed(number, 16).map(|v| Scalar::Int16(v as i16)),
        TypeKind::UInt16 => to_unsigned(number, 16).map(|v| Scalar::UInt16(v as u16)),
        TypeKind::Int32 => to_signed(number, 32).map(|v| Scalar::Int32(v as i32)),
        TypeKind::UInt32 => to_unsigned(number, 32).map(|v| Scalar::UInt32(v as u32)),
        TypeKind::Int64 => to_signed(number, 64).map(Scalar::Int64),
        TypeKind::UInt64 => to_unsigned(number, 64).map(Scalar::UInt64),
        TypeKind::Float32 => to_f32(number).map(Scalar::Float32),
        TypeKind::Float64 => Some(Scalar::Float64(to_f64(number))),
        TypeKind::Empty | TypeKind::String | TypeKind::Struct | TypeKind::Array => None,
    };
    converted.ok_or_else(fail)
}

/// Converts one native scalar to another with the same checks as
/// [`convert_scalar`].
pub fn convert<To: ScalarType, From: ScalarType>(value: From) -> Result<To> {
    let converted = convert_scalar(&value.into_scalar(), To::KIND)?;
    To::from_scalar(converted).ok_or(Error::ScalarConversion {
        from: From::KIND,
        to: To::KIND,
    })
}

/// Extracts a native value from a scalar `AnyValue`, converting as needed.
///
/// Returns false and leaves `dest` untouched when the value is not a scalar
/// or the conversion fails.
pub fn try_convert<T: ScalarType>(dest: &mut T, value: &AnyValue) -> bool {
    match value.as_scalar::<T>() {
        Ok(native) => {
            *dest = native;
            true
        }
        Err(_) => false,
    }
}

/// Compares two scalars.
///
/// Floats compare with any numeric kind (as `f64` when either side is
/// `float64`, else as `f32`). Integers compare only with integers of the same
/// signedness. Everything else is unordered.
pub fn compare_scalars(lhs: &Scalar, rhs: &Scalar) -> CompareResult {
    let (lk, rk) = (lhs.kind(), rhs.kind());
    if !lk.is_numeric() || !rk.is_numeric() {
        return CompareResult::Unordered;
    }
    let (Some(l), Some(r)) = (number_of(lhs), number_of(rhs)) else {
        return CompareResult::Unordered;
    };

    if lk.is_float() || rk.is_float() {
        let ordering = if lk == TypeKind::Float64 || rk == TypeKind::Float64 {
            to_f64(l).partial_cmp(&to_f64(r))
        } else {
            as_f32(l).partial_cmp(&as_f32(r))
        };
        return ordering.map_or(CompareResult::Unordered, CompareResult::from);
    }

    match (l, r) {
        (Number::Signed(a), Number::Signed(b)) => a.cmp(&b).into(),
        (Number::Unsigned(a), Number::Unsigned(b)) => a.cmp(&b).into(),
        _ => CompareResult::Unordered,
    }
}

/// Compares two values. Non-scalar values are always unordered.
pub fn compare(lhs: &AnyValue, rhs: &AnyValue) -> CompareResult {
    match (lhs.scalar(), rhs.scalar()) {
        (Some(l), Some(r)) => compare_scalars(l, r),
        _ => CompareResult::Unordered,
    }
}

macro_rules! step_scalar {
    ($scalar:expr, $int_op:ident, $float_delta:expr) => {
        match $scalar {
            Scalar::Int8(v) => *v = v.$int_op(1),
            Scalar::UInt8(v) => *v = v.$int_op(1),
            Scalar::Int16(v) => *v = v.$int_op(1),
            Scalar::UInt16(v) => *v = v.$int_op(1),
            Scalar::Int32(v) => *v = v.$int_op(1),
            Scalar::UInt32(v) => *v = v.$int_op(1),
            Scalar::Int64(v) => *v = v.$int_op(1),
            Scalar::UInt64(v) => *v = v.$int_op(1),
            Scalar::Float32(v) => *v += $float_delta as f32,
            Scalar::Float64(v) => *v += $float_delta,
            Scalar::Bool(_) | Scalar::Char8(_) | Scalar::String(_) => return false,
        }
    };
}

/// Adds one to a numeric scalar in place (integers wrap).
///
/// Returns false and leaves the value unchanged for any other kind.
pub fn increment(value: &mut AnyValue) -> bool {
    let Some(scalar) = value.scalar_mut() else {
        return false;
    };
    step_scalar!(scalar, wrapping_add, 1.0f64);
    true
}

/// Subtracts one from a numeric scalar in place (integers wrap).
pub fn decrement(value: &mut AnyValue) -> bool {
    let Some(scalar) = value.scalar_mut() else {
        return false;
    };
    step_scalar!(scalar, wrapping_sub, -1.0f64);
    true
}
