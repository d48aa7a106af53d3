//! Scalar data and the native Rust types that map onto scalar kinds.

use crate::model::TypeKind;

/// An 8-bit character code unit (the `char8` kind).
///
/// Kept distinct from `u8` so that `char8` and `uint8` values stay different
/// kinds when built from native Rust values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Char8(pub u8);

/// Native data of a scalar node.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Char8(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Scalar {
    /// Returns the zero value for a scalar kind, or `None` for non-scalar kinds.
    pub fn default_for(kind: TypeKind) -> Option<Scalar> {
        let scalar = match kind {
            TypeKind::Bool => Scalar::Bool(false),
            TypeKind::Char8 => Scalar::Char8(0),
            TypeKind::Int8 => Scalar::Int8(0),
            TypeKind::UInt8 => Scalar::UInt8(0),
            TypeKind::Int16 => Scalar::Int16(0),
            TypeKind::UInt16 => Scalar::UInt16(0),
            TypeKind::Int32 => Scalar::Int32(0),
            TypeKind::UInt32 => Scalar::UInt32(0),
            TypeKind::Int64 => Scalar::Int64(0),
            TypeKind::UInt64 => Scalar::UInt64(0),
            TypeKind::Float32 => Scalar::Float32(0.0),
            TypeKind::Float64 => Scalar::Float64(0.0),
            TypeKind::String => Scalar::String(String::new()),
            TypeKind::Empty | TypeKind::Struct | TypeKind::Array => return None,
        };
        Some(scalar)
    }

    /// Returns the kind of this scalar.
    pub fn kind(&self) -> TypeKind {
        match self {
            Scalar::Bool(_) => TypeKind::Bool,
            Scalar::Char8(_) => TypeKind::Char8,
            Scalar::Int8(_) => TypeKind::Int8,
            Scalar::UInt8(_) => TypeKind::UInt8,
            Scalar::Int16(_) => TypeKind::Int16,
            Scalar::UInt16(_) => TypeKind::UInt16,
            Scalar::Int32(_) => TypeKind::Int32,
            Scalar::UInt32(_) => TypeKind::UInt32,
            Scalar::Int64(_) => TypeKind::Int64,
            Scalar::UInt64(_) => TypeKind::UInt64,
            Scalar::Float32(_) => TypeKind::Float32,
            Scalar::Float64(_) => TypeKind::Float64,
            Scalar::String(_) => TypeKind::String,
        }
    }

    /// Returns the string payload, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A native Rust type that corresponds to exactly one scalar kind.
pub trait ScalarType: Sized {
    /// The scalar kind this native type maps to.
    const KIND: TypeKind;

    /// Wraps the native value as scalar data.
    fn into_scalar(self) -> Scalar;

    /// Extracts the native value if the scalar has exactly this kind.
    fn from_scalar(scalar: Scalar) -> Option<Self>;
}

macro_rules! impl_scalar_type {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl ScalarType for $native {
                const KIND: TypeKind = TypeKind::$variant;

                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                fn from_scalar(scalar: Scalar) -> Option<Self> {
                    match scalar {
                        Scalar::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar_type! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
}

impl ScalarType for Char8 {
    const KIND: TypeKind = TypeKind::Char8;

    fn into_scalar(self) -> Scalar {
        Scalar::Char8(self.0)
    }

    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::Char8(c) => Some(Char8(c)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::kind::SCALAR_KINDS;

    #[test]
    fn test_default_for_matches_kind() {
        for kind in SCALAR_KINDS {
            let scalar = Scalar::default_for(kind).unwrap();
            assert_eq!(scalar.kind(), kind);
        }
        assert!(Scalar::default_for(TypeKind::Empty).is_none());
        assert!(Scalar::default_for(TypeKind::Struct).is_none());
        assert!(Scalar::default_for(TypeKind::Array).is_none());
    }

    #[test]
    fn test_native_extraction_is_exact() {
        assert_eq!(u8::from_scalar(Scalar::UInt8(7)), Some(7));
        assert_eq!(u8::from_scalar(Scalar::Char8(7)), None);
        assert_eq!(Char8::from_scalar(Scalar::Char8(b'a')), Some(Char8(b'a')));
        assert_eq!(
            String::from_scalar("x".to_string().into_scalar()),
            Some("x".to_string())
        );
    }
}
