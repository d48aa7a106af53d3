//! Type kinds and their canonical names.

use std::fmt;

/// The closed set of node kinds (16 variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    Empty,
    Bool,
    Char8,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Struct,
    Array,
}

/// The 13 scalar kinds, in token order.
pub const SCALAR_KINDS: [TypeKind; 13] = [
    TypeKind::Bool,
    TypeKind::Char8,
    TypeKind::Int8,
    TypeKind::UInt8,
    TypeKind::Int16,
    TypeKind::UInt16,
    TypeKind::Int32,
    TypeKind::UInt32,
    TypeKind::Int64,
    TypeKind::UInt64,
    TypeKind::Float32,
    TypeKind::Float64,
    TypeKind::String,
];

impl TypeKind {
    /// Returns the canonical name used in JSON type definitions.
    ///
    /// Struct and array kinds have no leaf name; their JSON form carries the
    /// user-defined type name instead.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Empty => "empty",
            TypeKind::Bool => "bool",
            TypeKind::Char8 => "char8",
            TypeKind::Int8 => "int8",
            TypeKind::UInt8 => "uint8",
            TypeKind::Int16 => "int16",
            TypeKind::UInt16 => "uint16",
            TypeKind::Int32 => "int32",
            TypeKind::UInt32 => "uint32",
            TypeKind::Int64 => "int64",
            TypeKind::UInt64 => "uint64",
            TypeKind::Float32 => "float32",
            TypeKind::Float64 => "float64",
            TypeKind::String => "string",
            TypeKind::Struct => "struct",
            TypeKind::Array => "array",
        }
    }

    /// Looks up a leaf kind (empty or scalar) by its canonical name.
    pub fn from_leaf_name(name: &str) -> Option<TypeKind> {
        match name {
            "empty" => Some(TypeKind::Empty),
            "bool" => Some(TypeKind::Bool),
            "char8" => Some(TypeKind::Char8),
            "int8" => Some(TypeKind::Int8),
            "uint8" => Some(TypeKind::UInt8),
            "int16" => Some(TypeKind::Int16),
            "uint16" => Some(TypeKind::UInt16),
            "int32" => Some(TypeKind::Int32),
            "uint32" => Some(TypeKind::UInt32),
            "int64" => Some(TypeKind::Int64),
            "uint64" => Some(TypeKind::UInt64),
            "float32" => Some(TypeKind::Float32),
            "float64" => Some(TypeKind::Float64),
            "string" => Some(TypeKind::String),
            _ => None,
        }
    }

    /// Returns true for the 13 scalar kinds.
    pub fn is_scalar(self) -> bool {
        !matches!(self, TypeKind::Empty | TypeKind::Struct | TypeKind::Array)
    }

    /// Returns true for kinds that support compare/increment/decrement.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true for the eight sized integer kinds (char8 and bool excluded).
    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 | TypeKind::Int64
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            TypeKind::UInt8 | TypeKind::UInt16 | TypeKind::UInt32 | TypeKind::UInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeKind::Float32 | TypeKind::Float64)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
