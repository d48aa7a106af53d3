//! Error types for value construction, conversion, serialization and parsing.

use thiserror::Error;

use crate::model::TypeKind;

/// Crate-local result type. The error defaults to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kinds as seen by callers that only care about the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed path, illegal member, wrong node kind, out of bounds access.
    InvalidOperation,
    /// Scalar range/sign violation or incompatible shapes.
    InvalidConversion,
    /// Output could not be produced or written.
    SerializeError,
    /// Input was malformed, truncated or did not match the expected type.
    ParseError,
}

impl ErrorKind {
    /// Returns a short label for the kind (e.g., "invalid operation").
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::InvalidConversion => "invalid conversion",
            ErrorKind::SerializeError => "serialize error",
            ErrorKind::ParseError => "parse error",
        }
    }
}

/// Errors produced by the type/value model and its codecs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    // === Invalid operation ===
    #[error("[operation] invalid member name {name:?}")]
    InvalidMemberName { name: String },

    #[error("[operation] duplicate member name {name:?}")]
    DuplicateMember { name: String },

    #[error("[operation] member {name:?} cannot have an empty type")]
    EmptyMember { name: String },

    #[error("[operation] array element type cannot be empty")]
    EmptyElementType,

    #[error("[operation] cannot infer an array type from zero elements")]
    EmptyArray,

    #[error("[operation] {operation} requires a struct, found {found:?}")]
    NotAStruct {
        operation: &'static str,
        found: TypeKind,
    },

    #[error("[operation] {operation} requires an array, found {found:?}")]
    NotAnArray {
        operation: &'static str,
        found: TypeKind,
    },

    #[error("[operation] malformed field path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("[operation] no field {path:?}")]
    FieldNotFound { path: String },

    #[error("[operation] index {index} out of bounds (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("[operation] cannot add elements to a fixed array of size {size}")]
    FixedArraySize { size: usize },

    #[error("[operation] type registration of {name:?} rejected: {reason}")]
    TypeRegistration { name: String, reason: &'static str },

    #[error("[operation] unknown type name {name:?}")]
    UnknownTypeName { name: String },

    #[error("[operation] composer: {context}")]
    ComposerState { context: &'static str },

    // === Invalid conversion ===
    #[error("[conversion] cannot convert {from:?} to {to:?}")]
    ScalarConversion { from: TypeKind, to: TypeKind },

    #[error("[conversion] incompatible shapes: {context}")]
    ShapeMismatch { context: &'static str },

    #[error("[conversion] value type is locked")]
    LockedType,

    // === Serialize error ===
    #[error("[serialize] cannot write {path:?}: {message}")]
    WriteFile { path: String, message: String },

    #[error("[serialize] non-finite float {value} has no JSON representation")]
    NonFiniteFloat { value: f64 },

    #[error("[serialize] output failed: {0}")]
    Output(String),

    // === Parse error ===
    #[error("[parse] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("[parse] unexpected token 0x{token:02X} while reading {context}")]
    UnexpectedToken { token: u8, context: &'static str },

    #[error("[parse] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: u64,
        max: u64,
    },

    #[error("[parse] invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("[parse] {remaining} trailing bytes after complete input")]
    TrailingBytes { remaining: usize },

    #[error("[parse] malformed input: {context}")]
    Malformed { context: &'static str },

    #[error("[parse] input does not match type: {context}")]
    TypeMismatch { context: &'static str },

    #[error("[parse] unsupported encoding {found:?}")]
    UnsupportedEncoding { found: String },

    #[error("[parse] unresolved type name {name:?}")]
    UnresolvedType { name: String },

    #[error("[parse] invalid JSON: {0}")]
    Json(String),

    #[error("[parse] cannot read {path:?}: {message}")]
    ReadFile { path: String, message: String },

    #[error("[parse] {0}")]
    Invalid(Box<Error>),
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMemberName { .. }
            | Error::DuplicateMember { .. }
            | Error::EmptyMember { .. }
            | Error::EmptyElementType
            | Error::EmptyArray
            | Error::NotAStruct { .. }
            | Error::NotAnArray { .. }
            | Error::InvalidPath { .. }
            | Error::FieldNotFound { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::FixedArraySize { .. }
            | Error::TypeRegistration { .. }
            | Error::UnknownTypeName { .. }
            | Error::ComposerState { .. } => ErrorKind::InvalidOperation,
            Error::ScalarConversion { .. } | Error::ShapeMismatch { .. } | Error::LockedType => {
                ErrorKind::InvalidConversion
            }
            Error::WriteFile { .. } | Error::NonFiniteFloat { .. } | Error::Output(_) => {
                ErrorKind::SerializeError
            }
            _ => ErrorKind::ParseError,
        }
    }

    /// Wraps a model error raised while building parser output.
    ///
    /// Errors that already are parse errors pass through unchanged.
    pub fn into_parse_error(self) -> Error {
        match self.kind() {
            ErrorKind::ParseError => self,
            _ => Error::Invalid(Box::new(self)),
        }
    }
}
