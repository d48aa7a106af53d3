//! SUP-DTO: dynamically typed, schema-checked values with JSON and binary codecs.
//!
//! This crate provides a tree model of types ([`AnyType`]) and values
//! ([`AnyValue`]) for exchanging structured data across process and language
//! boundaries, together with a compact binary encoding and JSON forms.
//!
//! # Overview
//!
//! - **Types** are empty, one of thirteen scalar kinds, a named struct of
//!   ordered members, or a named array of a single element type.
//! - **Values** always carry the shape of their type. Assignment keeps that
//!   shape: a value only takes data that converts to it losslessly.
//! - **Depth.** Traversal, cloning, comparison, dropping, the binary codec and
//!   the JSON writer use explicit stacks. The JSON reader runs on `serde_json`
//!   with a stack that grows on demand. Decoders reject input nested deeper
//!   than [`limits::MAX_BINARY_DEPTH`] or [`limits::MAX_JSON_DEPTH`]. `Debug`
//!   formatting still recurses.
//!
//! # Quick Start
//!
//! ```rust
//! use sup_dto::{AnyType, AnyValue};
//! use sup_dto::codec::binary::{any_value_from_binary, any_value_to_binary};
//! use sup_dto::codec::json::{any_value_from_json_string, any_value_to_json_string};
//!
//! let mut value = AnyValue::structure("");
//! value
//!     .add_member("id", "X1".into())
//!     .unwrap()
//!     .add_member("count", 3u32.into())
//!     .unwrap();
//!
//! // Assignment converts into the existing shape.
//! value.field_mut("count").unwrap().assign(&7u8.into()).unwrap();
//! assert_eq!(value["count"], AnyValue::from(7u32));
//!
//! let json = any_value_to_json_string(&value, false).unwrap();
//! assert_eq!(any_value_from_json_string(&json, None).unwrap(), value);
//!
//! let bytes = any_value_to_binary(&value);
//! assert_eq!(any_value_from_binary(&bytes).unwrap(), value);
//! assert_eq!(
//!     value.get_type(),
//!     AnyType::struct_from("", [("id", AnyType::STRING), ("count", AnyType::UINT32)]).unwrap()
//! );
//! ```
//!
//! # Modules
//!
//! - [`model`]: types, values, conversion, paths, composers and the registry
//! - [`visit`]: the traversal shared by printing and the codecs
//! - [`codec`]: binary and JSON encodings
//! - [`sync`]: a mutex-serialized function object decorator
//! - [`error`]: error types
//! - [`limits`]: decoder safety limits
//!
//! # Security
//!
//! Decoders reject truncated input, trailing bytes, invalid UTF-8 and
//! oversized strings, and bound nesting depth.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod print;
pub mod sync;
pub mod visit;

#[cfg(test)]
mod proptest_tests;

// Re-export commonly used types at crate root
pub use codec::binary::{
    any_type_from_binary, any_type_to_binary, any_value_from_binary, any_value_to_binary,
    BinaryParser,
};
pub use codec::json::{
    any_type_from_json_file, any_type_from_json_string, any_type_to_json_file,
    any_type_to_json_string, any_value_from_json_file, any_value_from_json_string,
    any_value_to_json_file, any_value_to_json_string, typed_value_from_json_file,
    typed_value_from_json_string, values_to_json_file, values_to_json_string, JsonAnyTypeParser,
    JsonAnyValueParser, JSON_ENCODING,
};
pub use error::{Error, ErrorKind, Result};
pub use model::{
    compare, convert, decrement, increment, try_convert, AnyType, AnyTypeComposer,
    AnyTypeRegistry, AnyValue, AnyValueComposer, AnyValueMut, ArrayType, Char8, CompareResult,
    Constraints, Scalar, ScalarType, StructType, TypeKind,
};
pub use sync::{AnyFunctor, ThreadSafeAnyFunctor};
pub use visit::{walk, TreeVisitor, VisitNode};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
