//! JSON forms of types and values.
//!
//! Three forms are written:
//!
//! - the type form: `{"type":"Rec","attributes":[{"id":{"type":"string"}}]}`
//! - the values-only form: `{"id":"X1"}`
//! - the reversible form, which carries both:
//!   `[{"encoding":"sup-dto/v1.0/JSON"},{"datatype":..},{"instance":..}]`
//!
//! Parsing is event driven (see [`event`]). A values-only document can only
//! be read back against a type supplied by the caller.

pub mod event;

mod envelope;
mod file;
mod parser;
mod type_parser;
mod value_parser;
mod writer;

use std::path::Path;

pub use parser::{JsonAnyTypeParser, JsonAnyValueParser};

use crate::error::Result;
use crate::model::{AnyType, AnyTypeRegistry, AnyValue};

/// Encoding tag of the reversible form.
pub const JSON_ENCODING: &str = "sup-dto/v1.0/JSON";

/// Writes a type in the type form.
pub fn any_type_to_json_string(ty: &AnyType, pretty: bool) -> Result<String> {
    writer::render(pretty, |out| writer::write_type_json(out, ty))
}

/// Writes only the data of a value.
pub fn values_to_json_string(value: &AnyValue, pretty: bool) -> Result<String> {
    writer::render(pretty, |out| writer::write_values_json(out, value))
}

/// Writes a value in the reversible form.
pub fn any_value_to_json_string(value: &AnyValue, pretty: bool) -> Result<String> {
    writer::render(pretty, |out| {
        writer::write_reversible_json(out, value, JSON_ENCODING)
    })
}

pub fn any_type_from_json_string(
    input: &str,
    registry: Option<&AnyTypeRegistry>,
) -> Result<AnyType> {
    envelope::parse_type(input, registry)
}

/// Reads a value from the reversible form.
pub fn any_value_from_json_string(
    input: &str,
    registry: Option<&AnyTypeRegistry>,
) -> Result<AnyValue> {
    envelope::parse_reversible(input, registry)
}

/// Reads a values-only document against `ty`.
pub fn typed_value_from_json_string(ty: &AnyType, input: &str) -> Result<AnyValue> {
    envelope::parse_typed_value(ty, input)
}

pub fn any_type_to_json_file(path: impl AsRef<Path>, ty: &AnyType, pretty: bool) -> Result<()> {
    file::write_json_file(path.as_ref(), pretty, |out| {
        writer::write_type_json(out, ty)
    })
}

pub fn any_value_to_json_file(
    path: impl AsRef<Path>,
    value: &AnyValue,
    pretty: bool,
) -> Result<()> {
    file::write_json_file(path.as_ref(), pretty, |out| {
        writer::write_reversible_json(out, value, JSON_ENCODING)
    })
}

pub fn values_to_json_file(path: impl AsRef<Path>, value: &AnyValue, pretty: bool) -> Result<()> {
    file::write_json_file(path.as_ref(), pretty, |out| {
        writer::write_values_json(out, value)
    })
}

pub fn any_type_from_json_file(
    path: impl AsRef<Path>,
    registry: Option<&AnyTypeRegistry>,
) -> Result<AnyType> {
    let text = file::read_text(path.as_ref())?;
    any_type_from_json_string(&text, registry)
}

pub fn any_value_from_json_file(
    path: impl AsRef<Path>,
    registry: Option<&AnyTypeRegistry>,
) -> Result<AnyValue> {
    let text = file::read_text(path.as_ref())?;
    any_value_from_json_string(&text, registry)
}

pub fn typed_value_from_json_file(ty: &AnyType, path: impl AsRef<Path>) -> Result<AnyValue> {
    let text = file::read_text(path.as_ref())?;
    typed_value_from_json_string(ty, &text)
}
