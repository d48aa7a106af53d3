//! Wire formats: the compact binary encoding and the JSON forms.

pub mod binary;
pub mod json;
pub mod primitives;

use crate::error::{Error, Result};

/// Maps model errors raised while assembling parser output to parse errors.
pub(crate) fn model<T>(result: Result<T>) -> Result<T> {
    result.map_err(Error::into_parse_error)
}
