//! Decoder safety limits.

/// Maximum byte length of a single string payload in binary input.
pub const MAX_STRING_LEN: usize = 256 * 1024 * 1024;

/// Maximum nesting depth accepted by the binary parsers.
pub const MAX_BINARY_DEPTH: usize = 10_000;

/// Maximum array/object nesting accepted by the JSON readers.
///
/// A struct level costs three JSON levels in the type form, so this admits the
/// reversible form of every tree the binary parsers accept.
pub const MAX_JSON_DEPTH: usize = 3 * MAX_BINARY_DEPTH + 8;
