//! Field path grammar shared by types and values.
//!
//! A path is a sequence of segments: a member name (any run of characters
//! other than `[`, `]` and `.`), an element index `[N]` (values) or the element
//! marker `[]` (types). A `.` may separate consecutive segments. It may not
//! lead the path, follow another `.`, or end the path after a member name.
//! A single trailing `.` directly after a bracket segment is tolerated.

use crate::error::{Error, Result};

/// Characters that may not appear in member names.
const FORBIDDEN_MEMBER_CHARS: [char; 4] = [' ', '[', ']', '.'];

/// Checks that `name` can be used as a struct member name.
pub fn validate_member_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(FORBIDDEN_MEMBER_CHARS) {
        return Err(Error::InvalidMemberName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Splits a path into its textual segments.
///
/// Bracket segments keep their brackets (`"[0]"`, `"[]"`), so that
/// `"a[0]b"`, `"a.[0].b"` and `"a[0].b"` all yield `["a", "[0]", "b"]`.
pub fn split_field_name(path: &str) -> Result<Vec<&str>> {
    let invalid = |reason| Error::InvalidPath {
        path: path.to_string(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("empty path"));
    }

    let bytes = path.as_bytes();
    let len = bytes.len();
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < len {
        let start = pos;
        if bytes[pos] == b'[' {
            let close = path[pos..]
                .find(']')
                .map(|offset| pos + offset)
                .ok_or_else(|| invalid("unmatched '['"))?;
            let inner = &path[pos + 1..close];
            if !inner.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("non-numeric index"));
            }
            pos = close + 1;
            segments.push(&path[start..pos]);
            if pos < len && bytes[pos] == b'.' {
                pos += 1;
            }
        } else {
            while pos < len && !matches!(bytes[pos], b'[' | b']' | b'.') {
                pos += 1;
            }
            if pos == start {
                return Err(invalid(if bytes[pos] == b']' {
                    "unmatched ']'"
                } else {
                    "empty segment"
                }));
            }
            segments.push(&path[start..pos]);
            if pos < len && bytes[pos] == b'.' {
                pos += 1;
                if pos == len {
                    return Err(invalid("trailing '.'"));
                }
            }
        }
    }
    Ok(segments)
}

/// A parsed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// A struct member name.
    Member(&'a str),
    /// An array element index (value paths).
    Index(usize),
    /// The array element type (type paths).
    Element,
}

/// Parses a value path: bracket segments must carry an index.
pub fn parse_value_path(path: &str) -> Result<Vec<PathSegment<'_>>> {
    split_field_name(path)?
        .into_iter()
        .map(|segment| match bracket_contents(segment) {
            Some("") => Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "value paths need an element index",
            }),
            Some(digits) => digits
                .parse::<usize>()
                .map(PathSegment::Index)
                .map_err(|_| Error::InvalidPath {
                    path: path.to_string(),
                    reason: "index out of range",
                }),
            None => Ok(PathSegment::Member(segment)),
        })
        .collect()
}

/// Parses a type path: bracket segments must be the bare `[]` marker.
pub fn parse_type_path(path: &str) -> Result<Vec<PathSegment<'_>>> {
    split_field_name(path)?
        .into_iter()
        .map(|segment| match bracket_contents(segment) {
            Some("") => Ok(PathSegment::Element),
            Some(_) => Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "type paths take '[]' without an index",
            }),
            None => Ok(PathSegment::Member(segment)),
        })
        .collect()
}

fn bracket_contents(segment: &str) -> Option<&str> {
    segment.strip_prefix('[')?.strip_suffix(']')
}
