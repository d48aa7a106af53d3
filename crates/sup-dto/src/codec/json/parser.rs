//! Stateful parser objects reporting success as `bool`.
//!
//! These wrap the `Result` returning functions for callers that only need to
//! know whether a document was accepted. The last error is kept for
//! inspection, and a failed parse always leaves the empty value behind.

use std::mem;
use std::path::Path;

use tracing::debug;

use super::{
    any_type_from_json_file, any_type_from_json_string, any_value_from_json_file,
    any_value_from_json_string, typed_value_from_json_file, typed_value_from_json_string,
};
use crate::error::{Error, Result};
use crate::model::{AnyType, AnyTypeRegistry, AnyValue};

/// Parses values from the reversible or the typed values-only form.
#[derive(Debug, Default)]
pub struct JsonAnyValueParser<'r> {
    registry: Option<&'r AnyTypeRegistry>,
    value: AnyValue,
    last_error: Option<Error>,
}

impl<'r> JsonAnyValueParser<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves named types in datatype sections through `registry`.
    pub fn with_registry(registry: &'r AnyTypeRegistry) -> Self {
        JsonAnyValueParser {
            registry: Some(registry),
            ..Self::default()
        }
    }

    fn accept(&mut self, result: Result<AnyValue>) -> bool {
        match result {
            Ok(value) => {
                self.value = value;
                self.last_error = None;
                true
            }
            Err(err) => {
                debug!(error = %err, "JSON value parse failed");
                self.value = AnyValue::empty();
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Parses the reversible form.
    pub fn parse_string(&mut self, input: &str) -> bool {
        let result = any_value_from_json_string(input, self.registry);
        self.accept(result)
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> bool {
        let result = any_value_from_json_file(path, self.registry);
        self.accept(result)
    }

    /// Parses a values-only document against `ty`.
    pub fn typed_parse_string(&mut self, ty: &AnyType, input: &str) -> bool {
        let result = typed_value_from_json_string(ty, input);
        self.accept(result)
    }

    pub fn typed_parse_file(&mut self, ty: &AnyType, path: impl AsRef<Path>) -> bool {
        let result = typed_value_from_json_file(ty, path);
        self.accept(result)
    }

    /// Takes the parsed value, leaving the empty value behind.
    pub fn move_any_value(&mut self) -> AnyValue {
        mem::take(&mut self.value)
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }
}

/// Parses types from the JSON type form.
#[derive(Debug, Default)]
pub struct JsonAnyTypeParser<'r> {
    registry: Option<&'r AnyTypeRegistry>,
    ty: AnyType,
    last_error: Option<Error>,
}

impl<'r> JsonAnyTypeParser<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: &'r AnyTypeRegistry) -> Self {
        JsonAnyTypeParser {
            registry: Some(registry),
            ..Self::default()
        }
    }

    fn accept(&mut self, result: Result<AnyType>) -> bool {
        match result {
            Ok(ty) => {
                self.ty = ty;
                self.last_error = None;
                true
            }
            Err(err) => {
                debug!(error = %err, "JSON type parse failed");
                self.ty = AnyType::empty();
                self.last_error = Some(err);
                false
            }
        }
    }

    pub fn parse_string(&mut self, input: &str) -> bool {
        let result = any_type_from_json_string(input, self.registry);
        self.accept(result)
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> bool {
        let result = any_type_from_json_file(path, self.registry);
        self.accept(result)
    }

    /// Takes the parsed type, leaving the empty type behind.
    pub fn move_any_type(&mut self) -> AnyType {
        mem::take(&mut self.ty)
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::{any_type_to_json_string, any_value_to_json_string};

    #[test]
    fn test_value_parser_success_and_failure() {
        let value = AnyValue::struct_from("P", [("x", AnyValue::from(1.5f64))]).unwrap();
        let text = any_value_to_json_string(&value, false).unwrap();

        let mut parser = JsonAnyValueParser::new();
        assert!(parser.parse_string(&text));
        assert!(parser.last_error().is_none());
        assert_eq!(parser.move_any_value(), value);
        assert!(parser.move_any_value().is_empty());

        assert!(parser.parse_string(&text));
        assert!(!parser.parse_string("[1,2"));
        assert!(parser.last_error().is_some());
        assert!(parser.move_any_value().is_empty());
    }

    #[test]
    fn test_typed_parse_failure_leaves_empty_value() {
        let ty = AnyType::struct_from("P", [("x", AnyType::INT8), ("y", AnyType::INT8)]).unwrap();
        let mut parser = JsonAnyValueParser::new();
        assert!(parser.typed_parse_string(&ty, r#"{"x":1,"y":2}"#));
        assert_eq!(parser.move_any_value()["y"], AnyValue::from(2i8));

        assert!(!parser.typed_parse_string(&ty, r#"{"x":1,"y":300}"#));
        assert!(parser.move_any_value().is_empty());
        assert!(!parser.typed_parse_string(&ty, r#"{"x":1}"#));
        assert!(parser.move_any_value().is_empty());
    }

    #[test]
    fn test_type_parser_with_registry() {
        let point = AnyType::struct_from("Point", [("x", AnyType::INT32)]).unwrap();
        let mut registry = AnyTypeRegistry::new();
        registry.register_type(point.clone()).unwrap();

        let mut parser = JsonAnyTypeParser::new();
        assert!(!parser.parse_string(r#"{"type":"Point"}"#));
        assert!(matches!(
            parser.last_error(),
            Some(Error::UnresolvedType { .. })
        ));

        let mut parser = JsonAnyTypeParser::with_registry(&registry);
        assert!(parser.parse_string(r#"{"type":"Point"}"#));
        assert_eq!(parser.move_any_type(), point);

        let text = any_type_to_json_string(&point, true).unwrap();
        assert!(parser.parse_string(&text));
        assert_eq!(parser.move_any_type(), point);
    }

    #[test]
    fn test_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.json");
        let value = AnyValue::from("text");
        crate::codec::json::any_value_to_json_file(&path, &value, true).unwrap();

        let mut parser = JsonAnyValueParser::new();
        assert!(parser.parse_file(&path));
        assert_eq!(parser.move_any_value(), value);
        assert!(!parser.parse_file(dir.path().join("missing.json")));
        assert!(matches!(parser.last_error(), Some(Error::ReadFile { .. })));
    }
}
