//! JSON output through `serde_json`'s formatter layer.
//!
//! The visitors below write tokens one at a time, so a tree of any depth is
//! serialized without recursion. Structural whitespace comes from the
//! formatter; scalar text (escaping, shortest float form) from `serde_json`.

use std::io;

use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};

use crate::error::{Error, Result};
use crate::model::{AnyType, AnyValue, Scalar};
use crate::visit::{walk, TreeVisitor};

/// Compact or two-space indented output.
pub(crate) enum JsonFormatter {
    Compact(CompactFormatter),
    Pretty(PrettyFormatter<'static>),
}

impl JsonFormatter {
    pub(crate) fn new(pretty: bool) -> Self {
        if pretty {
            JsonFormatter::Pretty(PrettyFormatter::with_indent(b"  "))
        } else {
            JsonFormatter::Compact(CompactFormatter)
        }
    }
}

macro_rules! delegate_structural {
    ($($method:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            fn $method<W: ?Sized + io::Write>(
                &mut self,
                writer: &mut W
                $(, $arg: $ty)*
            ) -> io::Result<()> {
                match self {
                    JsonFormatter::Compact(f) => f.$method(writer $(, $arg)*),
                    JsonFormatter::Pretty(f) => f.$method(writer $(, $arg)*),
                }
            }
        )*
    };
}

// Scalar writers are shared defaults; only structural tokens differ.
impl Formatter for JsonFormatter {
    delegate_structural! {
        begin_array();
        end_array();
        begin_array_value(first: bool);
        end_array_value();
        begin_object();
        end_object();
        begin_object_key(first: bool);
        end_object_key();
        begin_object_value();
        end_object_value();
    }
}

fn output_error(err: impl std::fmt::Display) -> Error {
    Error::Output(err.to_string())
}

/// Token-level JSON writer.
pub(crate) struct JsonOutput<W> {
    writer: W,
    formatter: JsonFormatter,
}

impl<W: io::Write> JsonOutput<W> {
    pub(crate) fn new(writer: W, pretty: bool) -> Self {
        JsonOutput {
            writer,
            formatter: JsonFormatter::new(pretty),
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.writer
    }

    pub(crate) fn begin_object(&mut self) -> Result<()> {
        self.formatter
            .begin_object(&mut self.writer)
            .map_err(output_error)
    }

    pub(crate) fn end_object(&mut self) -> Result<()> {
        self.formatter
            .end_object(&mut self.writer)
            .map_err(output_error)
    }

    /// Writes `key` and the key/value separator.
    pub(crate) fn key(&mut self, key: &str, first: bool) -> Result<()> {
        self.formatter
            .begin_object_key(&mut self.writer, first)
            .map_err(output_error)?;
        self.string(key)?;
        self.formatter
            .end_object_key(&mut self.writer)
            .map_err(output_error)?;
        self.formatter
            .begin_object_value(&mut self.writer)
            .map_err(output_error)
    }

    pub(crate) fn end_value(&mut self) -> Result<()> {
        self.formatter
            .end_object_value(&mut self.writer)
            .map_err(output_error)
    }

    pub(crate) fn begin_array(&mut self) -> Result<()> {
        self.formatter
            .begin_array(&mut self.writer)
            .map_err(output_error)
    }

    pub(crate) fn end_array(&mut self) -> Result<()> {
        self.formatter
            .end_array(&mut self.writer)
            .map_err(output_error)
    }

    pub(crate) fn begin_element(&mut self, first: bool) -> Result<()> {
        self.formatter
            .begin_array_value(&mut self.writer, first)
            .map_err(output_error)
    }

    pub(crate) fn end_element(&mut self) -> Result<()> {
        self.formatter
            .end_array_value(&mut self.writer)
            .map_err(output_error)
    }

    pub(crate) fn string(&mut self, s: &str) -> Result<()> {
        serde_json::to_writer(&mut self.writer, s).map_err(output_error)
    }

    pub(crate) fn null(&mut self) -> Result<()> {
        self.formatter
            .write_null(&mut self.writer)
            .map_err(output_error)
    }

    /// Writes a scalar as a native JSON scalar; char8 is written as its code.
    pub(crate) fn scalar(&mut self, scalar: &Scalar) -> Result<()> {
        let w = &mut self.writer;
        let f = &mut self.formatter;
        match *scalar {
            Scalar::Bool(v) => f.write_bool(w, v),
            Scalar::Char8(v) | Scalar::UInt8(v) => f.write_u8(w, v),
            Scalar::Int8(v) => f.write_i8(w, v),
            Scalar::Int16(v) => f.write_i16(w, v),
            Scalar::UInt16(v) => f.write_u16(w, v),
            Scalar::Int32(v) => f.write_i32(w, v),
            Scalar::UInt32(v) => f.write_u32(w, v),
            Scalar::Int64(v) => f.write_i64(w, v),
            Scalar::UInt64(v) => f.write_u64(w, v),
            Scalar::Float32(v) if v.is_finite() => f.write_f32(w, v),
            Scalar::Float64(v) if v.is_finite() => f.write_f64(w, v),
            Scalar::Float32(v) => {
                return Err(Error::NonFiniteFloat {
                    value: f64::from(v),
                })
            }
            Scalar::Float64(value) => return Err(Error::NonFiniteFloat { value }),
            Scalar::String(ref s) => serde_json::to_writer(&mut *w, s).map_err(io::Error::from),
        }
        .map_err(output_error)
    }

    fn unsigned(&mut self, value: u64) -> Result<()> {
        self.formatter
            .write_u64(&mut self.writer, value)
            .map_err(output_error)
    }
}

// =============================================================================
// TYPE FORM
// =============================================================================

/// Writes `{"type": .., "attributes": [..]}` / `{"type": .., "multiplicity":
/// .., "element": ..}` / `{"type": ..}`.
struct TypeWriter<'o, W> {
    out: &'o mut JsonOutput<W>,
    first: bool,
}

impl<W: io::Write> TypeWriter<'_, W> {
    fn leaf(&mut self, node: &AnyType) -> Result<()> {
        self.out.begin_object()?;
        self.out.key("type", true)?;
        self.out.string(node.type_name())?;
        self.out.end_value()?;
        self.out.end_object()
    }
}

impl<W: io::Write> TreeVisitor<AnyType> for TypeWriter<'_, W> {
    type Error = Error;

    fn empty_prolog(&mut self, node: &AnyType) -> Result<()> {
        self.leaf(node)
    }

    fn scalar_prolog(&mut self, node: &AnyType) -> Result<()> {
        self.leaf(node)
    }

    fn struct_prolog(&mut self, node: &AnyType) -> Result<()> {
        self.out.begin_object()?;
        self.out.key("type", true)?;
        self.out.string(node.type_name())?;
        self.out.end_value()?;
        self.out.key("attributes", false)?;
        self.out.begin_array()?;
        self.first = true;
        Ok(())
    }

    fn struct_member_separator(&mut self, _: &AnyType) -> Result<()> {
        self.first = false;
        Ok(())
    }

    fn member_prolog(&mut self, _: &AnyType, name: &str) -> Result<()> {
        self.out.begin_element(self.first)?;
        self.out.begin_object()?;
        self.out.key(name, true)
    }

    fn member_epilog(&mut self, _: &AnyType, _: &str) -> Result<()> {
        self.out.end_value()?;
        self.out.end_object()?;
        self.out.end_element()
    }

    fn struct_epilog(&mut self, _: &AnyType) -> Result<()> {
        self.out.end_array()?;
        self.out.end_value()?;
        self.out.end_object()
    }

    fn array_prolog(&mut self, node: &AnyType) -> Result<()> {
        self.out.begin_object()?;
        self.out.key("type", true)?;
        self.out.string(node.type_name())?;
        self.out.end_value()?;
        let size = node.number_of_elements();
        if size > 0 {
            self.out.key("multiplicity", false)?;
            self.out.unsigned(size as u64)?;
            self.out.end_value()?;
        }
        self.out.key("element", false)
    }

    fn array_epilog(&mut self, _: &AnyType) -> Result<()> {
        self.out.end_value()?;
        self.out.end_object()
    }
}

// =============================================================================
// VALUES-ONLY FORM
// =============================================================================

struct ValueWriter<'o, W> {
    out: &'o mut JsonOutput<W>,
    /// One entry per open container: true for arrays.
    containers: Vec<bool>,
    first: bool,
}

impl<W: io::Write> ValueWriter<'_, W> {
    fn element_prolog(&mut self) -> Result<()> {
        match self.containers.last() {
            Some(true) => self.out.begin_element(self.first),
            _ => Ok(()),
        }
    }

    fn element_epilog(&mut self) -> Result<()> {
        match self.containers.last() {
            Some(true) => self.out.end_element(),
            _ => Ok(()),
        }
    }
}

impl<W: io::Write> TreeVisitor<AnyValue> for ValueWriter<'_, W> {
    type Error = Error;

    fn empty_prolog(&mut self, _: &AnyValue) -> Result<()> {
        self.element_prolog()?;
        self.out.null()
    }

    fn empty_epilog(&mut self, _: &AnyValue) -> Result<()> {
        self.element_epilog()
    }

    fn scalar_prolog(&mut self, node: &AnyValue) -> Result<()> {
        self.element_prolog()?;
        match node.scalar() {
            Some(scalar) => self.out.scalar(scalar),
            None => self.out.null(),
        }
    }

    fn scalar_epilog(&mut self, _: &AnyValue) -> Result<()> {
        self.element_epilog()
    }

    fn struct_prolog(&mut self, _: &AnyValue) -> Result<()> {
        self.element_prolog()?;
        self.out.begin_object()?;
        self.containers.push(false);
        self.first = true;
        Ok(())
    }

    fn struct_member_separator(&mut self, _: &AnyValue) -> Result<()> {
        self.first = false;
        Ok(())
    }

    fn member_prolog(&mut self, _: &AnyValue, name: &str) -> Result<()> {
        self.out.key(name, self.first)
    }

    fn member_epilog(&mut self, _: &AnyValue, _: &str) -> Result<()> {
        self.out.end_value()
    }

    fn struct_epilog(&mut self, _: &AnyValue) -> Result<()> {
        self.containers.pop();
        self.out.end_object()?;
        self.element_epilog()
    }

    fn array_prolog(&mut self, _: &AnyValue) -> Result<()> {
        self.element_prolog()?;
        self.out.begin_array()?;
        self.containers.push(true);
        self.first = true;
        Ok(())
    }

    fn array_element_separator(&mut self, _: &AnyValue) -> Result<()> {
        self.first = false;
        Ok(())
    }

    fn array_epilog(&mut self, _: &AnyValue) -> Result<()> {
        self.containers.pop();
        self.out.end_array()?;
        self.element_epilog()
    }
}

pub(crate) fn write_type_json<W: io::Write>(out: &mut JsonOutput<W>, ty: &AnyType) -> Result<()> {
    walk(ty, &mut TypeWriter { out, first: true })
}

pub(crate) fn write_values_json<W: io::Write>(
    out: &mut JsonOutput<W>,
    value: &AnyValue,
) -> Result<()> {
    walk(
        value,
        &mut ValueWriter {
            out,
            containers: Vec::new(),
            first: true,
        },
    )
}

/// Writes the `[{"encoding": ..}, {"datatype": ..}, {"instance": ..}]` form.
pub(crate) fn write_reversible_json<W: io::Write>(
    out: &mut JsonOutput<W>,
    value: &AnyValue,
    encoding: &str,
) -> Result<()> {
    out.begin_array()?;

    out.begin_element(true)?;
    out.begin_object()?;
    out.key("encoding", true)?;
    out.string(encoding)?;
    out.end_value()?;
    out.end_object()?;
    out.end_element()?;

    out.begin_element(false)?;
    out.begin_object()?;
    out.key("datatype", true)?;
    write_type_json(out, &value.get_type())?;
    out.end_value()?;
    out.end_object()?;
    out.end_element()?;

    out.begin_element(false)?;
    out.begin_object()?;
    out.key("instance", true)?;
    write_values_json(out, value)?;
    out.end_value()?;
    out.end_object()?;
    out.end_element()?;

    out.end_array()
}

/// Runs `write` against an in-memory output and returns the text.
pub(crate) fn render(
    pretty: bool,
    write: impl FnOnce(&mut JsonOutput<Vec<u8>>) -> Result<()>,
) -> Result<String> {
    let mut out = JsonOutput::new(Vec::new(), pretty);
    write(&mut out)?;
    String::from_utf8(out.into_inner()).map_err(output_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Char8;

    fn types(ty: &AnyType, pretty: bool) -> String {
        render(pretty, |out| write_type_json(out, ty)).unwrap()
    }

    fn values(value: &AnyValue, pretty: bool) -> String {
        render(pretty, |out| write_values_json(out, value)).unwrap()
    }

    #[test]
    fn test_leaf_type_form() {
        assert_eq!(types(&AnyType::UINT32, false), r#"{"type":"uint32"}"#);
        assert_eq!(types(&AnyType::EMPTY, false), r#"{"type":"empty"}"#);
    }

    #[test]
    fn test_array_type_form() {
        let unbounded = AnyType::array(0, AnyType::BOOL, "Flags").unwrap();
        assert_eq!(
            types(&unbounded, false),
            r#"{"type":"Flags","element":{"type":"bool"}}"#
        );
        let fixed = AnyType::array(4, unbounded, "").unwrap();
        assert_eq!(
            types(&fixed, false),
            r#"{"type":"","multiplicity":4,"element":{"type":"Flags","element":{"type":"bool"}}}"#
        );
    }

    #[test]
    fn test_struct_type_form() {
        let inner = AnyType::struct_from("In", [("a", AnyType::INT8)]).unwrap();
        let ty = AnyType::struct_from("Out", [("x", inner), ("y", AnyType::STRING)]).unwrap();
        assert_eq!(
            types(&ty, false),
            concat!(
                r#"{"type":"Out","attributes":["#,
                r#"{"x":{"type":"In","attributes":[{"a":{"type":"int8"}}]}},"#,
                r#"{"y":{"type":"string"}}]}"#
            )
        );
        assert_eq!(
            types(&AnyType::structure("E"), false),
            r#"{"type":"E","attributes":[]}"#
        );
    }

    #[test]
    fn test_values_form() {
        let mut list = AnyValue::array(AnyType::FLOAT64, "").unwrap();
        list.add_element(1.5f64.into())
            .unwrap()
            .add_element((-2.0f64).into())
            .unwrap();
        let mut value = AnyValue::structure("S");
        value
            .add_member("c", Char8(b'A').into())
            .unwrap()
            .add_member("s", "a\"b\n".into())
            .unwrap()
            .add_member("l", list)
            .unwrap()
            .add_member("e", AnyValue::structure("E"))
            .unwrap()
            .add_member("b", false.into())
            .unwrap();
        assert_eq!(
            values(&value, false),
            r#"{"c":65,"s":"a\"b\n","l":[1.5,-2.0],"e":{},"b":false}"#
        );
        assert_eq!(values(&AnyValue::empty(), false), "null");
        assert_eq!(values(&AnyValue::from(-7i16), false), "-7");
    }

    #[test]
    fn test_nested_arrays_values() {
        let row = AnyValue::array_from(vec![1u8.into(), 2u8.into()], "").unwrap();
        let grid = AnyValue::array_from(vec![row.clone(), row], "").unwrap();
        assert_eq!(values(&grid, false), "[[1,2],[1,2]]");
    }

    #[test]
    fn test_pretty_output() {
        let value = AnyValue::struct_from("", [("a", AnyValue::from(1u32))]).unwrap();
        assert_eq!(values(&value, true), "{\n  \"a\": 1\n}");
        let empty = AnyValue::array(AnyType::INT8, "").unwrap();
        assert_eq!(values(&empty, true), "[]");
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let value = AnyValue::struct_from("", [("f", AnyValue::from(f32::INFINITY))]).unwrap();
        let err = render(false, |out| write_values_json(out, &value)).unwrap_err();
        assert!(matches!(err, Error::NonFiniteFloat { .. }));
        assert!(render(false, |out| write_values_json(out, &f64::NAN.into())).is_err());
    }
}
