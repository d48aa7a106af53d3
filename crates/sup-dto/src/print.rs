//! Human-readable rendering of types and values.
//!
//! Types print as `struct Point { x: int32, y: int32 }` and
//! `array Points[3] of struct Point { .. }`; values print as
//! `{ x: 1, y: -2 }` and `[1, 2, 3]`.

use std::fmt;

use crate::model::{AnyType, AnyValue, Scalar};
use crate::visit::{walk, TreeVisitor};

struct TypePrinter<'a, 'f> {
    f: &'a mut fmt::Formatter<'f>,
}

impl TreeVisitor<AnyType> for TypePrinter<'_, '_> {
    type Error = fmt::Error;

    fn empty_prolog(&mut self, _: &AnyType) -> fmt::Result {
        self.f.write_str("empty")
    }

    fn scalar_prolog(&mut self, node: &AnyType) -> fmt::Result {
        self.f.write_str(node.type_name())
    }

    fn struct_prolog(&mut self, node: &AnyType) -> fmt::Result {
        match node.type_name() {
            "" => self.f.write_str("struct {"),
            name => write!(self.f, "struct {name} {{"),
        }
    }

    fn struct_epilog(&mut self, node: &AnyType) -> fmt::Result {
        if node.number_of_members() == 0 {
            self.f.write_str("}")
        } else {
            self.f.write_str(" }")
        }
    }

    fn struct_member_separator(&mut self, _: &AnyType) -> fmt::Result {
        self.f.write_str(",")
    }

    fn member_prolog(&mut self, _: &AnyType, name: &str) -> fmt::Result {
        write!(self.f, " {name}: ")
    }

    fn array_prolog(&mut self, node: &AnyType) -> fmt::Result {
        let size = node.number_of_elements();
        let name = node.type_name();
        let space = if name.is_empty() { "" } else { " " };
        if size == 0 {
            write!(self.f, "array{space}{name}[] of ")
        } else {
            write!(self.f, "array{space}{name}[{size}] of ")
        }
    }
}

struct ValuePrinter<'a, 'f> {
    f: &'a mut fmt::Formatter<'f>,
}

impl TreeVisitor<AnyValue> for ValuePrinter<'_, '_> {
    type Error = fmt::Error;

    fn empty_prolog(&mut self, _: &AnyValue) -> fmt::Result {
        self.f.write_str("empty")
    }

    fn scalar_prolog(&mut self, node: &AnyValue) -> fmt::Result {
        match node.scalar() {
            Some(Scalar::Bool(v)) => write!(self.f, "{v}"),
            Some(Scalar::Char8(v)) => write!(self.f, "{v}"),
            Some(Scalar::Int8(v)) => write!(self.f, "{v}"),
            Some(Scalar::UInt8(v)) => write!(self.f, "{v}"),
            Some(Scalar::Int16(v)) => write!(self.f, "{v}"),
            Some(Scalar::UInt16(v)) => write!(self.f, "{v}"),
            Some(Scalar::Int32(v)) => write!(self.f, "{v}"),
            Some(Scalar::UInt32(v)) => write!(self.f, "{v}"),
            Some(Scalar::Int64(v)) => write!(self.f, "{v}"),
            Some(Scalar::UInt64(v)) => write!(self.f, "{v}"),
            Some(Scalar::Float32(v)) => write!(self.f, "{v}"),
            Some(Scalar::Float64(v)) => write!(self.f, "{v}"),
            Some(Scalar::String(v)) => write!(self.f, "{v:?}"),
            None => Ok(()),
        }
    }

    fn struct_prolog(&mut self, _: &AnyValue) -> fmt::Result {
        self.f.write_str("{")
    }

    fn struct_epilog(&mut self, node: &AnyValue) -> fmt::Result {
        if node.number_of_members() == 0 {
            self.f.write_str("}")
        } else {
            self.f.write_str(" }")
        }
    }

    fn struct_member_separator(&mut self, _: &AnyValue) -> fmt::Result {
        self.f.write_str(",")
    }

    fn member_prolog(&mut self, _: &AnyValue, name: &str) -> fmt::Result {
        write!(self.f, " {name}: ")
    }

    fn array_prolog(&mut self, _: &AnyValue) -> fmt::Result {
        self.f.write_str("[")
    }

    fn array_epilog(&mut self, _: &AnyValue) -> fmt::Result {
        self.f.write_str("]")
    }

    fn array_element_separator(&mut self, _: &AnyValue) -> fmt::Result {
        self.f.write_str(", ")
    }
}

impl fmt::Display for AnyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        walk(self, &mut TypePrinter { f })
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        walk(self, &mut ValuePrinter { f })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        let point =
            AnyType::struct_from("Point", [("x", AnyType::INT32), ("y", AnyType::INT32)]).unwrap();
        assert_eq!(point.to_string(), "struct Point { x: int32, y: int32 }");

        let list = AnyType::array(3, point, "Points").unwrap();
        assert_eq!(
            list.to_string(),
            "array Points[3] of struct Point { x: int32, y: int32 }"
        );
        let open = AnyType::array(0, AnyType::STRING, "").unwrap();
        assert_eq!(open.to_string(), "array[] of string");
        assert_eq!(AnyType::structure("").to_string(), "struct {}");
        assert_eq!(AnyType::EMPTY.to_string(), "empty");
    }

    #[test]
    fn test_value_display() {
        let mut value = AnyValue::structure("");
        value
            .add_member("id", "X1".into())
            .unwrap()
            .add_member("count", 3u32.into())
            .unwrap()
            .add_member(
                "flags",
                AnyValue::array_from(vec![true.into(), false.into()], "").unwrap(),
            )
            .unwrap();
        assert_eq!(
            value.to_string(),
            r#"{ id: "X1", count: 3, flags: [true, false] }"#
        );
        assert_eq!(AnyValue::empty().to_string(), "empty");
        assert_eq!(AnyValue::structure("S").to_string(), "{}");
    }
}
