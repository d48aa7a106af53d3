//! Binary serialization of type and value trees.

use std::convert::Infallible;

use super::{
    scalar_token, EMPTY, END_ARRAY, END_STRUCT, START_ARRAY, START_STRUCT, STRING,
};
use crate::codec::primitives::Writer;
use crate::model::{AnyType, AnyValue, Scalar};
use crate::visit::{walk, TreeVisitor};

/// Writes the token and payload of a scalar.
pub(crate) fn write_scalar(writer: &mut Writer, scalar: &Scalar) {
    writer.write_byte(scalar_token(scalar.kind()));
    match *scalar {
        Scalar::Bool(v) => writer.write_byte(u8::from(v)),
        Scalar::Char8(v) | Scalar::UInt8(v) => writer.write_byte(v),
        Scalar::Int8(v) => writer.write_byte(v as u8),
        Scalar::Int16(v) => writer.write_u16(v as u16),
        Scalar::UInt16(v) => writer.write_u16(v),
        Scalar::Int32(v) => writer.write_u32(v as u32),
        Scalar::UInt32(v) => writer.write_u32(v),
        Scalar::Int64(v) => writer.write_u64(v as u64),
        Scalar::UInt64(v) => writer.write_u64(v),
        Scalar::Float32(v) => writer.write_f32(v),
        Scalar::Float64(v) => writer.write_f64(v),
        Scalar::String(ref s) => writer.write_string(s),
    }
}

struct TypeEncoder<'w> {
    writer: &'w mut Writer,
}

impl TreeVisitor<AnyType> for TypeEncoder<'_> {
    type Error = Infallible;

    fn empty_prolog(&mut self, _: &AnyType) -> Result<(), Infallible> {
        self.writer.write_byte(EMPTY);
        Ok(())
    }

    fn scalar_prolog(&mut self, node: &AnyType) -> Result<(), Infallible> {
        self.writer.write_byte(scalar_token(node.kind()));
        Ok(())
    }

    fn struct_prolog(&mut self, node: &AnyType) -> Result<(), Infallible> {
        self.writer.write_byte(START_STRUCT);
        self.writer.write_string(node.type_name());
        Ok(())
    }

    fn member_prolog(&mut self, _: &AnyType, name: &str) -> Result<(), Infallible> {
        self.writer.write_byte(STRING);
        self.writer.write_string(name);
        Ok(())
    }

    fn struct_epilog(&mut self, _: &AnyType) -> Result<(), Infallible> {
        self.writer.write_byte(END_STRUCT);
        Ok(())
    }

    fn array_prolog(&mut self, node: &AnyType) -> Result<(), Infallible> {
        self.writer.write_byte(START_ARRAY);
        self.writer.write_string(node.type_name());
        self.writer.write_size(node.number_of_elements() as u64);
        Ok(())
    }

    fn array_epilog(&mut self, _: &AnyType) -> Result<(), Infallible> {
        self.writer.write_byte(END_ARRAY);
        Ok(())
    }
}

struct ValueEncoder<'w> {
    writer: &'w mut Writer,
}

impl TreeVisitor<AnyValue> for ValueEncoder<'_> {
    type Error = Infallible;

    fn empty_prolog(&mut self, _: &AnyValue) -> Result<(), Infallible> {
        self.writer.write_byte(EMPTY);
        Ok(())
    }

    fn scalar_prolog(&mut self, node: &AnyValue) -> Result<(), Infallible> {
        if let Some(scalar) = node.scalar() {
            write_scalar(self.writer, scalar);
        }
        Ok(())
    }

    fn struct_prolog(&mut self, node: &AnyValue) -> Result<(), Infallible> {
        self.writer.write_byte(START_STRUCT);
        self.writer.write_string(node.type_name());
        Ok(())
    }

    fn struct_epilog(&mut self, _: &AnyValue) -> Result<(), Infallible> {
        self.writer.write_byte(END_STRUCT);
        Ok(())
    }

    fn array_prolog(&mut self, node: &AnyValue) -> Result<(), Infallible> {
        self.writer.write_byte(START_ARRAY);
        self.writer.write_string(node.type_name());
        self.writer.write_size(node.number_of_elements() as u64);
        Ok(())
    }

    fn array_epilog(&mut self, _: &AnyValue) -> Result<(), Infallible> {
        self.writer.write_byte(END_ARRAY);
        Ok(())
    }
}

/// Appends the type section body (without the leading section token).
pub fn write_type(writer: &mut Writer, ty: &AnyType) {
    let Ok(()) = walk(ty, &mut TypeEncoder { writer });
}

/// Appends the value section body (without the leading section token).
pub fn write_value(writer: &mut Writer, value: &AnyValue) {
    let Ok(()) = walk(value, &mut ValueEncoder { writer });
}
