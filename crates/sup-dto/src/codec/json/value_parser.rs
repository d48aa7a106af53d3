//! Builds an [`AnyValue`] of a known type from the values-only JSON form.
//!
//! The type drives the parse: struct members must appear in declaration
//! order with their exact names, fixed arrays need exactly their size in
//! elements, and JSON scalars are converted to the declared scalar kind.

use super::event::JsonHandler;
use crate::codec::model;
use crate::error::{Error, Result};
use crate::model::{
    convert_scalar, AnyType, AnyValue, ArrayType, ArrayValueHeader, Composer, Scalar, StructType,
    TypeNode,
};

enum ValueFrame<'t> {
    Struct {
        ty: &'t StructType,
        next: usize,
        /// A member key was read and its value is pending or in progress.
        awaiting: bool,
    },
    Array {
        ty: &'t ArrayType,
        count: usize,
    },
}

fn mismatch(context: &'static str) -> Error {
    Error::TypeMismatch { context }
}

/// [`JsonHandler`] assembling one value tree of a given type.
pub struct ValueBuilder<'t> {
    root: &'t AnyType,
    composer: Composer<AnyValue>,
    frames: Vec<ValueFrame<'t>>,
}

impl<'t> ValueBuilder<'t> {
    pub fn new(ty: &'t AnyType) -> Self {
        ValueBuilder {
            root: ty,
            composer: Composer::new(),
            frames: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<AnyValue> {
        model(self.composer.finish())
    }

    /// Type of the value that the next token starts.
    fn expected(&self) -> Result<&'t AnyType> {
        match self.frames.last() {
            None if self.composer.is_complete() => Err(mismatch("content after the root value")),
            None => Ok(self.root),
            Some(ValueFrame::Struct {
                ty,
                next,
                awaiting: true,
            }) => {
                let ty: &'t StructType = *ty;
                ty.members()
                    .get(*next)
                    .map(|(_, member)| member)
                    .ok_or_else(|| mismatch("struct member"))
            }
            Some(ValueFrame::Struct { .. }) => Err(mismatch("expected a member name")),
            Some(ValueFrame::Array { ty, count }) => {
                let ty: &'t ArrayType = *ty;
                if !ty.is_unbounded() && *count >= ty.size() {
                    return Err(mismatch("too many elements for fixed array"));
                }
                Ok(ty.element_type())
            }
        }
    }

    /// Records that a complete value was attached to the innermost frame.
    fn completed(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            Some(ValueFrame::Struct { next, awaiting, .. }) => {
                model(self.composer.end_member())?;
                *awaiting = false;
                *next += 1;
            }
            Some(ValueFrame::Array { count, .. }) => *count += 1,
            None => {}
        }
        Ok(())
    }

    fn scalar(&mut self, scalar: Scalar) -> Result<()> {
        let kind = match self.expected()?.node() {
            TypeNode::Scalar(kind) => *kind,
            _ => return Err(mismatch("scalar where a different node is expected")),
        };
        let converted = model(convert_scalar(&scalar, kind))?;
        model(self.composer.leaf(converted.into()))?;
        self.completed()
    }
}

impl JsonHandler for ValueBuilder<'_> {
    fn null(&mut self) -> Result<()> {
        if !self.expected()?.is_empty() {
            return Err(mismatch("null where a value is expected"));
        }
        model(self.composer.leaf(AnyValue::empty()))?;
        self.completed()
    }

    fn bool(&mut self, value: bool) -> Result<()> {
        self.scalar(Scalar::Bool(value))
    }

    fn int(&mut self, value: i64) -> Result<()> {
        self.scalar(Scalar::Int64(value))
    }

    fn uint(&mut self, value: u64) -> Result<()> {
        self.scalar(Scalar::UInt64(value))
    }

    fn float(&mut self, value: f64) -> Result<()> {
        self.scalar(Scalar::Float64(value))
    }

    fn string(&mut self, value: &str) -> Result<()> {
        self.scalar(Scalar::String(value.to_string()))
    }

    fn start_object(&mut self) -> Result<()> {
        let TypeNode::Struct(st) = self.expected()?.node() else {
            return Err(mismatch("object where a different node is expected"));
        };
        model(self.composer.start_struct(st.name().to_string()))?;
        self.frames.push(ValueFrame::Struct {
            ty: st,
            next: 0,
            awaiting: false,
        });
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<()> {
        match self.frames.last_mut() {
            Some(ValueFrame::Struct {
                ty,
                next,
                awaiting: awaiting @ false,
            }) => {
                match ty.members().get(*next) {
                    Some((name, _)) if name == key => {}
                    Some(_) => return Err(mismatch("struct member out of order or misnamed")),
                    None => return Err(mismatch("unknown struct member")),
                }
                *awaiting = true;
                model(self.composer.start_member(key))
            }
            _ => Err(mismatch("unexpected object key")),
        }
    }

    fn end_object(&mut self) -> Result<()> {
        match self.frames.last() {
            Some(ValueFrame::Struct {
                ty,
                next,
                awaiting: false,
            }) if *next == ty.members().len() => {}
            Some(ValueFrame::Struct { .. }) => return Err(mismatch("missing struct member")),
            _ => return Err(mismatch("unexpected end of object")),
        }
        self.frames.pop();
        model(self.composer.end_struct())?;
        self.completed()
    }

    fn start_array(&mut self) -> Result<()> {
        let TypeNode::Array(at) = self.expected()?.node() else {
            return Err(mismatch("array where a different node is expected"));
        };
        model(
            self.composer
                .start_array(ArrayValueHeader::Declared(at.clone())),
        )?;
        self.frames.push(ValueFrame::Array { ty: at, count: 0 });
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        match self.frames.last() {
            Some(ValueFrame::Array { ty, count }) if ty.is_unbounded() || *count == ty.size() => {}
            Some(ValueFrame::Array { .. }) => {
                return Err(mismatch("too few elements for fixed array"))
            }
            _ => return Err(mismatch("unexpected end of array")),
        }
        self.frames.pop();
        model(self.composer.end_array())?;
        self.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::event::parse_events;
    use crate::model::Char8;

    fn parse(ty: &AnyType, input: &str) -> Result<AnyValue> {
        let mut builder = ValueBuilder::new(ty);
        parse_events(input, &mut builder)?;
        builder.finish()
    }

    fn record_type() -> AnyType {
        AnyType::struct_from(
            "Rec",
            [
                ("id", AnyType::STRING),
                ("n", AnyType::UINT16),
                ("c", AnyType::CHAR8),
                ("pos", AnyType::array(2, AnyType::FLOAT32, "").unwrap()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_typed_struct() {
        let value = parse(
            &record_type(),
            r#"{"id":"a","n":7,"c":66,"pos":[1,-0.5]}"#,
        )
        .unwrap();
        assert_eq!(value.get_type(), record_type());
        assert_eq!(value["n"], AnyValue::from(7u16));
        assert_eq!(value["c"], AnyValue::from(Char8(b'B')));
        assert_eq!(value["pos[0]"], AnyValue::from(1.0f32));
        assert_eq!(value["pos[1]"], AnyValue::from(-0.5f32));
    }

    #[test]
    fn test_scalar_roots() {
        assert_eq!(
            parse(&AnyType::INT8, "-3").unwrap(),
            AnyValue::from(-3i8)
        );
        assert_eq!(
            parse(&AnyType::FLOAT64, "5").unwrap(),
            AnyValue::from(5.0f64)
        );
        assert_eq!(parse(&AnyType::EMPTY, "null").unwrap(), AnyValue::empty());
        assert_eq!(
            parse(&AnyType::BOOL, "true").unwrap(),
            AnyValue::from(true)
        );
    }

    #[test]
    fn test_unbounded_array() {
        let ty = AnyType::array(0, AnyType::STRING, "Names").unwrap();
        let value = parse(&ty, r#"["a","b","c"]"#).unwrap();
        assert_eq!(value.number_of_elements(), 3);
        assert_eq!(value.get_type(), ty);
        assert_eq!(parse(&ty, "[]").unwrap().number_of_elements(), 0);
    }

    #[test]
    fn test_structural_mismatches() {
        let ty = record_type();
        for input in [
            r#"{"n":7,"id":"a","c":66,"pos":[1,2]}"#,
            r#"{"id":"a","n":7,"c":66}"#,
            r#"{"id":"a","n":7,"c":66,"pos":[1,2],"x":1}"#,
            r#"{"id":"a","n":7,"c":66,"pos":[1]}"#,
            r#"{"id":"a","n":7,"c":66,"pos":[1,2,3]}"#,
            r#"{"id":"a","n":{},"c":66,"pos":[1,2]}"#,
            r#"{"id":null,"n":7,"c":66,"pos":[1,2]}"#,
            r#"[1,2]"#,
        ] {
            assert!(
                matches!(parse(&ty, input), Err(Error::TypeMismatch { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn test_conversion_failures() {
        let ty = record_type();
        for input in [
            r#"{"id":"a","n":70000,"c":66,"pos":[1,2]}"#,
            r#"{"id":"a","n":-1,"c":66,"pos":[1,2]}"#,
            r#"{"id":"a","n":"7","c":66,"pos":[1,2]}"#,
            r#"{"id":5,"n":7,"c":66,"pos":[1,2]}"#,
        ] {
            let err = parse(&ty, input).unwrap_err();
            assert!(
                matches!(err, Error::Invalid(ref inner) if matches!(**inner, Error::ScalarConversion { .. })),
                "{input}: {err}"
            );
        }
    }
}
