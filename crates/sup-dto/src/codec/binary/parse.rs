//! Binary parsing of type and value sections.
//!
//! Both parsers are explicit-stack state machines feeding a [`Composer`].
//! Value parsing is driven by an already known type: the type decides which
//! token must come next, so struct members and array elements are read in
//! exactly the order they were written.

use super::{
    scalar_kind, scalar_token, EMPTY, END_ARRAY, END_STRUCT, START_ARRAY, START_STRUCT, STRING,
};
use crate::codec::model;
use crate::codec::primitives::Reader;
use crate::error::{Error, Result};
use crate::limits::MAX_BINARY_DEPTH;
use crate::model::{
    AnyType, AnyValue, ArrayType, ArrayTypeHeader, ArrayValueHeader, Composer, Scalar,
    StructType, TypeKind, TypeNode,
};

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_BINARY_DEPTH {
        return Err(Error::LengthExceedsLimit {
            field: "nesting depth",
            len: depth as u64 + 1,
            max: MAX_BINARY_DEPTH as u64,
        });
    }
    Ok(())
}

enum TypeFrame {
    Struct { in_member: bool },
    Array { has_element: bool },
}

enum ValueFrame<'t> {
    Struct {
        ty: &'t StructType,
        next: usize,
        open: bool,
    },
    Array {
        ty: &'t ArrayType,
        remaining: u64,
    },
}

/// Streaming parser over a binary blob.
#[derive(Debug, Clone)]
pub struct BinaryParser<'a> {
    reader: Reader<'a>,
}

impl<'a> BinaryParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: Reader::new(data),
        }
    }

    /// True iff every input byte has been consumed.
    pub fn is_finished(&self) -> bool {
        self.reader.is_empty()
    }

    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Fails with [`Error::TrailingBytes`] unless the input is exhausted.
    pub fn finish(&self) -> Result<()> {
        if self.is_finished() {
            Ok(())
        } else {
            Err(Error::TrailingBytes {
                remaining: self.reader.remaining_len(),
            })
        }
    }

    /// Consumes one byte that must equal `token`.
    pub fn expect_token(&mut self, token: u8, context: &'static str) -> Result<()> {
        match self.reader.read_byte(context)? {
            t if t == token => Ok(()),
            t => Err(Error::UnexpectedToken { token: t, context }),
        }
    }

    fn read_usize(&mut self, context: &'static str) -> Result<usize> {
        let size = self.reader.read_size(context)?;
        usize::try_from(size).map_err(|_| Error::LengthExceedsLimit {
            field: context,
            len: size,
            max: usize::MAX as u64,
        })
    }

    // =========================================================================
    // TYPES
    // =========================================================================

    /// Parses one type tree.
    pub fn parse_type(&mut self) -> Result<AnyType> {
        let mut composer = Composer::<AnyType>::new();
        let mut frames: Vec<TypeFrame> = Vec::new();

        loop {
            match frames.last_mut() {
                Some(TypeFrame::Struct { in_member }) if !*in_member => {
                    match self.reader.read_byte("struct member")? {
                        STRING => {
                            let name = self.reader.read_string("member name")?;
                            model(composer.start_member(name))?;
                            *in_member = true;
                        }
                        END_STRUCT => {
                            frames.pop();
                            model(composer.end_struct())?;
                            Self::type_completed(&mut frames, &mut composer)?;
                        }
                        token => {
                            return Err(Error::UnexpectedToken {
                                token,
                                context: "struct member",
                            })
                        }
                    }
                    continue;
                }
                Some(TypeFrame::Array { has_element: true }) => {
                    self.expect_token(END_ARRAY, "array end")?;
                    frames.pop();
                    model(composer.end_array())?;
                    Self::type_completed(&mut frames, &mut composer)?;
                    continue;
                }
                None if composer.is_complete() => return model(composer.finish()),
                _ => {}
            }

            match self.reader.read_byte("type token")? {
                START_STRUCT => {
                    check_depth(frames.len())?;
                    let name = self.reader.read_string("struct name")?;
                    model(composer.start_struct(name))?;
                    frames.push(TypeFrame::Struct { in_member: false });
                }
                START_ARRAY => {
                    check_depth(frames.len())?;
                    let name = self.reader.read_string("array name")?;
                    let size = self.read_usize("array size")?;
                    model(composer.start_array(ArrayTypeHeader { name, size }))?;
                    frames.push(TypeFrame::Array { has_element: false });
                }
                EMPTY => {
                    model(composer.leaf(AnyType::EMPTY))?;
                    Self::type_completed(&mut frames, &mut composer)?;
                }
                token => {
                    let kind = scalar_kind(token).ok_or(Error::UnexpectedToken {
                        token,
                        context: "type token",
                    })?;
                    model(composer.leaf(AnyType::scalar(kind)))?;
                    Self::type_completed(&mut frames, &mut composer)?;
                }
            }
        }
    }

    /// Records that a complete type was attached to the innermost frame.
    fn type_completed(frames: &mut [TypeFrame], composer: &mut Composer<AnyType>) -> Result<()> {
        match frames.last_mut() {
            Some(TypeFrame::Struct { in_member }) => {
                model(composer.end_member())?;
                *in_member = false;
            }
            Some(TypeFrame::Array { has_element }) => *has_element = true,
            None => {}
        }
        Ok(())
    }

    // =========================================================================
    // VALUES
    // =========================================================================

    /// Parses one value tree of type `ty`.
    pub fn parse_value(&mut self, ty: &AnyType) -> Result<AnyValue> {
        let mut composer = Composer::<AnyValue>::new();
        let mut frames: Vec<ValueFrame<'_>> = Vec::new();
        let mut expected = Some(ty);

        loop {
            if let Some(ty) = expected.take() {
                self.read_value_node(ty, &mut composer, &mut frames)?;
            }

            loop {
                match frames.last_mut() {
                    None => return model(composer.finish()),
                    Some(ValueFrame::Struct { ty, next, open }) => {
                        let st = *ty;
                        if *open {
                            model(composer.end_member())?;
                            *open = false;
                        }
                        if let Some((name, member_ty)) = st.members().get(*next) {
                            model(composer.start_member(name.clone()))?;
                            *open = true;
                            *next += 1;
                            expected = Some(member_ty);
                            break;
                        }
                        self.expect_token(END_STRUCT, "struct end")?;
                        frames.pop();
                        model(composer.end_struct())?;
                    }
                    Some(ValueFrame::Array { ty, remaining }) => {
                        let at = *ty;
                        if *remaining > 0 {
                            *remaining -= 1;
                            expected = Some(at.element_type());
                            break;
                        }
                        self.expect_token(END_ARRAY, "array end")?;
                        frames.pop();
                        model(composer.end_array())?;
                    }
                }
            }
        }
    }

    fn read_value_node<'t>(
        &mut self,
        ty: &'t AnyType,
        composer: &mut Composer<AnyValue>,
        frames: &mut Vec<ValueFrame<'t>>,
    ) -> Result<()> {
        match ty.node() {
            TypeNode::Empty => {
                self.expect_token(EMPTY, "empty value")?;
                model(composer.leaf(AnyValue::empty()))
            }
            TypeNode::Scalar(kind) => {
                let token = self.reader.read_byte("scalar token")?;
                if token != scalar_token(*kind) {
                    return Err(Error::TypeMismatch {
                        context: "scalar token",
                    });
                }
                let scalar = self.read_scalar_payload(*kind)?;
                model(composer.leaf(scalar.into()))
            }
            TypeNode::Struct(st) => {
                check_depth(frames.len())?;
                self.expect_token(START_STRUCT, "struct start")?;
                let name = self.reader.read_string("struct name")?;
                if name != st.name() {
                    return Err(Error::TypeMismatch {
                        context: "struct name",
                    });
                }
                model(composer.start_struct(name))?;
                frames.push(ValueFrame::Struct {
                    ty: st,
                    next: 0,
                    open: false,
                });
                Ok(())
            }
            TypeNode::Array(at) => {
                check_depth(frames.len())?;
                self.expect_token(START_ARRAY, "array start")?;
                let name = self.reader.read_string("array name")?;
                if name != at.name() {
                    return Err(Error::TypeMismatch {
                        context: "array name",
                    });
                }
                let count = self.reader.read_size("element count")?;
                if !at.is_unbounded() && count != at.size() as u64 {
                    return Err(Error::TypeMismatch {
                        context: "fixed array element count",
                    });
                }
                // Every element takes at least one byte.
                if count > self.reader.remaining_len() as u64 {
                    return Err(Error::UnexpectedEof {
                        context: "array elements",
                    });
                }
                model(composer.start_array(ArrayValueHeader::Declared(at.clone())))?;
                frames.push(ValueFrame::Array {
                    ty: at,
                    remaining: count,
                });
                Ok(())
            }
        }
    }

    fn read_scalar_payload(&mut self, kind: TypeKind) -> Result<Scalar> {
        let r = &mut self.reader;
        let scalar = match kind {
            TypeKind::Bool => match r.read_byte("bool")? {
                0 => Scalar::Bool(false),
                1 => Scalar::Bool(true),
                _ => {
                    return Err(Error::Malformed {
                        context: "bool payload",
                    })
                }
            },
            TypeKind::Char8 => Scalar::Char8(r.read_byte("char8")?),
            TypeKind::Int8 => Scalar::Int8(r.read_byte("int8")? as i8),
            TypeKind::UInt8 => Scalar::UInt8(r.read_byte("uint8")?),
            TypeKind::Int16 => Scalar::Int16(r.read_u16("int16")? as i16),
            TypeKind::UInt16 => Scalar::UInt16(r.read_u16("uint16")?),
            TypeKind::Int32 => Scalar::Int32(r.read_u32("int32")? as i32),
            TypeKind::UInt32 => Scalar::UInt32(r.read_u32("uint32")?),
            TypeKind::Int64 => Scalar::Int64(r.read_u64("int64")? as i64),
            TypeKind::UInt64 => Scalar::UInt64(r.read_u64("uint64")?),
            TypeKind::Float32 => Scalar::Float32(r.read_f32("float32")?),
            TypeKind::Float64 => Scalar::Float64(r.read_f64("float64")?),
            TypeKind::String => Scalar::String(r.read_string("string")?),
            TypeKind::Empty | TypeKind::Struct | TypeKind::Array => {
                return Err(Error::TypeMismatch {
                    context: "scalar kind",
                })
            }
        };
        Ok(scalar)
    }
}
