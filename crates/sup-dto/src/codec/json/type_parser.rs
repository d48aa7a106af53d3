//! Builds an [`AnyType`] from the JSON type form.
//!
//! Keys must come in the order the writer produces them: `type` first, then
//! either `attributes` (struct), or an optional `multiplicity` followed by
//! `element` (array). An object holding only `type` names a leaf or a
//! registered type.

use std::mem;

use super::event::JsonHandler;
use crate::codec::model;
use crate::error::{Error, Result};
use crate::model::{leaf_type, AnyType, AnyTypeRegistry, ArrayTypeHeader, Composer};

#[derive(Debug, Default)]
enum ObjectState {
    #[default]
    ExpectTypeKey,
    ExpectTypeName,
    ExpectBody {
        name: String,
    },
    ExpectAttributes,
    ExpectMultiplicity {
        name: String,
    },
    ExpectElementKey {
        name: String,
        size: usize,
    },
    ExpectElement,
    ExpectStructEnd,
    ExpectArrayEnd,
}

#[derive(Debug)]
enum AttributeState {
    ExpectName,
    ExpectType,
    ExpectEnd,
}

#[derive(Debug)]
enum TypeFrame {
    /// A type definition object.
    Object(ObjectState),
    /// The `attributes` array of a struct definition.
    Attributes,
    /// One `{name: type}` attribute object.
    Attribute(AttributeState),
}

fn unexpected(context: &'static str) -> Error {
    Error::Malformed { context }
}

/// [`JsonHandler`] assembling one type tree.
pub struct TypeBuilder<'r> {
    registry: Option<&'r AnyTypeRegistry>,
    composer: Composer<AnyType>,
    frames: Vec<TypeFrame>,
}

impl<'r> TypeBuilder<'r> {
    pub fn new(registry: Option<&'r AnyTypeRegistry>) -> Self {
        TypeBuilder {
            registry,
            composer: Composer::new(),
            frames: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<AnyType> {
        model(self.composer.finish())
    }

    /// Resolves a bare type name: builtin leaves first, then the registry.
    fn resolve(&self, name: &str) -> Result<AnyType> {
        if let Some(ty) = leaf_type(name) {
            return Ok(ty.clone());
        }
        self.registry
            .and_then(|registry| registry.get_type(name).ok())
            .ok_or_else(|| Error::UnresolvedType {
                name: name.to_string(),
            })
    }
}

impl JsonHandler for TypeBuilder<'_> {
    fn null(&mut self) -> Result<()> {
        Err(unexpected("null in type definition"))
    }

    fn bool(&mut self, _: bool) -> Result<()> {
        Err(unexpected("bool in type definition"))
    }

    fn int(&mut self, _: i64) -> Result<()> {
        Err(unexpected("negative number in type definition"))
    }

    fn uint(&mut self, value: u64) -> Result<()> {
        match self.frames.last_mut() {
            Some(TypeFrame::Object(state)) => match mem::take(state) {
                ObjectState::ExpectMultiplicity { name } => {
                    let size = usize::try_from(value).map_err(|_| Error::LengthExceedsLimit {
                        field: "multiplicity",
                        len: value,
                        max: usize::MAX as u64,
                    })?;
                    *state = ObjectState::ExpectElementKey { name, size };
                    Ok(())
                }
                _ => Err(unexpected("number in type definition")),
            },
            _ => Err(unexpected("number in type definition")),
        }
    }

    fn float(&mut self, _: f64) -> Result<()> {
        Err(unexpected("number in type definition"))
    }

    fn string(&mut self, value: &str) -> Result<()> {
        match self.frames.last_mut() {
            Some(TypeFrame::Object(state @ ObjectState::ExpectTypeName)) => {
                *state = ObjectState::ExpectBody {
                    name: value.to_string(),
                };
                Ok(())
            }
            _ => Err(unexpected("string in type definition")),
        }
    }

    fn start_object(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            None if !self.composer.is_complete() => {}
            Some(TypeFrame::Object(state @ ObjectState::ExpectElement)) => {
                *state = ObjectState::ExpectArrayEnd;
            }
            Some(TypeFrame::Attributes) => {
                self.frames
                    .push(TypeFrame::Attribute(AttributeState::ExpectName));
                return Ok(());
            }
            Some(TypeFrame::Attribute(state @ AttributeState::ExpectType)) => {
                *state = AttributeState::ExpectEnd;
            }
            _ => return Err(unexpected("object in type definition")),
        }
        self.frames.push(TypeFrame::Object(ObjectState::ExpectTypeKey));
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<()> {
        match self.frames.last_mut() {
            Some(TypeFrame::Object(state)) => {
                *state = match (mem::take(state), key) {
                    (ObjectState::ExpectTypeKey, "type") => ObjectState::ExpectTypeName,
                    (ObjectState::ExpectBody { name }, "attributes") => {
                        model(self.composer.start_struct(name))?;
                        ObjectState::ExpectAttributes
                    }
                    (ObjectState::ExpectBody { name }, "multiplicity") => {
                        ObjectState::ExpectMultiplicity { name }
                    }
                    (ObjectState::ExpectBody { name }, "element") => {
                        model(self.composer.start_array(ArrayTypeHeader { name, size: 0 }))?;
                        ObjectState::ExpectElement
                    }
                    (ObjectState::ExpectElementKey { name, size }, "element") => {
                        model(self.composer.start_array(ArrayTypeHeader { name, size }))?;
                        ObjectState::ExpectElement
                    }
                    _ => return Err(unexpected("key in type definition")),
                };
                Ok(())
            }
            Some(TypeFrame::Attribute(state @ AttributeState::ExpectName)) => {
                model(self.composer.start_member(key))?;
                *state = AttributeState::ExpectType;
                Ok(())
            }
            _ => Err(unexpected("key in type definition")),
        }
    }

    fn end_object(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            Some(TypeFrame::Object(state)) => match mem::take(state) {
                ObjectState::ExpectBody { name } => {
                    let ty = self.resolve(&name)?;
                    model(self.composer.leaf(ty))?;
                }
                ObjectState::ExpectStructEnd => model(self.composer.end_struct())?,
                ObjectState::ExpectArrayEnd => model(self.composer.end_array())?,
                _ => return Err(unexpected("incomplete type definition")),
            },
            Some(TypeFrame::Attribute(AttributeState::ExpectEnd)) => {
                model(self.composer.end_member())?;
            }
            _ => return Err(unexpected("end of object in type definition")),
        }
        self.frames.pop();
        Ok(())
    }

    fn start_array(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            Some(TypeFrame::Object(state @ ObjectState::ExpectAttributes)) => {
                *state = ObjectState::ExpectStructEnd;
                self.frames.push(TypeFrame::Attributes);
                Ok(())
            }
            _ => Err(unexpected("array in type definition")),
        }
    }

    fn end_array(&mut self) -> Result<()> {
        match self.frames.last() {
            Some(TypeFrame::Attributes) => {
                self.frames.pop();
                Ok(())
            }
            _ => Err(unexpected("end of array in type definition")),
        }
    }
}
