//! Named type lookup used when parsing type references by name.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::kind::SCALAR_KINDS;
use crate::model::ty::AnyType;

lazy_static! {
    /// Builtin leaf types by canonical name (`empty` plus the scalar kinds).
    static ref LEAF_TYPES: FxHashMap<&'static str, AnyType> = {
        let mut types = FxHashMap::default();
        types.insert("empty", AnyType::EMPTY);
        for kind in SCALAR_KINDS {
            types.insert(kind.name(), AnyType::scalar(kind));
        }
        types
    };
}

/// Returns the builtin leaf type with the given name.
pub fn leaf_type(name: &str) -> Option<&'static AnyType> {
    LEAF_TYPES.get(name)
}

/// A name to type mapping, preloaded with the builtin leaf types.
#[derive(Debug, Clone)]
pub struct AnyTypeRegistry {
    types: FxHashMap<String, AnyType>,
}

impl Default for AnyTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AnyTypeRegistry {
    pub fn new() -> Self {
        let types = LEAF_TYPES
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect();
        AnyTypeRegistry { types }
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get_type(&self, name: &str) -> Result<AnyType> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTypeName {
                name: name.to_string(),
            })
    }

    /// Registers a type under its own type name.
    pub fn register_type(&mut self, ty: AnyType) -> Result<()> {
        let name = ty.type_name().to_string();
        self.register_type_named(name, ty)
    }

    /// Registers a type under `name`.
    ///
    /// Rejects empty names, builtin names, and names already bound to a
    /// different type. Registering the same type twice is accepted.
    pub fn register_type_named(&mut self, name: impl Into<String>, ty: AnyType) -> Result<()> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("empty name")
        } else if LEAF_TYPES.contains_key(name.as_str()) {
            Some("builtin type name")
        } else {
            match self.types.get(&name) {
                Some(existing) if *existing != ty => Some("already registered with a different type"),
                _ => None,
            }
        };
        if let Some(reason) = reason {
            debug!(name = %name, reason, "type registration rejected");
            return Err(Error::TypeRegistration { name, reason });
        }
        self.types.insert(name, ty);
        Ok(())
    }

    /// All registered names, builtins included, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
