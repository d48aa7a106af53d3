//! Structural type descriptors.

use std::mem;
use std::ops::Index;
use std::sync::Arc;

use lazy_static::lazy_static;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::model::path::{parse_type_path, validate_member_name, PathSegment};
use crate::model::TypeKind;

/// A structural type: empty, scalar, struct or array.
///
/// Struct member types and array element types are never empty. Equality is
/// deep and structural, including type names and declared array sizes.
///
/// Cloning, comparing and dropping walk the tree with an explicit stack.
#[derive(Debug, Default)]
pub struct AnyType {
    node: TypeNode,
}

/// The shape of an [`AnyType`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeNode {
    #[default]
    Empty,
    Scalar(TypeKind),
    Struct(StructType),
    Array(ArrayType),
}

/// A named struct type with ordered, uniquely named members.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructType {
    name: String,
    members: Vec<(String, AnyType)>,
}

/// A named array type. A size of zero denotes an unbounded array.
///
/// The element type is shared, so cloning an array type does not copy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    name: String,
    size: usize,
    element: Arc<AnyType>,
}

impl StructType {
    pub fn new(name: impl Into<String>) -> Self {
        StructType {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Appends a member whose name and type were already validated.
    pub(crate) fn push_validated(&mut self, name: String, ty: AnyType) {
        self.members.push((name, ty));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[(String, AnyType)] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&AnyType> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    fn add_member(&mut self, name: String, ty: AnyType) -> Result<()> {
        validate_member_name(&name)?;
        if ty.is_empty() {
            return Err(Error::EmptyMember { name });
        }
        if self.member(&name).is_some() {
            return Err(Error::DuplicateMember { name });
        }
        self.members.push((name, ty));
        Ok(())
    }
}

impl ArrayType {
    /// Creates an array type; fails if the element type is empty.
    pub fn new(size: usize, element: AnyType, name: impl Into<String>) -> Result<Self> {
        if element.is_empty() {
            return Err(Error::EmptyElementType);
        }
        Ok(ArrayType {
            name: name.into(),
            size,
            element: Arc::new(element),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared number of elements; zero for unbounded arrays.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_unbounded(&self) -> bool {
        self.size == 0
    }

    pub fn element_type(&self) -> &AnyType {
        &self.element
    }
}

macro_rules! leaf_consts {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            pub const $name: AnyType = AnyType {
                node: TypeNode::Scalar(TypeKind::$kind),
            };
        )*
    };
}

impl AnyType {
    pub const EMPTY: AnyType = AnyType {
        node: TypeNode::Empty,
    };

    leaf_consts! {
        BOOL => Bool,
        CHAR8 => Char8,
        INT8 => Int8,
        UINT8 => UInt8,
        INT16 => Int16,
        UINT16 => UInt16,
        INT32 => Int32,
        UINT32 => UInt32,
        INT64 => Int64,
        UINT64 => UInt64,
        FLOAT32 => Float32,
        FLOAT64 => Float64,
        STRING => String,
    }

    /// Creates the empty type.
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Returns the leaf type (empty or scalar) for a kind.
    pub fn leaf(kind: TypeKind) -> Option<Self> {
        match kind {
            TypeKind::Empty => Some(Self::EMPTY),
            TypeKind::Struct | TypeKind::Array => None,
            scalar => Some(AnyType {
                node: TypeNode::Scalar(scalar),
            }),
        }
    }

    /// Scalar type for a kind already known to be scalar.
    pub(crate) fn scalar(kind: TypeKind) -> Self {
        debug_assert!(kind.is_scalar());
        AnyType {
            node: TypeNode::Scalar(kind),
        }
    }

    /// Creates a struct type without members.
    pub fn structure(name: impl Into<String>) -> Self {
        StructType::new(name).into()
    }

    /// Creates a struct type from (name, type) pairs.
    pub fn struct_from<N, I>(name: impl Into<String>, members: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, AnyType)>,
    {
        let mut st = StructType::new(name);
        let mut seen = FxHashSet::default();
        for (member, ty) in members {
            let member = member.into();
            if !seen.insert(member.clone()) {
                return Err(Error::DuplicateMember { name: member });
            }
            validate_member_name(&member)?;
            if ty.is_empty() {
                return Err(Error::EmptyMember { name: member });
            }
            st.members.push((member, ty));
        }
        Ok(AnyType {
            node: TypeNode::Struct(st),
        })
    }

    /// Creates an array type. `size == 0` declares an unbounded array.
    pub fn array(size: usize, element: AnyType, name: impl Into<String>) -> Result<Self> {
        Ok(ArrayType::new(size, element, name)?.into())
    }

    pub fn node(&self) -> &TypeNode {
        &self.node
    }

    pub fn kind(&self) -> TypeKind {
        match &self.node {
            TypeNode::Empty => TypeKind::Empty,
            TypeNode::Scalar(kind) => *kind,
            TypeNode::Struct(_) => TypeKind::Struct,
            TypeNode::Array(_) => TypeKind::Array,
        }
    }

    /// Returns the type name: the declared name for structs and arrays, the
    /// canonical kind name otherwise.
    pub fn type_name(&self) -> &str {
        match &self.node {
            TypeNode::Struct(st) => &st.name,
            TypeNode::Array(at) => &at.name,
            _ => self.kind().name(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.node, TypeNode::Empty)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.node, TypeNode::Scalar(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.node, TypeNode::Struct(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.node, TypeNode::Array(_))
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match &self.node {
            TypeNode::Struct(st) => Some(st),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match &self.node {
            TypeNode::Array(at) => Some(at),
            _ => None,
        }
    }

    /// Appends a member to a struct type.
    pub fn add_member(&mut self, name: impl Into<String>, ty: AnyType) -> Result<&mut Self> {
        let found = self.kind();
        match &mut self.node {
            TypeNode::Struct(st) => st.add_member(name.into(), ty)?,
            _ => {
                return Err(Error::NotAStruct {
                    operation: "add_member",
                    found,
                })
            }
        }
        Ok(self)
    }

    /// Member names in declaration order (empty for non-structs).
    pub fn member_names(&self) -> Vec<&str> {
        self.as_struct()
            .map(|st| st.members.iter().map(|(n, _)| n.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn number_of_members(&self) -> usize {
        self.as_struct().map_or(0, |st| st.members.len())
    }

    pub fn element_type(&self) -> Option<&AnyType> {
        self.as_array().map(ArrayType::element_type)
    }

    /// Declared array size (zero for unbounded arrays and non-arrays).
    pub fn number_of_elements(&self) -> usize {
        self.as_array().map_or(0, ArrayType::size)
    }

    /// Returns true if `path` names an existing field. Never fails.
    pub fn has_field(&self, path: &str) -> bool {
        self.field(path).is_ok()
    }

    /// Looks up a nested type by path (`"a.b[].c"`).
    pub fn field(&self, path: &str) -> Result<&AnyType> {
        let mut current = self;
        for segment in parse_type_path(path)? {
            let next = match (segment, &current.node) {
                (PathSegment::Member(name), TypeNode::Struct(st)) => st.member(name),
                (PathSegment::Element, TypeNode::Array(at)) => Some(at.element_type()),
                _ => None,
            };
            current = next.ok_or_else(|| Error::FieldNotFound {
                path: path.to_string(),
            })?;
        }
        Ok(current)
    }
}

impl From<ArrayType> for AnyType {
    fn from(at: ArrayType) -> Self {
        AnyType {
            node: TypeNode::Array(at),
        }
    }
}

impl From<StructType> for AnyType {
    fn from(st: StructType) -> Self {
        AnyType {
            node: TypeNode::Struct(st),
        }
    }
}

impl Clone for AnyType {
    fn clone(&self) -> Self {
        // Structs under construction, paired with their source.
        let mut frames: Vec<(&StructType, StructType)> = Vec::new();
        let mut next = self;
        loop {
            let mut finished = match &next.node {
                TypeNode::Struct(st) => {
                    frames.push((
                        st,
                        StructType {
                            name: st.name.clone(),
                            members: Vec::with_capacity(st.members.len()),
                        },
                    ));
                    None
                }
                TypeNode::Array(at) => Some(AnyType::from(at.clone())),
                TypeNode::Scalar(kind) => Some(AnyType::scalar(*kind)),
                TypeNode::Empty => Some(AnyType::EMPTY),
            };
            loop {
                let Some((source, copy)) = frames.last_mut() else {
                    return finished.unwrap_or_default();
                };
                let source = *source;
                if let Some(ty) = finished.take() {
                    let name = source.members[copy.members.len()].0.clone();
                    copy.members.push((name, ty));
                }
                if let Some((_, member)) = source.members.get(copy.members.len()) {
                    next = member;
                    break;
                }
                finished = frames.pop().map(|(_, copy)| AnyType::from(copy));
            }
        }
    }
}

impl PartialEq for AnyType {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            match (&left.node, &right.node) {
                (TypeNode::Empty, TypeNode::Empty) => {}
                (TypeNode::Scalar(l), TypeNode::Scalar(r)) if l == r => {}
                (TypeNode::Struct(l), TypeNode::Struct(r))
                    if l.name == r.name && l.members.len() == r.members.len() =>
                {
                    for ((ln, lt), (rn, rt)) in l.members.iter().zip(&r.members) {
                        if ln != rn {
                            return false;
                        }
                        pending.push((lt, rt));
                    }
                }
                (TypeNode::Array(l), TypeNode::Array(r)) if l.name == r.name && l.size == r.size => {
                    if !Arc::ptr_eq(&l.element, &r.element) {
                        pending.push((&*l.element, &*r.element));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for AnyType {}

lazy_static! {
    /// Placeholder left in array types whose element was detached on drop.
    static ref DETACHED: Arc<AnyType> = Arc::new(AnyType::EMPTY);
}

impl AnyType {
    /// Moves the owned children into `out`, leaving a shallow node.
    fn detach_children(&mut self, out: &mut Vec<AnyType>) {
        match &mut self.node {
            TypeNode::Struct(st) => out.extend(st.members.drain(..).map(|(_, ty)| ty)),
            TypeNode::Array(at) => {
                let element = mem::replace(&mut at.element, Arc::clone(&DETACHED));
                out.extend(Arc::into_inner(element));
            }
            TypeNode::Empty | TypeNode::Scalar(_) => {}
        }
    }
}

impl Drop for AnyType {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut ty) = pending.pop() {
            ty.detach_children(&mut pending);
        }
    }
}

/// Panics if the path is malformed or names no field; use
/// [`AnyType::field`] for a fallible lookup.
impl Index<&str> for AnyType {
    type Output = AnyType;

    fn index(&self, path: &str) -> &AnyType {
        match self.field(path) {
            Ok(ty) => ty,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AnyType {
        let mut inner = AnyType::structure("Inner");
        inner.add_member("c", AnyType::FLOAT64).unwrap();
        let list = AnyType::array(3, inner, "List").unwrap();
        let mut ty = AnyType::structure("Record");
        ty.add_member("id", AnyType::STRING)
            .unwrap()
            .add_member("items", list)
            .unwrap();
        ty
    }

    #[test]
    fn test_add_member_rules() {
        let mut ty = AnyType::structure("S");
        ty.add_member("a", AnyType::INT32).unwrap();
        assert!(matches!(
            ty.add_member("a", AnyType::INT8),
            Err(Error::DuplicateMember { .. })
        ));
        assert!(matches!(
            ty.add_member("b", AnyType::EMPTY),
            Err(Error::EmptyMember { .. })
        ));
        assert!(matches!(
            ty.add_member("has space", AnyType::INT8),
            Err(Error::InvalidMemberName { .. })
        ));
        assert!(matches!(
            ty.add_member("", AnyType::INT8),
            Err(Error::InvalidMemberName { .. })
        ));
        assert_eq!(ty.member_names(), vec!["a"]);

        let mut scalar = AnyType::BOOL;
        assert!(matches!(
            scalar.add_member("a", AnyType::INT8),
            Err(Error::NotAStruct { found: TypeKind::Bool, .. })
        ));
    }

    #[test]
    fn test_array_rejects_empty_element() {
        assert!(matches!(
            AnyType::array(2, AnyType::EMPTY, ""),
            Err(Error::EmptyElementType)
        ));
    }

    #[test]
    fn test_struct_from_rejects_duplicates() {
        let err = AnyType::struct_from("S", [("a", AnyType::INT8), ("a", AnyType::INT16)]);
        assert!(matches!(err, Err(Error::DuplicateMember { .. })));
        let ok = AnyType::struct_from("S", [("a", AnyType::INT8), ("b", AnyType::INT16)]).unwrap();
        assert_eq!(ok.number_of_members(), 2);
    }

    #[test]
    fn test_field_lookup() {
        let ty = record();
        assert_eq!(ty.field("id").unwrap(), &AnyType::STRING);
        assert_eq!(ty.field("items[].c").unwrap(), &AnyType::FLOAT64);
        assert_eq!(ty.field("items.[]c").unwrap(), &AnyType::FLOAT64);
        assert_eq!(ty["items[]"].type_name(), "Inner");
        assert!(ty.has_field("items[]."));
        assert!(!ty.has_field("items[0]"));
        assert!(!ty.has_field("missing"));
        assert!(!ty.has_field(".id"));
        assert!(matches!(ty.field("nope"), Err(Error::FieldNotFound { .. })));
    }

    #[test]
    #[should_panic]
    fn test_index_panics_on_missing_field() {
        let ty = record();
        let _ = &ty["missing"];
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(record(), record());
        let a = AnyType::array(3, AnyType::INT8, "A").unwrap();
        assert_ne!(a, AnyType::array(4, AnyType::INT8, "A").unwrap());
        assert_ne!(a, AnyType::array(3, AnyType::INT8, "B").unwrap());
        assert_ne!(a, AnyType::array(3, AnyType::UINT8, "A").unwrap());

        let mut s1 = AnyType::structure("S");
        s1.add_member("a", AnyType::INT8).unwrap().add_member("b", AnyType::INT8).unwrap();
        let mut s2 = AnyType::structure("S");
        s2.add_member("b", AnyType::INT8).unwrap().add_member("a", AnyType::INT8).unwrap();
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_array_type_shares_element() {
        let element = AnyType::struct_from("Pt", [("x", AnyType::FLOAT64)]).unwrap();
        let at = ArrayType::new(2, element, "Pts").unwrap();
        let copy = at.clone();
        assert!(Arc::ptr_eq(&at.element, &copy.element));
        assert_eq!(copy, at);
        drop(at);
        assert_eq!(copy.element_type().type_name(), "Pt");
    }

    #[test]
    fn test_deep_struct_clone_eq_drop() {
        let mut ty = AnyType::BOOL;
        for _ in 0..100_000 {
            ty = AnyType::struct_from("S", [("m", ty)]).unwrap();
        }
        let copy = ty.clone();
        assert!(copy == ty);

        let mut other = AnyType::INT8;
        for _ in 0..100_000 {
            other = AnyType::struct_from("S", [("m", other)]).unwrap();
        }
        assert!(other != ty);
        drop(copy);
        drop(ty);
    }

    #[test]
    fn test_names_and_sizes() {
        let ty = record();
        assert_eq!(ty.type_name(), "Record");
        assert_eq!(AnyType::UINT32.type_name(), "uint32");
        assert_eq!(AnyType::EMPTY.type_name(), "empty");
        assert_eq!(ty["items"].number_of_elements(), 3);
        assert_eq!(AnyType::leaf(TypeKind::Struct), None);
        assert_eq!(AnyType::leaf(TypeKind::Int64), Some(AnyType::INT64));
    }
}
