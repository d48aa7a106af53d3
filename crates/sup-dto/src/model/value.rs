//! Values: a shape (mirroring [`AnyType`]) together with its data.
//!
//! # Constraints
//!
//! Each node carries a [`Constraints`] flag. Array elements are always
//! [`Constraints::LockedType`]; struct members inherit their parent's flag.
//! A locked struct cannot grow new members, which keeps all elements of an
//! array congruent with the array's element type.
//!
//! # Assignment
//!
//! Assigning into an empty value adopts the source's shape. Every other
//! assignment keeps the destination's shape and converts the source's data
//! into it, or fails without touching the destination.

use std::convert::Infallible;
use std::mem;
use std::ops::{Deref, Index};

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::model::convert::{convert_scalar, decrement, increment};
use crate::model::path::{parse_value_path, validate_member_name, PathSegment};
use crate::model::scalar::{Char8, Scalar, ScalarType};
use crate::model::ty::{AnyType, ArrayType, StructType, TypeNode};
use crate::model::TypeKind;
use crate::visit::{walk, TreeVisitor};

/// Whether a node's shape may still change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Constraints {
    #[default]
    Default,
    /// The node's shape is fixed by its parent.
    LockedType,
}

/// A dynamically shaped value.
///
/// Equality compares shape and data; constraint flags are ignored. Cloning
/// copies the flags as they are. Cloning, comparing and dropping use an
/// explicit stack, so the depth of a value is not limited by the call stack.
#[derive(Debug, Default)]
pub struct AnyValue {
    node: ValueNode,
    constraints: Constraints,
}

/// The shape and data of an [`AnyValue`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueNode {
    #[default]
    Empty,
    Scalar(Scalar),
    Struct(StructValue),
    Array(ArrayValue),
}

/// A struct value: type name plus ordered, uniquely named members.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    name: String,
    members: Vec<(String, AnyValue)>,
}

/// An array value together with its declared type.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    ty: ArrayType,
    elements: Vec<AnyValue>,
}

impl StructValue {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[(String, AnyValue)] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&AnyValue> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut AnyValue> {
        self.members
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl ArrayValue {
    pub fn name(&self) -> &str {
        self.ty.name()
    }

    /// The declared array type.
    pub fn array_type(&self) -> &ArrayType {
        &self.ty
    }

    pub fn elements(&self) -> &[AnyValue] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Array equality only compares the element sequence.
impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl PartialEq for AnyValue {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            match (&left.node, &right.node) {
                (ValueNode::Empty, ValueNode::Empty) => {}
                (ValueNode::Scalar(l), ValueNode::Scalar(r)) if l == r => {}
                (ValueNode::Struct(l), ValueNode::Struct(r))
                    if l.name == r.name && l.members.len() == r.members.len() =>
                {
                    for ((ln, lv), (rn, rv)) in l.members.iter().zip(&r.members) {
                        if ln != rn {
                            return false;
                        }
                        pending.push((lv, rv));
                    }
                }
                (ValueNode::Array(l), ValueNode::Array(r)) if l.len() == r.len() => {
                    pending.extend(l.elements.iter().zip(&r.elements));
                }
                _ => return false,
            }
        }
        true
    }
}

/// A struct or array whose children are still being copied.
enum CloneFrame<'a> {
    Struct(&'a StructValue, Vec<(String, AnyValue)>, Constraints),
    Array(&'a ArrayValue, Vec<AnyValue>, Constraints),
}

impl CloneFrame<'_> {
    fn finish(self) -> AnyValue {
        match self {
            CloneFrame::Struct(source, members, constraints) => AnyValue {
                node: ValueNode::Struct(StructValue {
                    name: source.name.clone(),
                    members,
                }),
                constraints,
            },
            CloneFrame::Array(source, elements, constraints) => AnyValue {
                node: ValueNode::Array(ArrayValue {
                    ty: source.ty.clone(),
                    elements,
                }),
                constraints,
            },
        }
    }
}

impl Clone for AnyValue {
    fn clone(&self) -> Self {
        let mut frames: Vec<CloneFrame<'_>> = Vec::new();
        let mut next = self;
        loop {
            let constraints = next.constraints;
            let mut finished = match &next.node {
                ValueNode::Struct(sv) => {
                    let members = Vec::with_capacity(sv.members.len());
                    frames.push(CloneFrame::Struct(sv, members, constraints));
                    None
                }
                ValueNode::Array(av) => {
                    let elements = Vec::with_capacity(av.elements.len());
                    frames.push(CloneFrame::Array(av, elements, constraints));
                    None
                }
                ValueNode::Scalar(scalar) => Some(AnyValue {
                    node: ValueNode::Scalar(scalar.clone()),
                    constraints,
                }),
                ValueNode::Empty => Some(AnyValue {
                    node: ValueNode::Empty,
                    constraints,
                }),
            };
            loop {
                let Some(frame) = frames.last_mut() else {
                    return finished.unwrap_or_default();
                };
                let child = match frame {
                    CloneFrame::Struct(source, members, _) => {
                        let source = *source;
                        if let Some(value) = finished.take() {
                            let name = source.members[members.len()].0.clone();
                            members.push((name, value));
                        }
                        source.members.get(members.len()).map(|(_, member)| member)
                    }
                    CloneFrame::Array(source, elements, _) => {
                        let source = *source;
                        elements.extend(finished.take());
                        source.elements.get(elements.len())
                    }
                };
                if let Some(child) = child {
                    next = child;
                    break;
                }
                finished = frames.pop().map(CloneFrame::finish);
            }
        }
    }
}

impl AnyValue {
    /// Moves the owned children into `out`, leaving a shallow node.
    fn detach_children(&mut self, out: &mut Vec<AnyValue>) {
        match &mut self.node {
            ValueNode::Struct(sv) => out.extend(sv.members.drain(..).map(|(_, value)| value)),
            ValueNode::Array(av) => out.append(&mut av.elements),
            ValueNode::Empty | ValueNode::Scalar(_) => {}
        }
    }
}

impl Drop for AnyValue {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut value) = pending.pop() {
            value.detach_children(&mut pending);
        }
    }
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl AnyValue {
    /// Creates the empty value.
    pub fn empty() -> Self {
        AnyValue::default()
    }

    /// Creates a default-initialized value of the given type.
    ///
    /// Scalars are zero, strings empty, and fixed arrays hold `size` default
    /// elements. Unbounded arrays start with no elements.
    pub fn from_type(ty: &AnyType) -> Self {
        let mut builder = DefaultBuilder::default();
        let Ok(()) = walk(ty, &mut builder);
        let mut value = builder.done.unwrap_or_default();
        value.set_constraints(Constraints::Default);
        value
    }

    /// Creates a scalar value of `kind` from a native value, converting it.
    pub fn typed<T: ScalarType>(kind: TypeKind, native: T) -> Result<Self> {
        Ok(convert_scalar(&native.into_scalar(), kind)?.into())
    }

    /// Creates a struct value without members.
    pub fn structure(name: impl Into<String>) -> Self {
        ValueNode::Struct(StructValue {
            name: name.into(),
            members: Vec::new(),
        })
        .into()
    }

    /// Creates a struct value from (name, value) pairs.
    pub fn struct_from<N, I>(name: impl Into<String>, members: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, AnyValue)>,
    {
        let mut sv = StructValue {
            name: name.into(),
            members: Vec::new(),
        };
        let mut seen = FxHashSet::default();
        for (member, value) in members {
            let member = member.into();
            validate_member_name(&member)?;
            if value.is_empty() {
                return Err(Error::EmptyMember { name: member });
            }
            if !seen.insert(member.clone()) {
                return Err(Error::DuplicateMember { name: member });
            }
            sv.members.push((member, value));
        }
        let mut value: AnyValue = ValueNode::Struct(sv).into();
        value.set_constraints(Constraints::Default);
        Ok(value)
    }

    /// Creates an empty unbounded array of the given element type.
    pub fn array(element_type: AnyType, name: impl Into<String>) -> Result<Self> {
        let ty = ArrayType::new(0, element_type, name)?;
        Ok(ValueNode::Array(ArrayValue {
            ty,
            elements: Vec::new(),
        })
        .into())
    }

    /// Creates a fixed array holding `elements`.
    ///
    /// The element type is taken from the first element; every element must
    /// have exactly that type.
    pub fn array_from(elements: Vec<AnyValue>, name: impl Into<String>) -> Result<Self> {
        let first = elements.first().ok_or(Error::EmptyArray)?;
        if first.is_empty() {
            return Err(Error::EmptyElementType);
        }
        let ty = ArrayType::new(elements.len(), first.get_type(), name)?;
        Self::from_array_parts(ty, elements)
    }

    /// Creates an array value of a declared type.
    ///
    /// Fixed arrays need exactly `size` elements, and every element must have
    /// the declared element type.
    pub fn from_array_parts(ty: ArrayType, mut elements: Vec<AnyValue>) -> Result<Self> {
        if !ty.is_unbounded() && elements.len() != ty.size() {
            return Err(Error::ShapeMismatch {
                context: "fixed array element count",
            });
        }
        if !elements.iter().all(|e| e.matches_type(ty.element_type())) {
            return Err(Error::ShapeMismatch {
                context: "array elements must have the element type",
            });
        }
        for element in &mut elements {
            element.set_constraints(Constraints::LockedType);
        }
        Ok(ValueNode::Array(ArrayValue { ty, elements }).into())
    }

    /// Sets this node's flag and propagates it: struct members inherit it,
    /// array elements are locked.
    fn set_constraints(&mut self, constraints: Constraints) {
        let mut stack = vec![(self, constraints)];
        while let Some((value, constraints)) = stack.pop() {
            value.constraints = constraints;
            match &mut value.node {
                ValueNode::Struct(sv) => {
                    stack.extend(sv.members.iter_mut().map(|(_, m)| (m, constraints)));
                }
                ValueNode::Array(av) => {
                    stack.extend(
                        av.elements
                            .iter_mut()
                            .map(|e| (e, Constraints::LockedType)),
                    );
                }
                ValueNode::Empty | ValueNode::Scalar(_) => {}
            }
        }
    }
}

impl From<ValueNode> for AnyValue {
    fn from(node: ValueNode) -> Self {
        AnyValue {
            node,
            constraints: Constraints::Default,
        }
    }
}

impl From<Scalar> for AnyValue {
    fn from(scalar: Scalar) -> Self {
        ValueNode::Scalar(scalar).into()
    }
}

macro_rules! impl_from_native {
    ($($native:ty),* $(,)?) => {
        $(
            impl From<$native> for AnyValue {
                fn from(value: $native) -> Self {
                    value.into_scalar().into()
                }
            }
        )*
    };
}

impl_from_native!(bool, Char8, i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, String);

impl From<&str> for AnyValue {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string()).into()
    }
}

/// Builds default values while walking a type.
#[derive(Default)]
struct DefaultBuilder {
    stack: Vec<Partial>,
    done: Option<AnyValue>,
}

enum Partial {
    Struct(StructValue),
    Array(ArrayType),
}

impl TreeVisitor<AnyType> for DefaultBuilder {
    type Error = Infallible;

    fn empty_prolog(&mut self, _: &AnyType) -> std::result::Result<(), Infallible> {
        self.done = Some(AnyValue::empty());
        Ok(())
    }

    fn scalar_prolog(&mut self, node: &AnyType) -> std::result::Result<(), Infallible> {
        self.done = Scalar::default_for(node.kind()).map(AnyValue::from);
        Ok(())
    }

    fn struct_prolog(&mut self, node: &AnyType) -> std::result::Result<(), Infallible> {
        self.stack.push(Partial::Struct(StructValue {
            name: node.type_name().to_string(),
            members: Vec::with_capacity(node.number_of_members()),
        }));
        Ok(())
    }

    fn member_epilog(&mut self, _: &AnyType, name: &str) -> std::result::Result<(), Infallible> {
        if let (Some(Partial::Struct(sv)), Some(value)) = (self.stack.last_mut(), self.done.take()) {
            sv.members.push((name.to_string(), value));
        }
        Ok(())
    }

    fn struct_epilog(&mut self, _: &AnyType) -> std::result::Result<(), Infallible> {
        if let Some(Partial::Struct(sv)) = self.stack.pop() {
            self.done = Some(ValueNode::Struct(sv).into());
        }
        Ok(())
    }

    fn array_prolog(&mut self, node: &AnyType) -> std::result::Result<(), Infallible> {
        if let Some(at) = node.as_array() {
            self.stack.push(Partial::Array(at.clone()));
        }
        Ok(())
    }

    fn array_epilog(&mut self, _: &AnyType) -> std::result::Result<(), Infallible> {
        if let Some(Partial::Array(ty)) = self.stack.pop() {
            let element = self.done.take().unwrap_or_default();
            let elements = vec![element; ty.size()];
            self.done = Some(ValueNode::Array(ArrayValue { ty, elements }).into());
        }
        Ok(())
    }
}

// =============================================================================
// INSPECTION
// =============================================================================

impl AnyValue {
    pub fn node(&self) -> &ValueNode {
        &self.node
    }

    pub fn constraints(&self) -> Constraints {
        self.constraints
    }

    pub fn is_locked(&self) -> bool {
        self.constraints == Constraints::LockedType
    }

    pub fn kind(&self) -> TypeKind {
        match &self.node {
            ValueNode::Empty => TypeKind::Empty,
            ValueNode::Scalar(s) => s.kind(),
            ValueNode::Struct(_) => TypeKind::Struct,
            ValueNode::Array(_) => TypeKind::Array,
        }
    }

    /// Returns the type name: the declared name for structs and arrays, the
    /// canonical kind name otherwise.
    pub fn type_name(&self) -> &str {
        match &self.node {
            ValueNode::Struct(sv) => &sv.name,
            ValueNode::Array(av) => av.ty.name(),
            _ => self.kind().name(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.node, ValueNode::Empty)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.node, ValueNode::Scalar(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.node, ValueNode::Struct(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.node, ValueNode::Array(_))
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.node {
            ValueNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar data for in-place updates that keep the kind.
    pub(crate) fn scalar_mut(&mut self) -> Option<&mut Scalar> {
        match &mut self.node {
            ValueNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match &self.node {
            ValueNode::Struct(sv) => Some(sv),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match &self.node {
            ValueNode::Array(av) => Some(av),
            _ => None,
        }
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.as_struct()
            .map(|sv| sv.members.iter().map(|(n, _)| n.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn number_of_members(&self) -> usize {
        self.as_struct().map_or(0, |sv| sv.members.len())
    }

    /// Current number of array elements (zero for non-arrays).
    pub fn number_of_elements(&self) -> usize {
        self.as_array().map_or(0, ArrayValue::len)
    }

    pub fn element_type(&self) -> Option<&AnyType> {
        self.as_array().map(|av| av.ty.element_type())
    }

    /// Reconstructs the type of this value.
    pub fn get_type(&self) -> AnyType {
        let mut frames: Vec<(&StructValue, StructType)> = Vec::new();
        let mut next = Some(self);
        loop {
            let mut finished = match next.take().map(|value| &value.node) {
                Some(ValueNode::Struct(sv)) => {
                    frames.push((sv, StructType::new(sv.name.clone())));
                    None
                }
                Some(ValueNode::Array(av)) => Some(AnyType::from(av.ty.clone())),
                Some(ValueNode::Scalar(s)) => Some(AnyType::scalar(s.kind())),
                Some(ValueNode::Empty) | None => Some(AnyType::EMPTY),
            };

            loop {
                let Some((sv, st)) = frames.last_mut() else {
                    return finished.unwrap_or_default();
                };
                let sv = *sv;
                if let Some(ty) = finished.take() {
                    let name = sv.members[st.members().len()].0.clone();
                    st.push_validated(name, ty);
                }
                if let Some((_, member)) = sv.members.get(st.members().len()) {
                    next = Some(member);
                    break;
                }
                finished = frames.pop().map(|(_, st)| AnyType::from(st));
            }
        }
    }

    /// Returns true if this value has exactly the shape of `ty`.
    pub fn matches_type(&self, ty: &AnyType) -> bool {
        let mut stack = vec![(self, ty)];
        while let Some((value, ty)) = stack.pop() {
            match (&value.node, ty.node()) {
                (ValueNode::Empty, TypeNode::Empty) => {}
                (ValueNode::Scalar(s), TypeNode::Scalar(kind)) if s.kind() == *kind => {}
                (ValueNode::Struct(sv), TypeNode::Struct(st)) => {
                    if sv.name != st.name() || sv.members.len() != st.members().len() {
                        return false;
                    }
                    for ((vn, v), (tn, t)) in sv.members.iter().zip(st.members()) {
                        if vn != tn {
                            return false;
                        }
                        stack.push((v, t));
                    }
                }
                (ValueNode::Array(av), TypeNode::Array(at)) if av.ty == *at => {}
                _ => return false,
            }
        }
        true
    }

    /// Returns true if `path` names an existing field. Never fails.
    pub fn has_field(&self, path: &str) -> bool {
        self.field(path).is_ok()
    }

    /// Looks up a nested value by path (`"a.b[2].c"`).
    pub fn field(&self, path: &str) -> Result<&AnyValue> {
        let mut current = self;
        for segment in parse_value_path(path)? {
            current = step(current, segment, path)?;
        }
        Ok(current)
    }

    /// Returns a checked mutable handle to a nested value.
    pub fn field_mut(&mut self, path: &str) -> Result<AnyValueMut<'_>> {
        let segments = parse_value_path(path)?;
        let mut current = self;
        for segment in segments {
            current = step_mut(current, segment, path)?;
        }
        Ok(AnyValueMut { value: current })
    }

    pub fn element(&self, index: usize) -> Result<&AnyValue> {
        let av = self.as_array().ok_or(Error::NotAnArray {
            operation: "element",
            found: self.kind(),
        })?;
        av.elements.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            size: av.elements.len(),
        })
    }

    pub fn element_mut(&mut self, index: usize) -> Result<AnyValueMut<'_>> {
        let found = self.kind();
        let ValueNode::Array(av) = &mut self.node else {
            return Err(Error::NotAnArray {
                operation: "element_mut",
                found,
            });
        };
        let size = av.elements.len();
        let value = av
            .elements
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, size })?;
        Ok(AnyValueMut { value })
    }

    /// Converts scalar data to a native type.
    pub fn as_scalar<T: ScalarType>(&self) -> Result<T> {
        let scalar = self.scalar().ok_or(Error::ScalarConversion {
            from: self.kind(),
            to: T::KIND,
        })?;
        let converted = convert_scalar(scalar, T::KIND)?;
        T::from_scalar(converted).ok_or(Error::ScalarConversion {
            from: scalar.kind(),
            to: T::KIND,
        })
    }

    /// Like [`as_scalar`](Self::as_scalar), discarding the error.
    pub fn try_as<T: ScalarType>(&self) -> Option<T> {
        self.as_scalar().ok()
    }
}

fn step<'v>(value: &'v AnyValue, segment: PathSegment<'_>, path: &str) -> Result<&'v AnyValue> {
    let child = match (segment, &value.node) {
        (PathSegment::Member(name), ValueNode::Struct(sv)) => sv.member(name),
        (PathSegment::Index(index), ValueNode::Array(av)) => {
            return av.elements.get(index).ok_or(Error::IndexOutOfBounds {
                index,
                size: av.elements.len(),
            });
        }
        _ => None,
    };
    child.ok_or_else(|| Error::FieldNotFound {
        path: path.to_string(),
    })
}

fn step_mut<'v>(
    value: &'v mut AnyValue,
    segment: PathSegment<'_>,
    path: &str,
) -> Result<&'v mut AnyValue> {
    let child = match (segment, &mut value.node) {
        (PathSegment::Member(name), ValueNode::Struct(sv)) => sv.member_mut(name),
        (PathSegment::Index(index), ValueNode::Array(av)) => {
            let size = av.elements.len();
            return av
                .elements
                .get_mut(index)
                .ok_or(Error::IndexOutOfBounds { index, size });
        }
        _ => None,
    };
    child.ok_or_else(|| Error::FieldNotFound {
        path: path.to_string(),
    })
}

// =============================================================================
// MUTATION
// =============================================================================

impl AnyValue {
    /// Appends a member to a struct value.
    ///
    /// Fails on locked structs (those nested in arrays), invalid or duplicate
    /// names and empty member values.
    pub fn add_member(&mut self, name: impl Into<String>, mut value: AnyValue) -> Result<&mut Self> {
        let found = self.kind();
        let constraints = self.constraints;
        let ValueNode::Struct(sv) = &mut self.node else {
            return Err(Error::NotAStruct {
                operation: "add_member",
                found,
            });
        };
        if constraints == Constraints::LockedType {
            return Err(Error::LockedType);
        }
        let name = name.into();
        validate_member_name(&name)?;
        if value.is_empty() {
            return Err(Error::EmptyMember { name });
        }
        if sv.member(&name).is_some() {
            return Err(Error::DuplicateMember { name });
        }
        value.set_constraints(constraints);
        sv.members.push((name, value));
        Ok(self)
    }

    /// Appends an element to an unbounded array value.
    ///
    /// A value of a different shape is converted into a default element of
    /// the array's element type; the array is unchanged if that fails.
    pub fn add_element(&mut self, value: AnyValue) -> Result<&mut Self> {
        let found = self.kind();
        let ValueNode::Array(av) = &mut self.node else {
            return Err(Error::NotAnArray {
                operation: "add_element",
                found,
            });
        };
        if !av.ty.is_unbounded() {
            return Err(Error::FixedArraySize { size: av.ty.size() });
        }
        if value.is_empty() {
            return Err(Error::EmptyElementType);
        }
        let mut element = if value.matches_type(av.ty.element_type()) {
            value
        } else {
            let mut converted = AnyValue::from_type(av.ty.element_type());
            converted.convert_from(&value)?;
            converted
        };
        element.set_constraints(Constraints::LockedType);
        av.elements.push(element);
        Ok(self)
    }

    /// Assigns `src` to this value.
    ///
    /// An empty, unlocked value adopts the shape of `src`. Otherwise the
    /// shape is kept and `src` must have the same shape (see
    /// [`convert_from`](Self::convert_from)).
    pub fn assign(&mut self, src: &AnyValue) -> Result<()> {
        if !self.is_empty() {
            return self.convert_from(src);
        }
        if src.is_empty() {
            return Ok(());
        }
        if self.is_locked() {
            return Err(Error::LockedType);
        }
        let mut adopted = src.clone();
        adopted.set_constraints(self.constraints);
        *self = adopted;
        Ok(())
    }

    /// Converts the data of `src` into this value's shape.
    ///
    /// Structs need the same member names in the same order, arrays the same
    /// length, and scalars convert through the checked scalar rules. The
    /// value is left untouched on failure.
    pub fn convert_from(&mut self, src: &AnyValue) -> Result<()> {
        let mut staged = self.node.clone();
        {
            let mut stack: Vec<(&mut ValueNode, &ValueNode)> = vec![(&mut staged, &src.node)];
            while let Some((dest, src)) = stack.pop() {
                match (dest, src) {
                    (ValueNode::Empty, ValueNode::Empty) => {}
                    (ValueNode::Scalar(d), ValueNode::Scalar(s)) => {
                        *d = convert_scalar(s, d.kind())?;
                    }
                    (ValueNode::Struct(d), ValueNode::Struct(s)) => {
                        let same_names = d.members.len() == s.members.len()
                            && d.members.iter().zip(&s.members).all(|((a, _), (b, _))| a == b);
                        if !same_names {
                            return Err(Error::ShapeMismatch {
                                context: "struct members differ",
                            });
                        }
                        stack.extend(
                            d.members
                                .iter_mut()
                                .zip(&s.members)
                                .map(|((_, dv), (_, sv))| (&mut dv.node, &sv.node)),
                        );
                    }
                    (ValueNode::Array(d), ValueNode::Array(s)) => {
                        if d.elements.len() != s.elements.len() {
                            return Err(Error::ShapeMismatch {
                                context: "array lengths differ",
                            });
                        }
                        stack.extend(
                            d.elements
                                .iter_mut()
                                .zip(&s.elements)
                                .map(|(dv, sv)| (&mut dv.node, &sv.node)),
                        );
                    }
                    _ => {
                        return Err(Error::ShapeMismatch {
                            context: "value shapes differ",
                        })
                    }
                }
            }
        }
        self.node = staged;
        Ok(())
    }

    /// Like [`assign`](Self::assign), reporting failure as `false`.
    pub fn try_assign(&mut self, src: &AnyValue) -> bool {
        self.assign(src).is_ok()
    }

    /// Like [`convert_from`](Self::convert_from), reporting failure as `false`.
    pub fn try_convert_from(&mut self, src: &AnyValue) -> bool {
        self.convert_from(src).is_ok()
    }

    /// Assigns a native scalar.
    pub fn set<T: ScalarType>(&mut self, native: T) -> Result<()> {
        self.assign(&native.into_scalar().into())
    }

    /// Moves the value out, leaving the empty value behind.
    ///
    /// A locked value keeps its shape, so it is copied instead. The returned
    /// value is always unlocked at the root.
    pub fn take(&mut self) -> AnyValue {
        let mut taken = if self.is_locked() {
            self.clone()
        } else {
            AnyValue::from(mem::take(&mut self.node))
        };
        taken.set_constraints(Constraints::Default);
        taken
    }
}

/// Panics if the path is malformed or names no field; use
/// [`AnyValue::field`] for a fallible lookup.
impl Index<&str> for AnyValue {
    type Output = AnyValue;

    fn index(&self, path: &str) -> &AnyValue {
        match self.field(path) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Panics if this is not an array or the index is out of bounds.
impl Index<usize> for AnyValue {
    type Output = AnyValue;

    fn index(&self, index: usize) -> &AnyValue {
        match self.element(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Mutable access to a nested value.
///
/// Only checked, shape-preserving updates are available, so a nested value
/// can never be replaced wholesale.
#[derive(Debug)]
pub struct AnyValueMut<'a> {
    value: &'a mut AnyValue,
}

impl Deref for AnyValueMut<'_> {
    type Target = AnyValue;

    fn deref(&self) -> &AnyValue {
        self.value
    }
}

impl<'a> AnyValueMut<'a> {
    pub fn assign(&mut self, src: &AnyValue) -> Result<()> {
        self.value.assign(src)
    }

    pub fn try_assign(&mut self, src: &AnyValue) -> bool {
        self.value.try_assign(src)
    }

    pub fn convert_from(&mut self, src: &AnyValue) -> Result<()> {
        self.value.convert_from(src)
    }

    pub fn try_convert_from(&mut self, src: &AnyValue) -> bool {
        self.value.try_convert_from(src)
    }

    pub fn set<T: ScalarType>(&mut self, native: T) -> Result<()> {
        self.value.set(native)
    }

    pub fn add_member(&mut self, name: impl Into<String>, value: AnyValue) -> Result<()> {
        self.value.add_member(name, value).map(|_| ())
    }

    pub fn add_element(&mut self, value: AnyValue) -> Result<()> {
        self.value.add_element(value).map(|_| ())
    }

    pub fn increment(&mut self) -> bool {
        increment(self.value)
    }

    pub fn decrement(&mut self) -> bool {
        decrement(self.value)
    }

    pub fn field_mut(&mut self, path: &str) -> Result<AnyValueMut<'_>> {
        self.value.field_mut(path)
    }

    pub fn element_mut(&mut self, index: usize) -> Result<AnyValueMut<'_>> {
        self.value.element_mut(index)
    }

    /// Consumes the handle, descending into a nested field.
    pub fn into_field_mut(self, path: &str) -> Result<AnyValueMut<'a>> {
        self.value.field_mut(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AnyValue {
        let mut value = AnyValue::structure("");
        value
            .add_member("id", "X1".into())
            .unwrap()
            .add_member("count", 3u32.into())
            .unwrap();
        value
    }

    fn point_type() -> AnyType {
        AnyType::struct_from("Point", [("x", AnyType::INT32), ("y", AnyType::INT32)]).unwrap()
    }

    #[test]
    fn test_from_type_defaults() {
        let list = AnyType::array(3, point_type(), "Points").unwrap();
        let mut ty = AnyType::structure("Shape");
        ty.add_member("name", AnyType::STRING)
            .unwrap()
            .add_member("points", list)
            .unwrap();

        let value = AnyValue::from_type(&ty);
        assert!(value.matches_type(&ty));
        assert_eq!(value.get_type(), ty);
        assert_eq!(value["points"].number_of_elements(), 3);
        assert_eq!(value["points[2].y"], AnyValue::from(0i32));
        assert_eq!(value["name"], AnyValue::from(""));

        assert_eq!(value.constraints(), Constraints::Default);
        assert_eq!(value["name"].constraints(), Constraints::Default);
        assert!(value["points[0]"].is_locked());
        assert!(value["points[0].x"].is_locked());
    }

    #[test]
    fn test_unbounded_array_from_type_is_empty() {
        let ty = AnyType::array(0, AnyType::UINT8, "Bytes").unwrap();
        let value = AnyValue::from_type(&ty);
        assert_eq!(value.number_of_elements(), 0);
        assert_eq!(value.get_type(), ty);
    }

    #[test]
    fn test_get_type_of_record() {
        let expected =
            AnyType::struct_from("", [("id", AnyType::STRING), ("count", AnyType::UINT32)])
                .unwrap();
        assert_eq!(record().get_type(), expected);
        assert_eq!(AnyValue::empty().get_type(), AnyType::EMPTY);
        assert_eq!(AnyValue::from(1.5f32).get_type(), AnyType::FLOAT32);
    }

    #[test]
    fn test_add_member_rules() {
        let mut value = record();
        assert!(matches!(
            value.add_member("id", 1i8.into()),
            Err(Error::DuplicateMember { .. })
        ));
        assert!(matches!(
            value.add_member("bad.name", 1i8.into()),
            Err(Error::InvalidMemberName { .. })
        ));
        assert!(matches!(
            value.add_member("e", AnyValue::empty()),
            Err(Error::EmptyMember { .. })
        ));
        let mut scalar = AnyValue::from(1i8);
        assert!(matches!(
            scalar.add_member("a", 1i8.into()),
            Err(Error::NotAStruct { .. })
        ));
    }

    #[test]
    fn test_locked_struct_cannot_grow() {
        let ty = AnyType::array(2, point_type(), "").unwrap();
        let mut value = AnyValue::from_type(&ty);
        let mut element = value.element_mut(0).unwrap();
        assert!(matches!(
            element.add_member("z", 1i32.into()),
            Err(Error::LockedType)
        ));
        assert_eq!(value[0].number_of_members(), 2);
    }

    #[test]
    fn test_add_element() {
        let mut list = AnyValue::array(AnyType::INT16, "L").unwrap();
        list.add_element(5i16.into()).unwrap();
        list.add_element(7u64.into()).unwrap();
        assert_eq!(list[1], AnyValue::from(7i16));
        assert!(list[1].is_locked());

        assert!(matches!(
            list.add_element(100_000i32.into()),
            Err(Error::ScalarConversion { .. })
        ));
        assert!(matches!(
            list.add_element("x".into()),
            Err(Error::ScalarConversion { .. })
        ));
        assert!(matches!(
            list.add_element(record()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            list.add_element(AnyValue::empty()),
            Err(Error::EmptyElementType)
        ));
        assert_eq!(list.number_of_elements(), 2);

        let mut fixed = AnyValue::array_from(vec![1i8.into()], "F").unwrap();
        assert!(matches!(
            fixed.add_element(2i8.into()),
            Err(Error::FixedArraySize { size: 1 })
        ));
    }

    #[test]
    fn test_array_from() {
        assert!(matches!(
            AnyValue::array_from(vec![], "A"),
            Err(Error::EmptyArray)
        ));
        assert!(matches!(
            AnyValue::array_from(vec![1i8.into(), 2u8.into()], "A"),
            Err(Error::ShapeMismatch { .. })
        ));
        let value = AnyValue::array_from(vec![record(), record()], "Records").unwrap();
        assert_eq!(value.get_type().number_of_elements(), 2);
        assert_eq!(value.type_name(), "Records");
    }

    #[test]
    fn test_array_equality_ignores_name() {
        let a = AnyValue::array_from(vec![1i8.into()], "A").unwrap();
        let b = AnyValue::array_from(vec![1i8.into()], "B").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.get_type(), b.get_type());
    }

    #[test]
    fn test_assign_adopts_shape_when_empty() {
        let mut value = AnyValue::empty();
        value.assign(&record()).unwrap();
        assert_eq!(value, record());
        assert_eq!(value.constraints(), Constraints::Default);
    }

    #[test]
    fn test_assign_keeps_shape() {
        let mut value = AnyValue::from(0u8);
        value.assign(&AnyValue::from(200i64)).unwrap();
        assert_eq!(value, AnyValue::from(200u8));
        assert!(value.assign(&AnyValue::from(-1i64)).is_err());
        assert_eq!(value, AnyValue::from(200u8));
        assert!(!value.try_assign(&record()));
        assert_eq!(value, AnyValue::from(200u8));
    }

    #[test]
    fn test_assign_is_atomic() {
        let mut dest = AnyValue::structure("S");
        dest.add_member("a", 1u8.into())
            .unwrap()
            .add_member("b", 2u8.into())
            .unwrap();
        let before = dest.clone();

        let mut src = AnyValue::structure("T");
        src.add_member("a", 10i32.into())
            .unwrap()
            .add_member("b", 1000i32.into())
            .unwrap();
        assert!(matches!(
            dest.assign(&src),
            Err(Error::ScalarConversion { .. })
        ));
        assert_eq!(dest, before);

        let mut ok = AnyValue::structure("T");
        ok.add_member("a", 10i32.into())
            .unwrap()
            .add_member("b", 20i32.into())
            .unwrap();
        dest.assign(&ok).unwrap();
        assert_eq!(dest["b"], AnyValue::from(20u8));
        assert_eq!(dest.type_name(), "S");
    }

    #[test]
    fn test_assign_member_order_matters() {
        let mut dest =
            AnyValue::struct_from("S", [("a", AnyValue::from(1u8)), ("b", 2u8.into())]).unwrap();
        let src =
            AnyValue::struct_from("S", [("b", AnyValue::from(1u8)), ("a", 2u8.into())]).unwrap();
        assert!(matches!(
            dest.assign(&src),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_convert_from_empty_dest() {
        let mut value = AnyValue::empty();
        assert!(value.convert_from(&AnyValue::from(1i8)).is_err());
        assert!(value.convert_from(&AnyValue::empty()).is_ok());
    }

    #[test]
    fn test_field_mut_updates_in_place() {
        let mut value = record();
        value.field_mut("count").unwrap().set(42i64).unwrap();
        assert_eq!(value["count"], AnyValue::from(42u32));

        let mut count = value.field_mut("count").unwrap();
        assert!(count.increment());
        assert_eq!(*count, AnyValue::from(43u32));
        assert!(!count.try_assign(&"x".into()));

        assert!(matches!(
            value.field_mut("missing"),
            Err(Error::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_field_index_errors() {
        let value = AnyValue::array_from(vec![1i8.into(), 2i8.into()], "A").unwrap();
        assert!(matches!(
            value.field("[5]"),
            Err(Error::IndexOutOfBounds { index: 5, size: 2 })
        ));
        assert!(matches!(value.field("[]"), Err(Error::InvalidPath { .. })));
        assert!(value.has_field("[1]"));
        assert!(!value.has_field("[1]x"));
        assert!(matches!(
            AnyValue::from(1i8).element(0),
            Err(Error::NotAnArray { .. })
        ));
    }

    #[test]
    #[should_panic]
    fn test_index_panics() {
        let _ = &record()["nope"];
    }

    #[test]
    fn test_scalar_access() {
        let value = AnyValue::from(300i32);
        assert_eq!(value.as_scalar::<i64>().unwrap(), 300);
        assert!(value.as_scalar::<u8>().is_err());
        assert_eq!(value.try_as::<u16>(), Some(300));
        assert_eq!(record().try_as::<u16>(), None);

        let typed = AnyValue::typed(TypeKind::Char8, 65i32).unwrap();
        assert_eq!(typed, AnyValue::from(Char8(b'A')));
        assert!(AnyValue::typed(TypeKind::Struct, 1i32).is_err());
    }

    #[test]
    fn test_scalar_equality_requires_same_kind() {
        assert_ne!(AnyValue::from(1u8), AnyValue::from(1i8));
        assert_ne!(AnyValue::from(1u8), AnyValue::from(Char8(1)));
        assert_eq!(AnyValue::from(1u8), AnyValue::from(1u8));
    }

    #[test]
    fn test_take() {
        let mut value = record();
        let taken = value.take();
        assert!(value.is_empty());
        assert_eq!(taken, record());

        let ty = AnyType::array(1, AnyType::INT8, "").unwrap();
        let mut list = AnyValue::from_type(&ty);
        let mut element = list.element_mut(0).unwrap();
        element.set(9i8).unwrap();
        assert_eq!(list[0], AnyValue::from(9i8));
    }

    #[test]
    fn test_clone_keeps_constraints() {
        let list = AnyValue::array_from(vec![record(), record()], "Records").unwrap();
        let copy = list.clone();
        assert_eq!(copy, list);
        assert_eq!(copy.constraints, Constraints::Default);
        assert_eq!(copy[1].constraints, Constraints::LockedType);
        assert_eq!(copy[1]["id"].constraints, Constraints::LockedType);
    }

    #[test]
    fn test_deep_value_clone_eq_drop() {
        fn deep(leaf: AnyType) -> AnyType {
            let mut ty = leaf;
            for level in 0..100_000 {
                ty = if level % 2 == 0 {
                    AnyType::struct_from("S", [("m", ty)]).unwrap()
                } else {
                    AnyType::array(1, ty, "").unwrap()
                };
            }
            ty
        }
        let value = AnyValue::from_type(&deep(AnyType::UINT16));
        let copy = value.clone();
        assert!(copy == value);
        assert!(copy.get_type() == value.get_type());
        assert!(AnyValue::from_type(&deep(AnyType::INT16)) != value);
        drop(copy);
        drop(value);
    }
}
