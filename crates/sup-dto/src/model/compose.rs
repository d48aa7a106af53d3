//! Push-down composer for building trees from a stream of events.
//!
//! [`Composer`] keeps a stack of partially built containers. Leaves and
//! finished containers are attached to the container on top of the stack, or
//! become the root when the stack is empty. The same machine backs the
//! public [`AnyTypeComposer`]/[`AnyValueComposer`] builders and the binary and
//! JSON parsers.

use std::mem;

use crate::error::{Error, Result};
use crate::model::ty::{AnyType, ArrayType};
use crate::model::value::AnyValue;

/// A tree node that can be assembled by [`Composer`].
pub trait ComposeNode: Sized {
    /// Data needed to finish a struct (its name).
    type StructHeader;
    /// Data needed to finish an array.
    type ArrayHeader;

    fn finish_struct(header: Self::StructHeader, members: Vec<(String, Self)>) -> Result<Self>;

    fn finish_array(header: Self::ArrayHeader, items: Vec<Self>) -> Result<Self>;
}

/// Header of an array type under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayTypeHeader {
    pub name: String,
    pub size: usize,
}

impl ComposeNode for AnyType {
    type StructHeader = String;
    type ArrayHeader = ArrayTypeHeader;

    fn finish_struct(name: String, members: Vec<(String, AnyType)>) -> Result<AnyType> {
        AnyType::struct_from(name, members)
    }

    /// The single item is the element type.
    fn finish_array(header: ArrayTypeHeader, mut items: Vec<AnyType>) -> Result<AnyType> {
        match (items.pop(), items.is_empty()) {
            (Some(element), true) => AnyType::array(header.size, element, header.name),
            _ => Err(Error::ComposerState {
                context: "array type needs exactly one element type",
            }),
        }
    }
}

/// Header of an array value under construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValueHeader {
    /// Fixed array typed after its first element.
    Inferred(String),
    /// Array of a known type; fixed sizes are enforced.
    Declared(ArrayType),
}

impl ComposeNode for AnyValue {
    type StructHeader = String;
    type ArrayHeader = ArrayValueHeader;

    fn finish_struct(name: String, members: Vec<(String, AnyValue)>) -> Result<AnyValue> {
        AnyValue::struct_from(name, members)
    }

    fn finish_array(header: ArrayValueHeader, items: Vec<AnyValue>) -> Result<AnyValue> {
        match header {
            ArrayValueHeader::Inferred(name) => AnyValue::array_from(items, name),
            ArrayValueHeader::Declared(ty) => AnyValue::from_array_parts(ty, items),
        }
    }
}

#[derive(Debug)]
enum MemberState {
    Closed,
    Open(String),
    Filled,
}

enum Frame<N: ComposeNode> {
    Struct {
        header: N::StructHeader,
        members: Vec<(String, N)>,
        member: MemberState,
    },
    Array {
        header: N::ArrayHeader,
        items: Vec<N>,
    },
}

fn state(context: &'static str) -> Error {
    Error::ComposerState { context }
}

/// Stack machine assembling one tree of `N`.
pub struct Composer<N: ComposeNode> {
    stack: Vec<Frame<N>>,
    root: Option<N>,
}

impl<N: ComposeNode> Default for Composer<N> {
    fn default() -> Self {
        Composer {
            stack: Vec::new(),
            root: None,
        }
    }
}

impl<N: ComposeNode> Composer<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once a root node has been completed.
    pub fn is_complete(&self) -> bool {
        self.stack.is_empty() && self.root.is_some()
    }

    /// Name of the member currently awaiting its value, if any.
    pub fn open_member(&self) -> Option<&str> {
        match self.stack.last() {
            Some(Frame::Struct {
                member: MemberState::Open(name),
                ..
            }) => Some(name),
            _ => None,
        }
    }

    fn check_accepts_node(&self) -> Result<()> {
        match self.stack.last() {
            None if self.root.is_some() => Err(state("root node already complete")),
            None | Some(Frame::Array { .. }) => Ok(()),
            Some(Frame::Struct {
                member: MemberState::Open(_),
                ..
            }) => Ok(()),
            Some(Frame::Struct { .. }) => Err(state("struct content outside a member")),
        }
    }

    fn attach(&mut self, node: N) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                if self.root.is_some() {
                    return Err(state("root node already complete"));
                }
                self.root = Some(node);
            }
            Some(Frame::Struct {
                members, member, ..
            }) => match mem::replace(member, MemberState::Filled) {
                MemberState::Open(name) => members.push((name, node)),
                previous => {
                    *member = previous;
                    return Err(state("struct content outside a member"));
                }
            },
            Some(Frame::Array { items, .. }) => items.push(node),
        }
        Ok(())
    }

    /// Adds a complete node (a leaf or a prebuilt subtree).
    pub fn leaf(&mut self, node: N) -> Result<()> {
        self.check_accepts_node()?;
        self.attach(node)
    }

    pub fn start_struct(&mut self, header: N::StructHeader) -> Result<()> {
        self.check_accepts_node()?;
        self.stack.push(Frame::Struct {
            header,
            members: Vec::new(),
            member: MemberState::Closed,
        });
        Ok(())
    }

    pub fn start_member(&mut self, name: impl Into<String>) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Struct { member, .. }) if matches!(member, MemberState::Closed) => {
                *member = MemberState::Open(name.into());
                Ok(())
            }
            Some(Frame::Struct { .. }) => Err(state("previous member not ended")),
            _ => Err(state("member outside a struct")),
        }
    }

    pub fn end_member(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Struct { member, .. }) if matches!(member, MemberState::Filled) => {
                *member = MemberState::Closed;
                Ok(())
            }
            Some(Frame::Struct {
                member: MemberState::Open(_),
                ..
            }) => Err(state("member has no value")),
            _ => Err(state("no member to end")),
        }
    }

    pub fn end_struct(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Struct {
                header,
                members,
                member: MemberState::Closed,
            }) => {
                let node = N::finish_struct(header, members)?;
                self.attach(node)
            }
            Some(frame @ Frame::Struct { .. }) => {
                self.stack.push(frame);
                Err(state("struct ended inside a member"))
            }
            Some(frame) => {
                self.stack.push(frame);
                Err(state("no struct to end"))
            }
            None => Err(state("no struct to end")),
        }
    }

    pub fn start_array(&mut self, header: N::ArrayHeader) -> Result<()> {
        self.check_accepts_node()?;
        self.stack.push(Frame::Array {
            header,
            items: Vec::new(),
        });
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array { header, items }) => {
                let node = N::finish_array(header, items)?;
                self.attach(node)
            }
            Some(frame) => {
                self.stack.push(frame);
                Err(state("no array to end"))
            }
            None => Err(state("no array to end")),
        }
    }

    /// Returns the completed root.
    pub fn finish(self) -> Result<N> {
        match (self.stack.is_empty(), self.root) {
            (true, Some(root)) => Ok(root),
            _ => Err(state("tree is incomplete")),
        }
    }
}

/// Fluent builder for [`AnyType`] trees.
#[derive(Default)]
pub struct AnyTypeComposer {
    inner: Composer<AnyType>,
}

impl AnyTypeComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_struct(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.inner.start_struct(name.into())?;
        Ok(self)
    }

    pub fn end_struct(&mut self) -> Result<&mut Self> {
        self.inner.end_struct()?;
        Ok(self)
    }

    pub fn start_member(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.inner.start_member(name)?;
        Ok(self)
    }

    pub fn end_member(&mut self) -> Result<&mut Self> {
        self.inner.end_member()?;
        Ok(self)
    }

    /// Adds a member of a complete type.
    pub fn add_member(&mut self, name: impl Into<String>, ty: AnyType) -> Result<&mut Self> {
        self.inner.start_member(name)?;
        self.inner.leaf(ty)?;
        self.inner.end_member()?;
        Ok(self)
    }

    /// Starts an array type; the next added type is its element type.
    pub fn start_array(&mut self, name: impl Into<String>, size: usize) -> Result<&mut Self> {
        self.inner.start_array(ArrayTypeHeader {
            name: name.into(),
            size,
        })?;
        Ok(self)
    }

    pub fn end_array(&mut self) -> Result<&mut Self> {
        self.inner.end_array()?;
        Ok(self)
    }

    /// Adds a complete type at the current position.
    pub fn add_type(&mut self, ty: AnyType) -> Result<&mut Self> {
        self.inner.leaf(ty)?;
        Ok(self)
    }

    pub fn finish(self) -> Result<AnyType> {
        self.inner.finish()
    }
}

/// Fluent builder for [`AnyValue`] trees.
#[derive(Default)]
pub struct AnyValueComposer {
    inner: Composer<AnyValue>,
}

impl AnyValueComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_struct(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.inner.start_struct(name.into())?;
        Ok(self)
    }

    pub fn end_struct(&mut self) -> Result<&mut Self> {
        self.inner.end_struct()?;
        Ok(self)
    }

    pub fn start_member(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.inner.start_member(name)?;
        Ok(self)
    }

    pub fn end_member(&mut self) -> Result<&mut Self> {
        self.inner.end_member()?;
        Ok(self)
    }

    /// Adds a member holding a complete value.
    pub fn add_member(&mut self, name: impl Into<String>, value: AnyValue) -> Result<&mut Self> {
        self.inner.start_member(name)?;
        self.inner.leaf(value)?;
        self.inner.end_member()?;
        Ok(self)
    }

    /// Starts a fixed array whose element type is taken from its first
    /// element. It must receive at least one element.
    pub fn start_array(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.inner
            .start_array(ArrayValueHeader::Inferred(name.into()))?;
        Ok(self)
    }

    /// Starts an unbounded array of the given element type.
    pub fn start_unbounded_array(
        &mut self,
        element_type: AnyType,
        name: impl Into<String>,
    ) -> Result<&mut Self> {
        let ty = ArrayType::new(0, element_type, name)?;
        self.inner.start_array(ArrayValueHeader::Declared(ty))?;
        Ok(self)
    }

    pub fn end_array(&mut self) -> Result<&mut Self> {
        self.inner.end_array()?;
        Ok(self)
    }

    /// Adds a complete value at the current position.
    pub fn add_value(&mut self, value: AnyValue) -> Result<&mut Self> {
        self.inner.leaf(value)?;
        Ok(self)
    }

    pub fn finish(self) -> Result<AnyValue> {
        self.inner.finish()
    }
}
