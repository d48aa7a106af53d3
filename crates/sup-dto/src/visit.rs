//! Iterative depth-first traversal shared by printing and the codecs.
//!
//! [`walk`] keeps an explicit stack of frames instead of recursing, so
//! arbitrarily deep trees can be printed and serialized without growing the
//! call stack. For every node the visitor sees exactly one prolog/epilog pair,
//! and exactly one separator between adjacent siblings.

use crate::model::{AnyType, AnyValue, TypeNode, ValueNode};

/// Coarse node shape used to dispatch visitor callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Scalar,
    Struct,
    Array,
}

/// A tree node that [`walk`] can traverse.
pub trait VisitNode {
    fn node_kind(&self) -> NodeKind;

    /// Returns the child at `index` together with its member name (struct
    /// children only), or `None` once children are exhausted.
    fn child(&self, index: usize) -> Option<(Option<&str>, &Self)>;
}

/// Callbacks invoked by [`walk`]. Every method defaults to a no-op.
///
/// Separator callbacks receive the parent container; all other callbacks
/// receive the node being entered or left.
#[allow(unused_variables)]
pub trait TreeVisitor<N> {
    type Error;

    fn empty_prolog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn empty_epilog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn scalar_prolog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn scalar_epilog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn struct_prolog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn struct_epilog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn struct_member_separator(&mut self, parent: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn member_prolog(&mut self, node: &N, name: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn member_epilog(&mut self, node: &N, name: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn array_prolog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn array_epilog(&mut self, node: &N) -> Result<(), Self::Error> {
        Ok(())
    }

    fn array_element_separator(&mut self, parent: &N) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct Frame<'a, N> {
    node: &'a N,
    name: Option<&'a str>,
    next: usize,
}

fn enter<N: VisitNode, V: TreeVisitor<N>>(visitor: &mut V, node: &N) -> Result<(), V::Error> {
    match node.node_kind() {
        NodeKind::Empty => visitor.empty_prolog(node),
        NodeKind::Scalar => visitor.scalar_prolog(node),
        NodeKind::Struct => visitor.struct_prolog(node),
        NodeKind::Array => visitor.array_prolog(node),
    }
}

fn leave<N: VisitNode, V: TreeVisitor<N>>(visitor: &mut V, node: &N) -> Result<(), V::Error> {
    match node.node_kind() {
        NodeKind::Empty => visitor.empty_epilog(node),
        NodeKind::Scalar => visitor.scalar_epilog(node),
        NodeKind::Struct => visitor.struct_epilog(node),
        NodeKind::Array => visitor.array_epilog(node),
    }
}

/// Walks `root` depth-first, driving `visitor`.
///
/// The first visitor error aborts the walk and is returned as-is.
pub fn walk<N: VisitNode, V: TreeVisitor<N>>(root: &N, visitor: &mut V) -> Result<(), V::Error> {
    enter(visitor, root)?;
    let mut stack = vec![Frame {
        node: root,
        name: None,
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let parent = frame.node;
        let index = frame.next;
        match parent.child(index) {
            Some((name, child)) => {
                frame.next += 1;
                if index > 0 {
                    match parent.node_kind() {
                        NodeKind::Struct => visitor.struct_member_separator(parent)?,
                        _ => visitor.array_element_separator(parent)?,
                    }
                }
                if let Some(name) = name {
                    visitor.member_prolog(child, name)?;
                }
                enter(visitor, child)?;
                stack.push(Frame {
                    node: child,
                    name,
                    next: 0,
                });
            }
            None => {
                let name = frame.name;
                stack.pop();
                leave(visitor, parent)?;
                if let Some(name) = name {
                    visitor.member_epilog(parent, name)?;
                }
            }
        }
    }
    Ok(())
}

impl VisitNode for AnyType {
    fn node_kind(&self) -> NodeKind {
        match self.node() {
            TypeNode::Empty => NodeKind::Empty,
            TypeNode::Scalar(_) => NodeKind::Scalar,
            TypeNode::Struct(_) => NodeKind::Struct,
            TypeNode::Array(_) => NodeKind::Array,
        }
    }

    /// An array type has a single child: its element type.
    fn child(&self, index: usize) -> Option<(Option<&str>, &Self)> {
        match self.node() {
            TypeNode::Struct(st) => st
                .members()
                .get(index)
                .map(|(name, ty)| (Some(name.as_str()), ty)),
            TypeNode::Array(at) if index == 0 => Some((None, at.element_type())),
            _ => None,
        }
    }
}

impl VisitNode for AnyValue {
    fn node_kind(&self) -> NodeKind {
        match self.node() {
            ValueNode::Empty => NodeKind::Empty,
            ValueNode::Scalar(_) => NodeKind::Scalar,
            ValueNode::Struct(_) => NodeKind::Struct,
            ValueNode::Array(_) => NodeKind::Array,
        }
    }

    fn child(&self, index: usize) -> Option<(Option<&str>, &Self)> {
        match self.node() {
            ValueNode::Struct(sv) => sv
                .members()
                .get(index)
                .map(|(name, value)| (Some(name.as_str()), value)),
            ValueNode::Array(av) => av.elements().get(index).map(|value| (None, value)),
            _ => None,
        }
    }
}
