//! The type/value tree model.

pub mod compose;
pub mod convert;
pub mod kind;
pub mod path;
pub mod registry;
pub mod scalar;
pub mod ty;
pub mod value;

pub use compose::{
    AnyTypeComposer, AnyValueComposer, ArrayTypeHeader, ArrayValueHeader, ComposeNode, Composer,
};
pub use convert::{
    compare, compare_scalars, convert, convert_scalar, decrement, increment, try_convert,
    CompareResult,
};
pub use kind::{TypeKind, SCALAR_KINDS};
pub use path::{split_field_name, PathSegment};
pub use registry::{leaf_type, AnyTypeRegistry};
pub use scalar::{Char8, Scalar, ScalarType};
pub use ty::{AnyType, ArrayType, StructType, TypeNode};
pub use value::{AnyValue, AnyValueMut, ArrayValue, Constraints, StructValue, ValueNode};
