//! Core scene description types: paths, list operations, and spec enums.

/// Ordered list-editing operations applied across layers.
pub mod list_op;
/// Scene namespace paths.
pub mod path;
/// Spec classification and opinion metadata.
pub mod spec;

pub use list_op::{DuplicateItemError, ListOp, ListOpType};
pub use path::{Element, Path, PathParseError};
pub use spec::{Permission, SpecType, Variability};
