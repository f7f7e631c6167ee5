use std::fmt;
use std::sync::Arc;

use lamina_primitives::{ListOp, Path, Permission, Variability};

/// Names of the fields the composition engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
	/// Declared value type of an attribute (`float`, `token`, ...).
	TypeName,
	/// Attribute variability.
	Variability,
	/// Opinion permission.
	Permission,
	/// Relationship target list op.
	TargetPaths,
	/// Attribute connection list op.
	ConnectionPaths,
	/// Sublayer asset paths, strongest first (pseudo-root only).
	SubLayers,
	/// Source to target relocations (pseudo-root only).
	Relocates,
}

impl FieldKey {
	/// Returns the authored field name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::TypeName => "typeName",
			Self::Variability => "variability",
			Self::Permission => "permission",
			Self::TargetPaths => "targetPaths",
			Self::ConnectionPaths => "connectionPaths",
			Self::SubLayers => "subLayers",
			Self::Relocates => "layerRelocates",
		}
	}
}

impl fmt::Display for FieldKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The value of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Interned-style string token.
	Token(Arc<str>),
	/// Opinion permission.
	Permission(Permission),
	/// Attribute variability.
	Variability(Variability),
	/// Path list op (targets or connections).
	PathListOp(ListOp<Path>),
	/// Ordered string list.
	StringVec(Vec<String>),
	/// Relocation pairs, source first.
	Relocates(Vec<(Path, Path)>),
}

impl Value {
	/// Returns the token if this is a `Token` variant.
	pub fn as_token(&self) -> Option<&str> {
		match self {
			Value::Token(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the list op if this is a `PathListOp` variant.
	pub fn as_path_list_op(&self) -> Option<&ListOp<Path>> {
		match self {
			Value::PathListOp(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the type name of this value.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Token(_) => "token",
			Value::Permission(_) => "permission",
			Value::Variability(_) => "variability",
			Value::PathListOp(_) => "pathListOp",
			Value::StringVec(_) => "string[]",
			Value::Relocates(_) => "relocates",
		}
	}
}

impl From<Permission> for Value {
	fn from(v: Permission) -> Self {
		Value::Permission(v)
	}
}

impl From<Variability> for Value {
	fn from(v: Variability) -> Self {
		Value::Variability(v)
	}
}

impl From<ListOp<Path>> for Value {
	fn from(v: ListOp<Path>) -> Self {
		Value::PathListOp(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Token(v.into())
	}
}

// Seal the FromFieldValue trait to prevent external implementations.
mod sealed {
	pub trait Sealed {}
	impl Sealed for std::sync::Arc<str> {}
	impl Sealed for lamina_primitives::Permission {}
	impl Sealed for lamina_primitives::Variability {}
	impl Sealed for lamina_primitives::ListOp<lamina_primitives::Path> {}
	impl Sealed for Vec<String> {}
	impl Sealed for Vec<(lamina_primitives::Path, lamina_primitives::Path)> {}
}

/// Types that can be extracted from a [`Value`].
pub trait FromFieldValue: sealed::Sealed + Sized {
	/// Extracts the value, returning `None` if the variant doesn't match.
	fn from_field(value: &Value) -> Option<Self>;
}

impl FromFieldValue for Arc<str> {
	fn from_field(value: &Value) -> Option<Self> {
		match value {
			Value::Token(v) => Some(v.clone()),
			_ => None,
		}
	}
}

impl FromFieldValue for Permission {
	fn from_field(value: &Value) -> Option<Self> {
		match value {
			Value::Permission(v) => Some(*v),
			_ => None,
		}
	}
}

impl FromFieldValue for Variability {
	fn from_field(value: &Value) -> Option<Self> {
		match value {
			Value::Variability(v) => Some(*v),
			_ => None,
		}
	}
}

impl FromFieldValue for ListOp<Path> {
	fn from_field(value: &Value) -> Option<Self> {
		value.as_path_list_op().cloned()
	}
}

impl FromFieldValue for Vec<String> {
	fn from_field(value: &Value) -> Option<Self> {
		match value {
			Value::StringVec(v) => Some(v.clone()),
			_ => None,
		}
	}
}

impl FromFieldValue for Vec<(Path, Path)> {
	fn from_field(value: &Value) -> Option<Self> {
		match value {
			Value::Relocates(v) => Some(v.clone()),
			_ => None,
		}
	}
}
