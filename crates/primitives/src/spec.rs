use std::fmt;

/// The kind of object a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecType {
	/// The layer's pseudo-root.
	PseudoRoot,
	/// A prim.
	Prim,
	/// An attribute (typed value, optional connections).
	Attribute,
	/// A relationship (targets only).
	Relationship,
}

impl SpecType {
	/// Returns true for attributes and relationships.
	pub fn is_property(self) -> bool {
		matches!(self, Self::Attribute | Self::Relationship)
	}
}

impl fmt::Display for SpecType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::PseudoRoot => "pseudo-root",
			Self::Prim => "prim",
			Self::Attribute => "attribute",
			Self::Relationship => "relationship",
		})
	}
}

/// Visibility of an opinion to stronger composition arcs.
///
/// A private opinion forbids weaker opinions beneath it from contributing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Permission {
	#[default]
	Public,
	Private,
}

impl Permission {
	/// Combines two permissions; private wins.
	#[must_use]
	pub fn restrict(self, other: Self) -> Self {
		if self == Self::Private || other == Self::Private {
			Self::Private
		} else {
			Self::Public
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Public => "public",
			Self::Private => "private",
		})
	}
}

/// Whether an attribute may vary over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variability {
	#[default]
	Varying,
	Uniform,
}

impl fmt::Display for Variability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Varying => "varying",
			Self::Uniform => "uniform",
		})
	}
}
