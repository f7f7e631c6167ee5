//! Target indexing.
//!
//! # Role
//!
//! A [`TargetIndex`] is the composed list of relationship targets or
//! attribute connections of one property. It is built by applying the path
//! list op of every contributing spec, weakest first, to a single list, with
//! each authored path translated into the root namespace and validated.
//!
//! # Invariants
//!
//! - Composed paths are in the root namespace with variant selections removed.
//! - Every rejected path leaves exactly one error, keyed by the path it names.
//! - Deleting a composed path retracts any error recorded for it. Errors for
//!   paths that never reached the root namespace are only cleared by an
//!   explicit list op.
//! - An explicit list op discards every error recorded before it.

mod validation;

use indexmap::IndexMap;
use lamina_layer::{FieldKey, SpecHandle};
use lamina_primitives::{ListOpType, Path, SpecType};

use crate::error::CompositionError;
use crate::graph::{NodeId, NodeRef, Site};
use crate::prim_index::CompositionCache;
use crate::property_index::{PropertyIndex, PropertyInfo};

/// Which path field a target index composes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
	/// Attribute connections.
	Attribute,
	/// Relationship targets.
	Relationship,
}

impl SpecKind {
	/// Returns the kind for a property spec type.
	pub fn from_spec_type(spec_type: SpecType) -> Option<Self> {
		match spec_type {
			SpecType::Attribute => Some(Self::Attribute),
			SpecType::Relationship => Some(Self::Relationship),
			SpecType::Prim | SpecType::PseudoRoot => None,
		}
	}

	/// Returns the list op field holding the authored paths.
	pub fn field(self) -> FieldKey {
		match self {
			Self::Attribute => FieldKey::ConnectionPaths,
			Self::Relationship => FieldKey::TargetPaths,
		}
	}
}

/// Result of translating one authored path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
	/// The path in the root namespace.
	Translated(Path),
	/// The path was dropped for the given reason.
	Rejected(CompositionError),
}

/// Restrictions on which specs contribute to a target index.
#[derive(Debug, Clone, Default)]
pub struct TargetIndexFilter {
	/// Only use specs from the root node.
	pub local_only: bool,
	/// Stop at this spec.
	pub stop_property: Option<SpecHandle>,
	/// Apply `stop_property` before stopping.
	pub include_stop_property: bool,
}

/// What a recorded target error is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ErrorKey {
	/// A path in the root namespace; deletes of it retract the error.
	Composed(Path),
	/// A path as authored at a node that has no root namespace form.
	External { node: NodeId, authored: Path },
}

/// Composed target or connection paths of one property.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
	paths: Vec<Path>,
	local_errors: IndexMap<ErrorKey, CompositionError>,
	deleted_paths: Vec<Path>,
}

impl TargetIndex {
	/// Returns the composed paths in list order.
	pub fn paths(&self) -> &[Path] {
		&self.paths
	}

	pub fn into_paths(self) -> Vec<Path> {
		self.paths
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}

	/// Returns the errors still live after composition, in the order found.
	pub fn local_errors(&self) -> impl ExactSizeIterator<Item = &CompositionError> {
		self.local_errors.values()
	}

	/// Returns the error recorded for the composed path `path`, if any.
	pub fn error_for(&self, path: &Path) -> Option<&CompositionError> {
		self.local_errors.get(&ErrorKey::Composed(path.clone()))
	}

	/// Returns composed paths named by delete operations.
	pub fn deleted_paths(&self) -> &[Path] {
		&self.deleted_paths
	}
}

/// Builds the target index of the property at `site` from its property index.
///
/// Local errors are also appended to `all_errors`.
pub fn build_target_index(
	site: &Site,
	property_index: &PropertyIndex,
	spec_kind: SpecKind,
	cache: Option<&dyn CompositionCache>,
	all_errors: &mut Vec<CompositionError>,
) -> TargetIndex {
	build_filtered_target_index(
		site,
		property_index,
		spec_kind,
		&TargetIndexFilter::default(),
		cache,
		all_errors,
	)
}

/// Builds a target index from the specs selected by `filter`.
///
/// Without a cache, paths are only mapped to the root namespace; with one,
/// each target is also checked against the target prim's index.
pub fn build_filtered_target_index(
	site: &Site,
	property_index: &PropertyIndex,
	spec_kind: SpecKind,
	filter: &TargetIndexFilter,
	cache: Option<&dyn CompositionCache>,
	all_errors: &mut Vec<CompositionError>,
) -> TargetIndex {
	let field = spec_kind.field();
	let mut builder = Builder {
		property: &site.path,
		cache,
		errors: IndexMap::new(),
		deleted: Vec::new(),
	};
	let mut paths = Vec::new();

	for info in property_index.iter_weak_to_strong() {
		if filter.local_only && !info.is_local() {
			continue;
		}
		let is_stop = filter.stop_property.as_ref() == Some(&info.spec);
		if is_stop && !filter.include_stop_property {
			break;
		}

		if let Some(op) = info.spec.path_list_op(field)
			&& op.has_keys()
		{
			if op.is_explicit() {
				builder.errors.clear();
			}
			op.apply_operations(&mut paths, |op_type, authored| {
				match builder.translate(info, op_type, authored) {
					Translation::Translated(path) => Some(path),
					Translation::Rejected(error) => {
						builder.record(info.node.id(), error);
						None
					}
				}
			});
		}

		if is_stop {
			break;
		}
	}

	if !builder.errors.is_empty() {
		tracing::warn!(
			property = %site.path,
			errors = builder.errors.len(),
			"target composition errors"
		);
		all_errors.extend(builder.errors.values().cloned());
	}
	TargetIndex {
		paths,
		local_errors: builder.errors,
		deleted_paths: builder.deleted,
	}
}

struct Builder<'a> {
	property: &'a Path,
	cache: Option<&'a dyn CompositionCache>,
	errors: IndexMap<ErrorKey, CompositionError>,
	deleted: Vec<Path>,
}

impl Builder<'_> {
	fn translate(&mut self, info: &PropertyInfo, op_type: ListOpType, authored: &Path) -> Translation {
		let Some(target) = translate_to_root(&info.node, authored) else {
			return Translation::Rejected(CompositionError::InvalidExternalTargetPath {
				property: self.property.clone(),
				target: authored.clone(),
				spec: info.spec.clone(),
			});
		};

		if op_type == ListOpType::Deleted {
			if self.errors.shift_remove(&ErrorKey::Composed(target.clone())).is_some() {
				tracing::trace!(%target, "deleted target retracts its error");
			}
			if !self.deleted.contains(&target) {
				self.deleted.push(target.clone());
			}
			return Translation::Translated(target);
		}

		if let Some(cache) = self.cache
			&& let Some(error) = validation::validate_target(cache, self.property, info, &target)
		{
			return Translation::Rejected(error);
		}
		Translation::Translated(target)
	}

	fn record(&mut self, node: NodeId, error: CompositionError) {
		let key = match &error {
			CompositionError::InvalidExternalTargetPath { target, .. } => ErrorKey::External {
				node,
				authored: target.clone(),
			},
			other => match other.target() {
				Some(target) => ErrorKey::Composed(target.clone()),
				None => return,
			},
		};
		self.errors.insert(key, error);
	}
}

/// Maps an authored path from `node`'s namespace into the root namespace.
fn translate_to_root(node: &NodeRef, authored: &Path) -> Option<Path> {
	node.map_to_root(authored)
		.map(|path| path.strip_variant_selections())
}
