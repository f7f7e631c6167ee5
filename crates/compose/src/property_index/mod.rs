//! Property indexing.
//!
//! # Role
//!
//! A [`PropertyIndex`] lists every spec that contributes an opinion to one
//! composed property, strongest first, together with the node each spec was
//! found through.
//!
//! # Invariants
//!
//! - All accepted specs share the spec type of the first spec found in a
//!   weak-to-strong walk; attributes also share its value type.
//! - In hierarchical mode a private opinion at a node excludes every spec
//!   from the nodes beneath it. Each excluded spec is reported once.
//! - Errors are accumulated; gathering never stops early.

mod permissions;

use std::sync::Arc;

use lamina_layer::SpecHandle;
use lamina_primitives::{Path, SpecType, Variability};
use rustc_hash::FxHashMap;

pub use self::permissions::PermissionState;
use self::permissions::node_entry_states;
use crate::error::CompositionError;
use crate::graph::{NodeId, NodeRef};
use crate::prim_index::{CompositionCache, PrimIndex};

/// How nodes are walked when gathering specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherMode {
	/// Walk the node hierarchy and enforce permissions.
	Hierarchical,
	/// Walk contributing nodes directly without permission enforcement.
	Flattened,
}

impl GatherMode {
	/// Returns the mode matching a cache's flattening setting.
	pub fn for_cache(cache: &dyn CompositionCache) -> Self {
		if cache.is_usd() { Self::Flattened } else { Self::Hierarchical }
	}
}

/// One contributing spec and the node it was found through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
	pub spec: SpecHandle,
	pub node: NodeRef,
}

impl PropertyInfo {
	/// Returns true if the spec comes from the root node's layer stack.
	pub fn is_local(&self) -> bool {
		self.node.is_root_node()
	}
}

/// The composed spec stack of a property.
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
	infos: Vec<PropertyInfo>,
	local_errors: Vec<CompositionError>,
}

impl PropertyIndex {
	/// Returns contributing specs, strongest first.
	pub fn iter(&self) -> std::slice::Iter<'_, PropertyInfo> {
		self.infos.iter()
	}

	/// Returns contributing specs, weakest first.
	pub fn iter_weak_to_strong(&self) -> std::iter::Rev<std::slice::Iter<'_, PropertyInfo>> {
		self.infos.iter().rev()
	}

	/// Returns the strongest spec.
	pub fn strongest(&self) -> Option<&PropertyInfo> {
		self.infos.first()
	}

	pub fn len(&self) -> usize {
		self.infos.len()
	}

	pub fn is_empty(&self) -> bool {
		self.infos.is_empty()
	}

	/// Returns how many specs come from the root node.
	pub fn num_local_specs(&self) -> usize {
		self.infos.iter().filter(|info| info.is_local()).count()
	}

	/// Returns the errors found while gathering this property.
	pub fn local_errors(&self) -> &[CompositionError] {
		&self.local_errors
	}
}

impl<'a> IntoIterator for &'a PropertyIndex {
	type Item = &'a PropertyInfo;
	type IntoIter = std::slice::Iter<'a, PropertyInfo>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Specs found per node, both strongest first.
type NodeSpecs = Vec<(NodeRef, Vec<SpecHandle>)>;

/// Gathers the specs of `property_path` from the nodes of `prim_index`.
pub fn gather_property_specs(prim_index: &PrimIndex, property_path: &Path, mode: GatherMode) -> PropertyIndex {
	let Some(name) = property_path.name() else {
		return PropertyIndex::default();
	};

	let nodes: NodeSpecs = prim_index
		.nodes_strong_to_weak()
		.map(|node| {
			let specs = if node.can_contribute_specs() {
				let local_path = node.path().append_property(name);
				node.layer_stack()
					.layers()
					.iter()
					.filter_map(|layer| layer.property_at_path(&local_path))
					.collect()
			} else {
				Vec::new()
			};
			(node, specs)
		})
		.collect();

	compose(property_path, &nodes, mode)
}

/// Gathers the specs of a relational attribute from its relationship's index.
///
/// The attribute is looked up beside each relationship spec, with its path
/// translated into that spec's node namespace.
pub fn gather_relational_attribute_specs(
	relationship_index: &PropertyIndex,
	relational_attribute_path: &Path,
	mode: GatherMode,
) -> PropertyIndex {
	let Some(first) = relationship_index.strongest() else {
		return PropertyIndex::default();
	};

	let mut found: FxHashMap<NodeId, Vec<SpecHandle>> = FxHashMap::default();
	for info in relationship_index {
		let Some(local_path) = info.node.map_from_root(relational_attribute_path) else {
			continue;
		};
		if let Some(spec) = info.spec.layer().property_at_path(&local_path) {
			found.entry(info.node.id()).or_default().push(spec);
		}
	}

	let graph = Arc::clone(first.node.graph());
	let nodes: NodeSpecs = graph
		.strength_order()
		.iter()
		.map(|&id| {
			let node = NodeRef::new(graph.clone(), id);
			let specs = found.remove(&id).unwrap_or_default();
			(node, specs)
		})
		.collect();

	compose(relational_attribute_path, &nodes, mode)
}

/// Computes the property index for `path` through `cache`.
///
/// Relational attribute paths are composed from their relationship's index.
/// Local errors are also appended to `all_errors`.
pub fn build_property_index(
	path: &Path,
	cache: &dyn CompositionCache,
	all_errors: &mut Vec<CompositionError>,
) -> PropertyIndex {
	let mode = GatherMode::for_cache(cache);
	let index = if path.is_relational_attribute_path() {
		let Some(relationship_path) = path.parent().and_then(|target| target.parent()) else {
			return PropertyIndex::default();
		};
		let relationship_index = build_property_index(&relationship_path, cache, all_errors);
		gather_relational_attribute_specs(&relationship_index, path, mode)
	} else {
		let Some(prim_index) = cache.compute_prim_index(&path.prim_path()) else {
			tracing::trace!(%path, "no prim index for property");
			return PropertyIndex::default();
		};
		gather_property_specs(&prim_index, path, mode)
	};

	if !index.local_errors.is_empty() {
		tracing::warn!(%path, errors = index.local_errors.len(), "property composition errors");
		all_errors.extend(index.local_errors.iter().cloned());
	}
	index
}

/// The shape fixed by the first spec of a weak-to-strong walk.
struct Canonical {
	spec: SpecHandle,
	spec_type: Option<SpecType>,
	type_name: Option<Arc<str>>,
	variability: Variability,
}

enum Verdict {
	Accept,
	/// Accepted, but the error is reported if the spec is admitted.
	AcceptWithError(CompositionError),
	Reject(CompositionError),
}

impl Canonical {
	fn new(spec: &SpecHandle) -> Self {
		Self {
			spec: spec.clone(),
			spec_type: spec.spec_type(),
			type_name: spec.type_name(),
			variability: spec.variability(),
		}
	}

	fn check(&self, spec: &SpecHandle) -> Verdict {
		let spec_type = spec.spec_type();
		if spec_type != self.spec_type {
			return Verdict::Reject(CompositionError::InconsistentPropertyType {
				canonical: self.spec.clone(),
				canonical_type: self.spec_type.unwrap_or(SpecType::Attribute),
				conflicting: spec.clone(),
				conflicting_type: spec_type.unwrap_or(SpecType::Attribute),
			});
		}
		if spec_type != Some(SpecType::Attribute) {
			return Verdict::Accept;
		}

		let type_name = spec.type_name();
		if type_name != self.type_name {
			return Verdict::Reject(CompositionError::InconsistentAttributeType {
				canonical: self.spec.clone(),
				canonical_type: self.type_name.clone().unwrap_or_default(),
				conflicting: spec.clone(),
				conflicting_type: type_name.unwrap_or_default(),
			});
		}
		let variability = spec.variability();
		if variability != self.variability {
			return Verdict::AcceptWithError(CompositionError::InconsistentAttributeVariability {
				canonical: self.spec.clone(),
				canonical_variability: self.variability,
				conflicting: spec.clone(),
				conflicting_variability: variability,
			});
		}
		Verdict::Accept
	}
}

/// Walks `nodes` weak-to-strong, checking consistency and permissions.
fn compose(property: &Path, nodes: &NodeSpecs, mode: GatherMode) -> PropertyIndex {
	let entry_states = match mode {
		GatherMode::Hierarchical => Some(node_entry_states(nodes)),
		GatherMode::Flattened => None,
	};

	let mut canonical: Option<Canonical> = None;
	let mut accumulated = Vec::new();
	let mut errors = Vec::new();

	for (node, specs) in nodes.iter().rev() {
		let admits = entry_states
			.as_ref()
			.and_then(|states| states.get(&node.id()))
			.is_none_or(|state| state.admits_opinions());

		for spec in specs.iter().rev() {
			let verdict = match &canonical {
				Some(canonical) => canonical.check(spec),
				None => {
					canonical = Some(Canonical::new(spec));
					Verdict::Accept
				}
			};
			let warning = match verdict {
				Verdict::Reject(error) => {
					errors.push(error);
					continue;
				}
				Verdict::AcceptWithError(error) => Some(error),
				Verdict::Accept => None,
			};

			if !admits {
				errors.push(CompositionError::PropertyPermissionDenied {
					property: property.clone(),
					spec: spec.clone(),
				});
				continue;
			}
			errors.extend(warning);
			accumulated.push(PropertyInfo {
				spec: spec.clone(),
				node: node.clone(),
			});
		}
	}

	accumulated.reverse();
	PropertyIndex {
		infos: accumulated,
		local_errors: errors,
	}
}

#[cfg(test)]
mod tests;
