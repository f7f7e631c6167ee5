//! Checks a composed target against the target prim's index.

use std::sync::Arc;

use lamina_primitives::{Path, Permission};

use crate::error::CompositionError;
use crate::graph::{ArcType, NodeRef, Site};
use crate::prim_index::{CompositionCache, PrimIndex};
use crate::property_index::PropertyInfo;

/// Returns the error that makes `target` illegal for the spec in `info`.
pub(super) fn validate_target(
	cache: &dyn CompositionCache,
	property: &Path,
	info: &PropertyInfo,
	target: &Path,
) -> Option<CompositionError> {
	let target_prim = target.prim_path();
	if target_prim.is_absolute_root() {
		return None;
	}
	let Some(target_index) = cache.compute_prim_index(&target_prim) else {
		tracing::trace!(%target, "no prim index for target");
		return None;
	};

	if targets_instance_of_own_class(&info.node, &target_index) {
		return Some(CompositionError::InvalidInstanceTargetPath {
			property: property.clone(),
			target: target.clone(),
			spec: info.spec.clone(),
		});
	}

	if cache.is_usd() {
		return None;
	}
	scan_authoring_subtree(cache, &info.node, &target_index, &target_prim).map(|denial| match denial {
		Denial::Permission => CompositionError::TargetPermissionDenied {
			property: property.clone(),
			target: target.clone(),
			spec: info.spec.clone(),
		},
		Denial::Relocation => CompositionError::InvalidTargetPath {
			property: property.clone(),
			target: target.clone(),
			spec: info.spec.clone(),
		},
	})
}

/// Returns true if the target prim inherits from a class that the authoring
/// node, or one of its ancestors, was reached through.
fn targets_instance_of_own_class(authoring: &NodeRef, target_index: &PrimIndex) -> bool {
	let mut cursor = Some(authoring.clone());
	while let Some(node) = cursor {
		if node.arc_type() == ArcType::Inherit {
			let instance = target_index.nodes_strong_to_weak().any(|candidate| {
				candidate.arc_type() == ArcType::Inherit
					&& Arc::ptr_eq(candidate.layer_stack(), node.layer_stack())
					&& candidate.path().has_prefix(node.path())
			});
			if instance {
				return true;
			}
		}
		cursor = node.parent();
	}
	false
}

enum Denial {
	Permission,
	Relocation,
}

/// Looks for the authoring site in the target's index and checks the nodes
/// beneath it, excluding the site's own node.
fn scan_authoring_subtree(
	cache: &dyn CompositionCache,
	authoring: &NodeRef,
	target_index: &PrimIndex,
	target_prim: &Path,
) -> Option<Denial> {
	let local_prim = authoring.map_from_root(target_prim)?;
	let site = Site::new(authoring.layer_stack().clone(), local_prim);
	let Some(start) = target_index.node_using_site(&site) else {
		// Culled nodes are removed from the target's index; the target is
		// treated as legal.
		if cache.cull_culled_nodes() {
			tracing::trace!(?site, "authoring site not in target index");
		} else {
			tracing::warn!(?site, "authoring site not in target index");
		}
		return None;
	};

	// Skips the authoring site.
	for node in start.subtree().into_iter().skip(1) {
		if node.permission() == Permission::Private || node.is_restricted() {
			return Some(Denial::Permission);
		}
		if node.map_to_parent().map_source_to_target(node.path()).is_none() {
			return Some(Denial::Relocation);
		}
	}
	None
}
