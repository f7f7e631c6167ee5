use lamina_layer::SpecHandle;
use lamina_primitives::Permission;
use rustc_hash::FxHashMap;

use crate::graph::{NodeId, NodeRef};

/// Permission threaded through a composition walk.
///
/// `previous` governs whether opinions at the current node are admitted;
/// `current` collects the permissions seen at the current node and becomes
/// `previous` for the nodes beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionState {
	pub previous: Permission,
	pub current: Permission,
}

impl PermissionState {
	/// Rolls `current` into `previous` when a node boundary is crossed.
	#[must_use]
	pub fn advance_on_node_boundary(self, crossed: bool) -> Self {
		if crossed {
			Self {
				previous: self.current,
				current: self.current,
			}
		} else {
			self
		}
	}

	/// Folds an opinion's permission into `current`; private wins.
	#[must_use]
	pub fn fold(self, permission: Permission) -> Self {
		Self {
			previous: self.previous,
			current: self.current.restrict(permission),
		}
	}

	/// Returns true if opinions at this node may contribute.
	pub fn admits_opinions(self) -> bool {
		self.previous == Permission::Public
	}
}

/// Computes the permission state on entry to every node.
///
/// `nodes` must be in strength order so parents precede children. A node's
/// entry state is its parent's exit state advanced over the boundary; its exit
/// state folds in the node's own permission and, if the node admits
/// opinions, the permission of each of its specs.
pub(crate) fn node_entry_states(nodes: &[(NodeRef, Vec<SpecHandle>)]) -> FxHashMap<NodeId, PermissionState> {
	let mut entries = FxHashMap::default();
	let mut exits: FxHashMap<NodeId, PermissionState> = FxHashMap::default();
	for (node, specs) in nodes {
		let entry = node
			.parent()
			.and_then(|parent| exits.get(&parent.id()).copied())
			.map_or_else(PermissionState::default, |exit| exit.advance_on_node_boundary(true));

		let mut exit = entry.fold(node.permission());
		if entry.admits_opinions() {
			exit = specs.iter().fold(exit, |state, spec| state.fold(spec.permission()));
		}
		entries.insert(node.id(), entry);
		exits.insert(node.id(), exit);
	}
	entries
}
