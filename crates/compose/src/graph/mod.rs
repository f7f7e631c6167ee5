//! Prim index graphs.
//!
//! # Role
//!
//! A [`PrimIndexGraph`] records the composition arcs that contribute opinions
//! to one prim. Nodes live in an arena addressed by [`NodeId`]; each node
//! names the site (layer stack and path) it reads opinions from and the map
//! function translating its namespace into its parent's.
//!
//! The graph is built by an upstream arc resolver. This module only provides
//! the storage and an explicit assembly API.
//!
//! # Invariants
//!
//! - Node 0 is the root node; every other node has a parent.
//! - A node's children are stored strongest first.
//! - Strength order is a pre-order walk: a node is stronger than its
//!   children, and an earlier sibling's subtree is stronger than a later one.

mod map_function;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use lamina_primitives::{Path, Permission};

pub use self::map_function::MapFunction;
use crate::layer_stack::LayerStack;

/// Index of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
	/// The root node of every graph.
	pub const ROOT: NodeId = NodeId(0);

	pub fn index(self) -> usize {
		self.0 as usize
	}
}

/// The kind of composition arc that introduced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcType {
	Root,
	Inherit,
	Variant,
	Relocate,
	Reference,
	Payload,
	Specialize,
}

impl ArcType {
	/// Returns true for inherit and specialize arcs.
	pub fn is_class_based(self) -> bool {
		matches!(self, Self::Inherit | Self::Specialize)
	}
}

impl fmt::Display for ArcType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Root => "root",
			Self::Inherit => "inherit",
			Self::Variant => "variant",
			Self::Relocate => "relocate",
			Self::Reference => "reference",
			Self::Payload => "payload",
			Self::Specialize => "specialize",
		})
	}
}

/// A layer stack and a path within it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Site {
	pub layer_stack: Arc<LayerStack>,
	pub path: Path,
}

impl Site {
	pub fn new(layer_stack: Arc<LayerStack>, path: Path) -> Self {
		Self { layer_stack, path }
	}
}

impl fmt::Debug for Site {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}<{}>", self.layer_stack.identifier(), self.path)
	}
}

#[derive(Debug, Clone)]
struct NodeData {
	arc_type: ArcType,
	site: Site,
	parent: Option<NodeId>,
	origin: Option<NodeId>,
	children: Vec<NodeId>,
	map_to_parent: MapFunction,
	permission: Permission,
	culled: bool,
	inert: bool,
	restricted: bool,
}

/// Arena of composition nodes for one prim.
#[derive(Debug, Clone)]
pub struct PrimIndexGraph {
	nodes: Vec<NodeData>,
	strength_order: OnceLock<Vec<NodeId>>,
}

impl PrimIndexGraph {
	/// Creates a graph holding only the root node at `root_site`.
	pub fn new(root_site: Site) -> Self {
		Self {
			nodes: vec![NodeData {
				arc_type: ArcType::Root,
				site: root_site,
				parent: None,
				origin: None,
				children: Vec::new(),
				map_to_parent: MapFunction::identity(),
				permission: Permission::Public,
				culled: false,
				inert: false,
				restricted: false,
			}],
			strength_order: OnceLock::new(),
		}
	}

	/// Appends a child to `parent`, weaker than its existing children.
	///
	/// The child's origin defaults to its parent.
	pub fn add_child(
		&mut self,
		parent: NodeId,
		arc_type: ArcType,
		site: Site,
		map_to_parent: MapFunction,
	) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(NodeData {
			arc_type,
			site,
			parent: Some(parent),
			origin: Some(parent),
			children: Vec::new(),
			map_to_parent,
			permission: Permission::Public,
			culled: false,
			inert: false,
			restricted: false,
		});
		self.nodes[parent.index()].children.push(id);
		self.strength_order = OnceLock::new();
		id
	}

	pub fn set_permission(&mut self, node: NodeId, permission: Permission) {
		self.nodes[node.index()].permission = permission;
	}

	pub fn set_culled(&mut self, node: NodeId, culled: bool) {
		self.nodes[node.index()].culled = culled;
	}

	pub fn set_inert(&mut self, node: NodeId, inert: bool) {
		self.nodes[node.index()].inert = inert;
	}

	/// Marks a node whose opinions are blocked by a private opinion above it.
	pub fn set_restricted(&mut self, node: NodeId, restricted: bool) {
		self.nodes[node.index()].restricted = restricted;
	}

	/// Records the node whose arc caused `node` to be added.
	pub fn set_origin(&mut self, node: NodeId, origin: NodeId) {
		self.nodes[node.index()].origin = Some(origin);
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Returns node ids strongest first.
	pub fn strength_order(&self) -> &[NodeId] {
		self.strength_order.get_or_init(|| {
			let mut order = Vec::with_capacity(self.nodes.len());
			let mut stack = vec![NodeId::ROOT];
			while let Some(id) = stack.pop() {
				order.push(id);
				stack.extend(self.nodes[id.index()].children.iter().rev().copied());
			}
			order
		})
	}

	fn node(&self, id: NodeId) -> &NodeData {
		&self.nodes[id.index()]
	}
}

/// Shared handle to one node of a graph.
#[derive(Clone)]
pub struct NodeRef {
	graph: Arc<PrimIndexGraph>,
	id: NodeId,
}

impl NodeRef {
	pub(crate) fn new(graph: Arc<PrimIndexGraph>, id: NodeId) -> Self {
		Self { graph, id }
	}

	fn data(&self) -> &NodeData {
		self.graph.node(self.id)
	}

	fn sibling(&self, id: NodeId) -> Self {
		Self::new(self.graph.clone(), id)
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Returns the graph this node belongs to.
	pub fn graph(&self) -> &Arc<PrimIndexGraph> {
		&self.graph
	}

	pub fn arc_type(&self) -> ArcType {
		self.data().arc_type
	}

	pub fn site(&self) -> &Site {
		&self.data().site
	}

	pub fn layer_stack(&self) -> &Arc<LayerStack> {
		&self.data().site.layer_stack
	}

	/// Returns the prim path this node reads opinions from.
	pub fn path(&self) -> &Path {
		&self.data().site.path
	}

	pub fn parent(&self) -> Option<NodeRef> {
		self.data().parent.map(|id| self.sibling(id))
	}

	pub fn origin(&self) -> Option<NodeRef> {
		self.data().origin.map(|id| self.sibling(id))
	}

	/// Returns children, strongest first.
	pub fn children(&self) -> impl Iterator<Item = NodeRef> + '_ {
		self.data().children.iter().map(|&id| self.sibling(id))
	}

	pub fn is_root_node(&self) -> bool {
		self.id == NodeId::ROOT
	}

	pub fn permission(&self) -> Permission {
		self.data().permission
	}

	pub fn is_culled(&self) -> bool {
		self.data().culled
	}

	pub fn is_inert(&self) -> bool {
		self.data().inert
	}

	pub fn is_restricted(&self) -> bool {
		self.data().restricted
	}

	/// Returns false for culled and inert nodes.
	pub fn can_contribute_specs(&self) -> bool {
		!self.is_culled() && !self.is_inert()
	}

	pub fn map_to_parent(&self) -> &MapFunction {
		&self.data().map_to_parent
	}

	/// Maps a path in this node's namespace to the root node's namespace.
	pub fn map_to_root(&self, path: &Path) -> Option<Path> {
		let mut mapped = path.clone();
		let mut node = self.id;
		while let Some(parent) = self.graph.node(node).parent {
			mapped = self.graph.node(node).map_to_parent.map_source_to_target(&mapped)?;
			node = parent;
		}
		Some(mapped)
	}

	/// Maps a path in the root node's namespace into this node's namespace.
	pub fn map_from_root(&self, path: &Path) -> Option<Path> {
		let mut chain = Vec::new();
		let mut node = self.id;
		while let Some(parent) = self.graph.node(node).parent {
			chain.push(node);
			node = parent;
		}
		let mut mapped = path.clone();
		for id in chain.into_iter().rev() {
			mapped = self.graph.node(id).map_to_parent.map_target_to_source(&mapped)?;
		}
		Some(mapped)
	}

	/// Returns this node and every descendant, strongest first.
	pub fn subtree(&self) -> Vec<NodeRef> {
		let mut out = Vec::new();
		let mut stack = vec![self.id];
		while let Some(id) = stack.pop() {
			out.push(self.sibling(id));
			stack.extend(self.graph.node(id).children.iter().rev().copied());
		}
		out
	}

	/// Returns true if `self` is `other` or one of its ancestors.
	pub fn is_ancestor_of(&self, other: &NodeRef) -> bool {
		let mut cursor = Some(other.id);
		while let Some(id) = cursor {
			if id == self.id {
				return true;
			}
			cursor = self.graph.node(id).parent;
		}
		false
	}
}

impl PartialEq for NodeRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.graph, &other.graph) && self.id == other.id
	}
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		Arc::as_ptr(&self.graph).hash(state);
		self.id.hash(state);
	}
}

impl fmt::Debug for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Node(#{} {} {:?})", self.id.0, self.arc_type(), self.site())
	}
}

#[cfg(test)]
mod tests;
