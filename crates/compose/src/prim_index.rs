//! Prim indices and the cache that hands them out.

use std::sync::Arc;

use lamina_primitives::Path;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::CompositionConfig;
use crate::graph::{NodeId, NodeRef, PrimIndexGraph, Site};

/// The composed graph of one prim.
#[derive(Clone, Debug)]
pub struct PrimIndex {
	graph: Arc<PrimIndexGraph>,
}

impl PrimIndex {
	pub fn new(graph: PrimIndexGraph) -> Self {
		Self {
			graph: Arc::new(graph),
		}
	}

	pub fn graph(&self) -> &Arc<PrimIndexGraph> {
		&self.graph
	}

	pub fn root_node(&self) -> NodeRef {
		NodeRef::new(self.graph.clone(), NodeId::ROOT)
	}

	/// Returns the prim path in the root namespace.
	pub fn path(&self) -> Path {
		self.root_node().path().clone()
	}

	/// Returns nodes strongest first.
	pub fn nodes_strong_to_weak(&self) -> impl DoubleEndedIterator<Item = NodeRef> + '_ {
		self.graph
			.strength_order()
			.iter()
			.map(|&id| NodeRef::new(self.graph.clone(), id))
	}

	/// Returns nodes weakest first.
	pub fn nodes_weak_to_strong(&self) -> impl Iterator<Item = NodeRef> + '_ {
		self.nodes_strong_to_weak().rev()
	}

	/// Returns the strongest node reading from `site`.
	pub fn node_using_site(&self, site: &Site) -> Option<NodeRef> {
		self.nodes_strong_to_weak().find(|node| node.site() == site)
	}
}

/// Source of prim indices for composition queries.
pub trait CompositionCache: Send + Sync {
	/// Returns the prim index for `path`, or `None` if no prim exists there.
	fn compute_prim_index(&self, path: &Path) -> Option<PrimIndex>;

	/// Returns true for flattened composition, which skips permission and
	/// relocation enforcement.
	fn is_usd(&self) -> bool;

	/// Returns true if the indices handed out drop culled nodes, so a
	/// missing node is expected rather than suspicious.
	fn cull_culled_nodes(&self) -> bool {
		true
	}
}

type ComputeFn = dyn Fn(&Path) -> Option<PrimIndex> + Send + Sync;

/// Memoizing [`CompositionCache`] over a prim index builder.
///
/// Indices are built outside the lock; when two threads build the same path
/// the first published index wins and the other is discarded.
pub struct PrimIndexCache {
	indices: RwLock<FxHashMap<Path, PrimIndex>>,
	compute: Box<ComputeFn>,
	usd_mode: bool,
	cull_culled_nodes: bool,
}

impl PrimIndexCache {
	/// Creates a cache that builds missing indices with `compute`.
	pub fn new(usd_mode: bool, compute: impl Fn(&Path) -> Option<PrimIndex> + Send + Sync + 'static) -> Self {
		Self {
			indices: RwLock::new(FxHashMap::default()),
			compute: Box::new(compute),
			usd_mode,
			cull_culled_nodes: true,
		}
	}

	/// Creates a cache holding only explicitly inserted indices.
	pub fn from_config(config: &CompositionConfig) -> Self {
		Self::new(config.usd_mode, |_| None).with_cull_culled_nodes(config.cull_culled_nodes)
	}

	#[must_use]
	pub fn with_cull_culled_nodes(mut self, cull: bool) -> Self {
		self.cull_culled_nodes = cull;
		self
	}

	/// Publishes `index` for `path` unless one is already present.
	///
	/// Returns the index now stored for `path`.
	pub fn insert(&self, path: Path, index: PrimIndex) -> PrimIndex {
		self.indices.write().entry(path).or_insert(index).clone()
	}

	/// Drops the cached index for `path`.
	pub fn invalidate(&self, path: &Path) -> bool {
		self.indices.write().remove(path).is_some()
	}

	pub fn len(&self) -> usize {
		self.indices.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.indices.read().is_empty()
	}
}

impl CompositionCache for PrimIndexCache {
	fn compute_prim_index(&self, path: &Path) -> Option<PrimIndex> {
		if let Some(index) = self.indices.read().get(path) {
			return Some(index.clone());
		}
		let index = (self.compute)(path)?;
		Some(self.insert(path.clone(), index))
	}

	fn is_usd(&self) -> bool {
		self.usd_mode
	}

	fn cull_culled_nodes(&self) -> bool {
		self.cull_culled_nodes
	}
}

impl std::fmt::Debug for PrimIndexCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PrimIndexCache")
			.field("indices", &self.len())
			.field("usd_mode", &self.usd_mode)
			.field("cull_culled_nodes", &self.cull_culled_nodes)
			.finish_non_exhaustive()
	}
}
