use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::layer::{Layer, LayerRef};

/// Opens layers by resolved identifier.
///
/// Layer stack computation calls this for every sublayer it follows.
pub trait LayerLoader: Send + Sync {
	/// Returns the layer with `identifier`, or `None` if it cannot be opened.
	fn find_or_open(&self, identifier: &str) -> Option<LayerRef>;
}

/// In-memory [`LayerLoader`] keyed by identifier.
#[derive(Default)]
pub struct LayerCatalog {
	layers: RwLock<FxHashMap<String, LayerRef>>,
}

impl LayerCatalog {
	/// Creates an empty catalog.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `layer` under its identifier, replacing any previous entry.
	pub fn insert(&self, layer: LayerRef) -> Option<LayerRef> {
		self.layers
			.write()
			.insert(layer.identifier().to_owned(), layer)
	}

	/// Creates and registers an empty layer.
	pub fn create(&self, identifier: &str) -> LayerRef {
		let layer = Layer::new(identifier);
		self.insert(layer.clone());
		layer
	}

	/// Drops the entry for `identifier`.
	pub fn remove(&self, identifier: &str) -> Option<LayerRef> {
		self.layers.write().remove(identifier)
	}

	/// Returns the registered layer with `identifier`.
	pub fn get(&self, identifier: &str) -> Option<LayerRef> {
		self.layers.read().get(identifier).cloned()
	}

	pub fn len(&self) -> usize {
		self.layers.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.read().is_empty()
	}
}

impl LayerLoader for LayerCatalog {
	fn find_or_open(&self, identifier: &str) -> Option<LayerRef> {
		self.get(identifier)
	}
}

impl std::fmt::Debug for LayerCatalog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LayerCatalog")
			.field("layers", &self.len())
			.finish()
	}
}
