//! Layer stacks.
//!
//! # Role
//!
//! A [`LayerStack`] is the strength-ordered list of layers reachable from a
//! root layer (and optional session layer) through sublayers, minus muted
//! layers. Stacks are created and deduplicated by
//! [`LayerStackRegistry`](crate::LayerStackRegistry) and shared by `Arc`.
//!
//! # Invariants
//!
//! - A stack bound to a registry deregisters itself when its last `Arc` drops.
//! - Contents change only through registry recompute, under the registry lock.

mod compute;

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{OnceLock, Weak};

use lamina_layer::LayerRef;
use lamina_primitives::Path;
use parking_lot::RwLock;

pub(crate) use self::compute::compute_layer_stack;
use crate::error::CompositionError;
use crate::registry::RegistryShared;
use crate::resolver::ResolverContext;

/// The inputs that determine a layer stack's content.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct LayerStackIdentifier {
	/// Root of the sublayer tree. An identifier without one is invalid.
	pub root_layer: Option<LayerRef>,
	/// Session layer composed above the root layer.
	pub session_layer: Option<LayerRef>,
	pub resolver_context: ResolverContext,
}

impl LayerStackIdentifier {
	/// Creates an identifier for the stack rooted at `root_layer`.
	pub fn new(root_layer: LayerRef) -> Self {
		Self {
			root_layer: Some(root_layer),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_session_layer(mut self, session_layer: LayerRef) -> Self {
		self.session_layer = Some(session_layer);
		self
	}

	#[must_use]
	pub fn with_resolver_context(mut self, context: ResolverContext) -> Self {
		self.resolver_context = context;
		self
	}

	/// Returns true if the identifier has a root layer.
	pub fn is_valid(&self) -> bool {
		self.root_layer.is_some()
	}
}

impl fmt::Debug for LayerStackIdentifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.root_layer {
			Some(root) => write!(f, "{root}")?,
			None => f.write_str("<no root>")?,
		}
		if let Some(session) = &self.session_layer {
			write!(f, " session={session}")?;
		}
		if let Some(dir) = self.resolver_context.search_dir() {
			write!(f, " context={dir}")?;
		}
		Ok(())
	}
}

/// Relocation tables of a layer stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relocates {
	/// Composed source to target, with ancestral relocations folded in.
	pub source_to_target: BTreeMap<Path, Path>,
	/// Inverse of `source_to_target`.
	pub target_to_source: BTreeMap<Path, Path>,
	/// Authored source to target, without ancestral folding.
	pub incremental_source_to_target: BTreeMap<Path, Path>,
	pub incremental_target_to_source: BTreeMap<Path, Path>,
	/// Sorted sources and targets of every relocation.
	pub paths_with_relocates: Vec<Path>,
}

impl Relocates {
	pub fn is_empty(&self) -> bool {
		self.source_to_target.is_empty()
	}
}

/// Computed content of a layer stack.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayerStackContents {
	pub(crate) layers: Vec<LayerRef>,
	/// Sorted canonical ids of layers skipped because they are muted.
	pub(crate) muted_layers: Vec<String>,
	pub(crate) relocates: Relocates,
	pub(crate) errors: Vec<CompositionError>,
}

pub(crate) struct Registration {
	pub(crate) registry: Weak<RegistryShared>,
	pub(crate) handle: usize,
}

/// A strength-ordered list of layers.
pub struct LayerStack {
	identifier: LayerStackIdentifier,
	contents: RwLock<LayerStackContents>,
	registration: OnceLock<Registration>,
}

impl LayerStack {
	pub(crate) fn new(identifier: LayerStackIdentifier, contents: LayerStackContents) -> Self {
		Self {
			identifier,
			contents: RwLock::new(contents),
			registration: OnceLock::new(),
		}
	}

	/// Creates an unregistered stack over `layers`.
	#[cfg(test)]
	pub(crate) fn detached(layers: Vec<LayerRef>) -> std::sync::Arc<Self> {
		let identifier = layers.first().cloned().map(LayerStackIdentifier::new).unwrap_or_default();
		std::sync::Arc::new(Self::new(
			identifier,
			LayerStackContents {
				layers,
				..LayerStackContents::default()
			},
		))
	}

	/// Binds the stack to its registry record. Only the first binding sticks.
	pub(crate) fn bind(&self, registry: Weak<RegistryShared>, handle: usize) {
		let _ = self.registration.set(Registration { registry, handle });
	}

	pub(crate) fn registration(&self) -> Option<&Registration> {
		self.registration.get()
	}

	pub(crate) fn replace_contents(&self, contents: LayerStackContents) {
		*self.contents.write() = contents;
	}

	pub fn identifier(&self) -> &LayerStackIdentifier {
		&self.identifier
	}

	/// Returns the layers, strongest first.
	pub fn layers(&self) -> Vec<LayerRef> {
		self.contents.read().layers.clone()
	}

	/// Returns true if `layer` contributes to this stack.
	pub fn has_layer(&self, layer: &LayerRef) -> bool {
		self.contents.read().layers.contains(layer)
	}

	/// Returns the sorted canonical ids of muted layers this stack excluded.
	pub fn muted_layers(&self) -> Vec<String> {
		self.contents.read().muted_layers.clone()
	}

	/// Returns the errors found while computing this stack.
	pub fn local_errors(&self) -> Vec<CompositionError> {
		self.contents.read().errors.clone()
	}

	pub fn relocates(&self) -> Relocates {
		self.contents.read().relocates.clone()
	}

	/// Returns true if any layer authors a relocation.
	pub fn has_relocates(&self) -> bool {
		!self.contents.read().relocates.is_empty()
	}

	/// Returns the target of the relocation whose source is exactly `source`.
	pub fn relocation_target(&self, source: &Path) -> Option<Path> {
		self.contents.read().relocates.source_to_target.get(source).cloned()
	}
}

impl Drop for LayerStack {
	fn drop(&mut self) {
		let Some(registration) = self.registration.get() else {
			return;
		};
		if let Some(registry) = registration.registry.upgrade() {
			registry.remove(registration.handle, self as *const LayerStack);
		}
	}
}

impl PartialEq for LayerStack {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self, other)
	}
}

impl Eq for LayerStack {}

impl Hash for LayerStack {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(self as *const LayerStack).hash(state);
	}
}

impl fmt::Debug for LayerStack {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "LayerStack({:?})", self.identifier)
	}
}

#[cfg(test)]
mod tests;
