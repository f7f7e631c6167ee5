//! Layer stack registry.
//!
//! # Role
//!
//! Owns the live layer stacks, deduplicated by [`LayerStackIdentifier`], and
//! the reverse indices used to find every stack affected by a layer edit or a
//! mute. The registry holds only weak references; a stack lives as long as
//! callers keep its `Arc`.
//!
//! # Invariants
//!
//! - At most one live stack per identifier is published.
//! - Every record's reverse-index entries match its last committed contents.
//! - An `Arc<LayerStack>` upgraded under the state lock is never dropped
//!   while the lock is held, since its drop re-enters the registry.

use std::sync::{Arc, Weak};

use lamina_layer::{LayerLoader, LayerRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slab::Slab;
use smallvec::SmallVec;

use crate::config::CompositionConfig;
use crate::error::{CompositionError, RegistryError};
use crate::layer_stack::{LayerStack, LayerStackContents, LayerStackIdentifier, compute_layer_stack};
use crate::muted_layers::{MuteOutcome, MutedLayerSet};
use crate::resolver::PathResolver;

type Handles = SmallVec<[usize; 4]>;

struct StackRecord {
	identifier: LayerStackIdentifier,
	stack: Weak<LayerStack>,
	layers: Vec<LayerRef>,
	muted_ids: Vec<String>,
}

/// Consolidated registry state under a single lock.
///
/// The identifier map, record arena, and both reverse indices MUST change
/// together so lookups never see a half-registered stack.
struct RegistryState {
	by_identifier: FxHashMap<LayerStackIdentifier, usize>,
	records: Slab<StackRecord>,
	layer_to_stacks: FxHashMap<LayerRef, Handles>,
	muted_id_to_stacks: FxHashMap<String, Handles>,
	muted: MutedLayerSet,
	/// Bumped whenever the muted set changes.
	muted_generation: u64,
}

impl RegistryState {
	fn live(&self, identifier: &LayerStackIdentifier) -> Option<Arc<LayerStack>> {
		let handle = *self.by_identifier.get(identifier)?;
		self.records.get(handle)?.stack.upgrade()
	}

	fn live_handles<'a>(&'a self, handles: impl IntoIterator<Item = &'a usize>) -> Vec<Arc<LayerStack>> {
		handles
			.into_iter()
			.filter_map(|&h| self.records.get(h)?.stack.upgrade())
			.collect()
	}

	/// Replaces a record's reverse-index membership.
	fn set_layers(&mut self, handle: usize, layers: Vec<LayerRef>, muted_ids: Vec<String>) {
		self.unindex(handle);
		for layer in &layers {
			let bucket = self.layer_to_stacks.entry(layer.clone()).or_default();
			if !bucket.contains(&handle) {
				bucket.push(handle);
			}
		}
		for id in &muted_ids {
			let bucket = self.muted_id_to_stacks.entry(id.clone()).or_default();
			if !bucket.contains(&handle) {
				bucket.push(handle);
			}
		}
		if let Some(record) = self.records.get_mut(handle) {
			record.layers = layers;
			record.muted_ids = muted_ids;
		}
	}

	fn unindex(&mut self, handle: usize) {
		let Some(record) = self.records.get(handle) else {
			return;
		};
		for layer in &record.layers {
			if let Some(bucket) = self.layer_to_stacks.get_mut(layer) {
				bucket.retain(|h| *h != handle);
				if bucket.is_empty() {
					self.layer_to_stacks.remove(layer);
				}
			}
		}
		for id in &record.muted_ids {
			if let Some(bucket) = self.muted_id_to_stacks.get_mut(id) {
				bucket.retain(|h| *h != handle);
				if bucket.is_empty() {
					self.muted_id_to_stacks.remove(id);
				}
			}
		}
	}
}

pub(crate) struct RegistryShared {
	state: RwLock<RegistryState>,
	loader: Arc<dyn LayerLoader>,
}

impl RegistryShared {
	/// Removes the record at `handle` if it still belongs to `stack`.
	///
	/// The identifier entry is erased only if it still points at this record.
	pub(crate) fn remove(&self, handle: usize, stack: *const LayerStack) {
		let mut state = self.state.write();
		let owned = state
			.records
			.get(handle)
			.is_some_and(|record| std::ptr::eq(record.stack.as_ptr(), stack));
		if !owned {
			return;
		}
		state.unindex(handle);
		let record = state.records.remove(handle);
		if state.by_identifier.get(&record.identifier) == Some(&handle) {
			state.by_identifier.remove(&record.identifier);
		}
		drop(state);
		tracing::trace!(identifier = ?record.identifier, handle, "removed layer stack");
	}
}

/// Thread-safe registry of layer stacks.
///
/// Cloning is cheap and yields a handle to the same registry.
///
/// # Concurrency
///
/// Stack contents are computed outside the lock against a snapshot of the
/// muted set. Publishing takes the write lock; if another thread published
/// the same identifier first, the new stack is discarded and the winner
/// returned. A publish whose snapshot went stale is recomputed.
#[derive(Clone)]
pub struct LayerStackRegistry {
	shared: Arc<RegistryShared>,
}

impl LayerStackRegistry {
	/// Creates an empty registry.
	pub fn new(loader: Arc<dyn LayerLoader>, resolver: Arc<dyn PathResolver>) -> Self {
		Self {
			shared: Arc::new(RegistryShared {
				state: RwLock::new(RegistryState {
					by_identifier: FxHashMap::default(),
					records: Slab::new(),
					layer_to_stacks: FxHashMap::default(),
					muted_id_to_stacks: FxHashMap::default(),
					muted: MutedLayerSet::new(resolver),
					muted_generation: 0,
				}),
				loader,
			}),
		}
	}

	/// Creates a registry resolving through the configured search paths.
	pub fn from_config(config: &CompositionConfig, loader: Arc<dyn LayerLoader>) -> Self {
		Self::new(loader, Arc::new(config.resolver()))
	}

	/// Returns the live stack for `identifier`, creating it if needed.
	///
	/// Errors found while computing a new stack are appended to `errors`; a
	/// stack that already existed reports nothing.
	pub fn find_or_create(
		&self,
		identifier: &LayerStackIdentifier,
		errors: &mut Vec<CompositionError>,
	) -> Result<Arc<LayerStack>, RegistryError> {
		if !identifier.is_valid() {
			tracing::error!(?identifier, "cannot build a layer stack without a root layer");
			return Err(RegistryError::InvalidIdentifier(identifier.clone()));
		}

		if let Some(stack) = self.find(identifier) {
			return Ok(stack);
		}

		loop {
			let (muted, generation) = self.muted_snapshot();
			let contents = compute_layer_stack(identifier, &muted, &*self.shared.loader);
			let new_errors = contents.errors.clone();
			let layers = contents.layers.clone();
			let muted_ids = contents.muted_layers.clone();
			let stack = Arc::new(LayerStack::new(identifier.clone(), contents));

			let mut state = self.shared.state.write();
			if let Some(existing) = state.live(identifier) {
				drop(state);
				tracing::trace!(?identifier, "lost layer stack publish race");
				return Ok(existing);
			}
			if state.muted_generation != generation {
				drop(state);
				tracing::trace!(?identifier, "muted layers changed during compute, retrying");
				continue;
			}

			let handle = state.records.insert(StackRecord {
				identifier: identifier.clone(),
				stack: Arc::downgrade(&stack),
				layers: Vec::new(),
				muted_ids: Vec::new(),
			});
			state.by_identifier.insert(identifier.clone(), handle);
			state.set_layers(handle, layers, muted_ids);
			stack.bind(Arc::downgrade(&self.shared), handle);
			drop(state);

			tracing::debug!(?identifier, handle, errors = new_errors.len(), "published layer stack");
			errors.extend(new_errors);
			return Ok(stack);
		}
	}

	fn muted_snapshot(&self) -> (MutedLayerSet, u64) {
		let state = self.shared.state.read();
		(state.muted.clone(), state.muted_generation)
	}

	/// Returns the live stack for `identifier`, if any.
	pub fn find(&self, identifier: &LayerStackIdentifier) -> Option<Arc<LayerStack>> {
		self.shared.state.read().live(identifier)
	}

	/// Returns true if `stack` is the live stack registered in this registry.
	pub fn contains(&self, stack: &Arc<LayerStack>) -> bool {
		self.handle_of(stack).is_some()
	}

	fn handle_of(&self, stack: &Arc<LayerStack>) -> Option<usize> {
		let registration = stack.registration()?;
		if !std::ptr::eq(registration.registry.as_ptr(), Arc::as_ptr(&self.shared)) {
			return None;
		}
		let state = self.shared.state.read();
		let record = state.records.get(registration.handle)?;
		std::ptr::eq(record.stack.as_ptr(), Arc::as_ptr(stack)).then_some(registration.handle)
	}

	/// Returns every live stack that includes `layer`.
	pub fn find_all_using_layer(&self, layer: &LayerRef) -> Vec<Arc<LayerStack>> {
		let state = self.shared.state.read();
		match state.layer_to_stacks.get(layer) {
			Some(handles) => state.live_handles(handles),
			None => Vec::new(),
		}
	}

	/// Returns every live stack that excluded the muted layer `canonical_id`.
	pub fn find_all_using_muted_layer(&self, canonical_id: &str) -> Vec<Arc<LayerStack>> {
		let state = self.shared.state.read();
		match state.muted_id_to_stacks.get(canonical_id) {
			Some(handles) => state.live_handles(handles),
			None => Vec::new(),
		}
	}

	/// Returns every live stack.
	pub fn all_layer_stacks(&self) -> Vec<Arc<LayerStack>> {
		let state = self.shared.state.read();
		state
			.records
			.iter()
			.filter_map(|(_, record)| record.stack.upgrade())
			.collect()
	}

	/// Mutes and unmutes layers, anchoring relative ids to `anchor`.
	///
	/// Existing stacks are not recomputed; see
	/// [`LayerStackRegistry::layer_stacks_affected_by`].
	pub fn mute_and_unmute_layers(
		&self,
		anchor: &str,
		to_mute: &[String],
		to_unmute: &[String],
	) -> MuteOutcome {
		let mut state = self.shared.state.write();
		let outcome = state.muted.mute_and_unmute_layers(anchor, to_mute, to_unmute);
		if !outcome.is_empty() {
			state.muted_generation += 1;
		}
		drop(state);
		if !outcome.is_empty() {
			tracing::debug!(muted = ?outcome.muted, unmuted = ?outcome.unmuted, "muted layers changed");
		}
		outcome
	}

	/// Returns whether `layer_id` is muted, along with its canonical identifier.
	pub fn is_layer_muted(&self, anchor: &str, layer_id: &str) -> (bool, String) {
		self.shared.state.read().muted.is_layer_muted(anchor, layer_id)
	}

	/// Returns the sorted canonical muted identifiers.
	pub fn muted_layers(&self) -> Vec<String> {
		self.shared.state.read().muted.muted_layers().to_vec()
	}

	/// Returns live stacks whose content is stale after `outcome`.
	///
	/// These include a newly muted layer or excluded a newly unmuted one.
	pub fn layer_stacks_affected_by(&self, outcome: &MuteOutcome) -> Vec<Arc<LayerStack>> {
		if outcome.is_empty() {
			return Vec::new();
		}
		let state = self.shared.state.read();
		let mut handles: Vec<usize> = Vec::new();
		for (layer, bucket) in &state.layer_to_stacks {
			let canonical = state.muted.canonical_layer_id(layer.identifier(), layer.identifier());
			if outcome.muted.contains(&canonical) {
				handles.extend(bucket.iter().copied());
			}
		}
		for id in &outcome.unmuted {
			if let Some(bucket) = state.muted_id_to_stacks.get(id) {
				handles.extend(bucket.iter().copied());
			}
		}
		handles.sort_unstable();
		handles.dedup();
		state.live_handles(&handles)
	}

	/// Recomputes `stack` against the current muted set and commits the result.
	///
	/// Returns the errors found by the new computation.
	pub fn recompute(&self, stack: &Arc<LayerStack>) -> Result<Vec<CompositionError>, RegistryError> {
		let Some(handle) = self.handle_of(stack) else {
			tracing::error!(identifier = ?stack.identifier(), "recompute of unregistered layer stack");
			return Err(RegistryError::NotRegistered(stack.identifier().clone()));
		};

		loop {
			let (muted, generation) = self.muted_snapshot();
			let contents: LayerStackContents =
				compute_layer_stack(stack.identifier(), &muted, &*self.shared.loader);
			let errors = contents.errors.clone();

			let mut state = self.shared.state.write();
			if state.muted_generation != generation {
				drop(state);
				continue;
			}
			state.set_layers(handle, contents.layers.clone(), contents.muted_layers.clone());
			stack.replace_contents(contents);
			drop(state);

			tracing::debug!(identifier = ?stack.identifier(), errors = errors.len(), "recomputed layer stack");
			return Ok(errors);
		}
	}
}

impl std::fmt::Debug for LayerStackRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.shared.state.read();
		f.debug_struct("LayerStackRegistry")
			.field("stacks", &state.records.len())
			.field("muted", &state.muted.muted_layers())
			.finish()
	}
}
