//! Administratively muted layers.
//!
//! # Role
//!
//! Muting a layer removes it from every layer stack that would otherwise
//! include it, without editing any layer. The set stores canonical identifiers
//! so that `./a.usda` authored in `/shots/s.usda` and `/shots/a.usda` mute the
//! same layer.
//!
//! # Invariants
//!
//! - Identifiers are kept sorted and unique; lookups are binary searches.
//! - Mute and unmute report only identifiers whose state actually changed.

use std::sync::Arc;

use lamina_layer::{compute_asset_path_relative_to_layer, is_anonymous_identifier};

use crate::resolver::{PathResolver, ResolverContext};

/// Identifiers whose state changed in one [`MutedLayerSet::mute_and_unmute_layers`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteOutcome {
	/// Canonical identifiers that became muted.
	pub muted: Vec<String>,
	/// Canonical identifiers that became unmuted.
	pub unmuted: Vec<String>,
}

impl MuteOutcome {
	/// Returns true if nothing changed.
	pub fn is_empty(&self) -> bool {
		self.muted.is_empty() && self.unmuted.is_empty()
	}
}

/// Sorted set of canonical muted layer identifiers.
#[derive(Clone)]
pub struct MutedLayerSet {
	layers: Vec<String>,
	resolver: Arc<dyn PathResolver>,
}

impl MutedLayerSet {
	/// Creates an empty set canonicalizing through `resolver`.
	pub fn new(resolver: Arc<dyn PathResolver>) -> Self {
		Self {
			layers: Vec::new(),
			resolver,
		}
	}

	/// Returns the canonical form of `layer_id` as authored in `anchor`.
	pub fn canonical_layer_id(&self, anchor: &str, layer_id: &str) -> String {
		if is_anonymous_identifier(layer_id) {
			return layer_id.to_owned();
		}
		let mut id = compute_asset_path_relative_to_layer(anchor, layer_id);
		if self.resolver.is_search_path(&id)
			&& let Some(resolved) = self.resolver.resolve(&ResolverContext::default(), &id)
		{
			id = resolved;
		}
		self.resolver.compute_repository_path(&id).unwrap_or(id)
	}

	/// Returns whether `layer_id` is muted, along with its canonical identifier.
	pub fn is_layer_muted(&self, anchor: &str, layer_id: &str) -> (bool, String) {
		let canonical = self.canonical_layer_id(anchor, layer_id);
		(self.contains(&canonical), canonical)
	}

	/// Returns true if the canonical identifier is muted.
	pub fn contains(&self, canonical_id: &str) -> bool {
		self.layers
			.binary_search_by(|entry| entry.as_str().cmp(canonical_id))
			.is_ok()
	}

	/// Mutes and unmutes layers relative to `anchor`.
	///
	/// An identifier present in both lists is muted, then unmuted.
	pub fn mute_and_unmute_layers(
		&mut self,
		anchor: &str,
		to_mute: &[String],
		to_unmute: &[String],
	) -> MuteOutcome {
		let mut outcome = MuteOutcome::default();
		for id in to_mute {
			let canonical = self.canonical_layer_id(anchor, id);
			if let Err(idx) = self.layers.binary_search(&canonical) {
				self.layers.insert(idx, canonical.clone());
				outcome.muted.push(canonical);
			}
		}
		for id in to_unmute {
			let canonical = self.canonical_layer_id(anchor, id);
			if let Ok(idx) = self.layers.binary_search(&canonical) {
				self.layers.remove(idx);
				// Muted and unmuted in one call nets out to nothing.
				if let Some(pos) = outcome.muted.iter().position(|m| *m == canonical) {
					outcome.muted.remove(pos);
				} else {
					outcome.unmuted.push(canonical);
				}
			}
		}
		outcome
	}

	/// Returns the sorted canonical identifiers.
	pub fn muted_layers(&self) -> &[String] {
		&self.layers
	}

	pub fn resolver(&self) -> &Arc<dyn PathResolver> {
		&self.resolver
	}
}

impl std::fmt::Debug for MutedLayerSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MutedLayerSet")
			.field("layers", &self.layers)
			.finish_non_exhaustive()
	}
}
