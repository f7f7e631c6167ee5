use std::collections::BTreeMap;

use lamina_layer::{LayerLoader, LayerRef, compute_asset_path_relative_to_layer};
use lamina_primitives::Path;
use rustc_hash::FxHashSet;

use super::{LayerStackContents, LayerStackIdentifier, Relocates};
use crate::error::CompositionError;
use crate::muted_layers::MutedLayerSet;
use crate::resolver::ResolverContext;

/// Computes a stack's layers, muted exclusions, relocations, and errors.
///
/// The session layer tree comes first unless the session layer is muted. The
/// root layer is never muted.
pub(crate) fn compute_layer_stack(
	identifier: &LayerStackIdentifier,
	muted: &MutedLayerSet,
	loader: &dyn LayerLoader,
) -> LayerStackContents {
	let mut builder = StackBuilder {
		muted,
		loader,
		context: &identifier.resolver_context,
		seen: FxHashSet::default(),
		contents: LayerStackContents::default(),
	};

	if let Some(session) = &identifier.session_layer {
		let (is_muted, canonical) = muted.is_layer_muted(session.identifier(), session.identifier());
		if is_muted {
			builder.contents.muted_layers.push(canonical);
		} else {
			builder.build(session);
		}
	}
	if let Some(root) = &identifier.root_layer {
		builder.build(root);
	}

	let mut contents = builder.contents;
	contents.muted_layers.sort();
	contents.muted_layers.dedup();
	contents.relocates = compute_relocates(&contents.layers);
	contents
}

struct StackBuilder<'a> {
	muted: &'a MutedLayerSet,
	loader: &'a dyn LayerLoader,
	context: &'a ResolverContext,
	/// Layers on the current sublayer chain.
	seen: FxHashSet<LayerRef>,
	contents: LayerStackContents,
}

impl StackBuilder<'_> {
	fn build(&mut self, layer: &LayerRef) {
		self.seen.insert(layer.clone());
		self.contents.layers.push(layer.clone());

		for asset_path in layer.sublayer_paths() {
			let (is_muted, canonical) = self.muted.is_layer_muted(layer.identifier(), &asset_path);
			if is_muted {
				self.contents.muted_layers.push(canonical);
				continue;
			}

			let Some(sublayer) = self.open(layer, &asset_path) else {
				self.contents.errors.push(CompositionError::InvalidSublayerPath {
					layer: layer.identifier().to_owned(),
					asset_path,
				});
				continue;
			};
			if self.seen.contains(&sublayer) {
				self.contents.errors.push(CompositionError::SublayerCycle {
					layer: layer.identifier().to_owned(),
					sublayer: sublayer.identifier().to_owned(),
				});
				continue;
			}
			self.build(&sublayer);
		}

		// Only cycles are errors; a layer may appear more than once.
		self.seen.remove(layer);
	}

	fn open(&self, anchor: &LayerRef, asset_path: &str) -> Option<LayerRef> {
		let resolver = self.muted.resolver();
		let anchored = compute_asset_path_relative_to_layer(anchor.identifier(), asset_path);
		let resolved = if resolver.is_search_path(&anchored) {
			resolver.resolve(self.context, &anchored).unwrap_or(anchored)
		} else {
			anchored
		};
		self.loader.find_or_open(&resolved)
	}
}

/// Composes the relocations authored across `layers` (strongest first).
fn compute_relocates(layers: &[LayerRef]) -> Relocates {
	let mut authored: BTreeMap<Path, Path> = BTreeMap::new();
	for layer in layers.iter().rev() {
		for (source, target) in layer.relocates() {
			if source == target || source.has_prefix(&target) {
				tracing::warn!(
					layer = layer.identifier(),
					%source,
					%target,
					"ignoring relocation to self or ancestor"
				);
				continue;
			}
			if !source.is_prim_path() || !target.is_prim_path() || source.is_absolute_root() {
				tracing::warn!(layer = layer.identifier(), %source, %target, "ignoring invalid relocation");
				continue;
			}
			authored.insert(source, target);
		}
	}

	let mut relocates = Relocates::default();
	for (source, target) in &authored {
		relocates
			.incremental_target_to_source
			.insert(target.clone(), source.clone());
		relocates
			.incremental_source_to_target
			.insert(source.clone(), target.clone());
	}

	// A source beneath another relocation's target is rewritten back to the
	// original namespace, following chains upward.
	for (authored_source, target) in &authored {
		let mut source = authored_source.clone();
		let mut cursor = Some(source.clone());
		let mut visited: FxHashSet<Path> = FxHashSet::default();
		while let Some(ancestor) = cursor {
			match relocates.incremental_target_to_source.get(&ancestor) {
				Some(ancestral_source)
					if ancestral_source != authored_source && visited.insert(ancestor.clone()) =>
				{
					if let Some(rewritten) = source.replace_prefix(&ancestor, ancestral_source) {
						source = rewritten;
					}
					cursor = ancestral_source.parent();
				}
				_ => cursor = ancestor.parent(),
			}
		}

		relocates.target_to_source.insert(target.clone(), source.clone());
		relocates.source_to_target.insert(source, target.clone());
	}

	let mut paths: Vec<Path> = relocates
		.source_to_target
		.iter()
		.flat_map(|(s, t)| [s.clone(), t.clone()])
		.collect();
	paths.sort();
	paths.dedup();
	relocates.paths_with_relocates = paths;
	relocates
}
