use std::sync::Arc;

use lamina_layer::{Layer, LayerCatalog};
use lamina_primitives::Path;
use pretty_assertions::assert_eq;

use super::*;
use crate::muted_layers::MutedLayerSet;
use crate::resolver::SearchPathResolver;

fn p(s: &str) -> Path {
	Path::parse(s).expect("valid path")
}

fn muted_set() -> MutedLayerSet {
	MutedLayerSet::new(Arc::new(SearchPathResolver::default().with_exists(|_| false)))
}

fn ids(layers: &[LayerRef]) -> Vec<&str> {
	layers.iter().map(|l| l.identifier()).collect()
}

/// Sublayers are flattened depth first, strongest first.
#[test]
fn test_sublayer_order() {
	let catalog = LayerCatalog::new();
	let root = catalog.create("/shot/root.usda");
	let a = catalog.create("/shot/a.usda");
	catalog.create("/shot/b.usda");
	catalog.create("/lib/c.usda");
	root.set_sublayer_paths(vec!["./a.usda".into(), "./b.usda".into()]);
	a.set_sublayer_paths(vec!["../lib/c.usda".into()]);

	let contents = compute_layer_stack(&LayerStackIdentifier::new(root), &muted_set(), &catalog);
	assert_eq!(
		ids(&contents.layers),
		vec!["/shot/root.usda", "/shot/a.usda", "/lib/c.usda", "/shot/b.usda"]
	);
	assert!(contents.errors.is_empty());
}

/// The session layer composes above the root layer unless muted.
#[test]
fn test_session_layer() {
	let catalog = LayerCatalog::new();
	let root = catalog.create("/root.usda");
	let session = catalog.create("/session.usda");
	let identifier = LayerStackIdentifier::new(root).with_session_layer(session);

	let contents = compute_layer_stack(&identifier, &muted_set(), &catalog);
	assert_eq!(ids(&contents.layers), vec!["/session.usda", "/root.usda"]);

	let mut muted = muted_set();
	muted.mute_and_unmute_layers("/", &["/session.usda".to_owned()], &[]);
	let contents = compute_layer_stack(&identifier, &muted, &catalog);
	assert_eq!(ids(&contents.layers), vec!["/root.usda"]);
	assert_eq!(contents.muted_layers, vec!["/session.usda".to_owned()]);
}

/// Muted sublayers are skipped along with their own sublayers.
#[test]
fn test_muted_sublayer() {
	let catalog = LayerCatalog::new();
	let root = catalog.create("/root.usda");
	let a = catalog.create("/a.usda");
	catalog.create("/b.usda");
	root.set_sublayer_paths(vec!["./a.usda".into()]);
	a.set_sublayer_paths(vec!["./b.usda".into()]);

	let mut muted = muted_set();
	muted.mute_and_unmute_layers("/", &["/a.usda".to_owned()], &[]);
	let contents = compute_layer_stack(&LayerStackIdentifier::new(root), &muted, &catalog);
	assert_eq!(ids(&contents.layers), vec!["/root.usda"]);
	assert_eq!(contents.muted_layers, vec!["/a.usda".to_owned()]);
}

/// Cycles and missing sublayers are reported and skipped.
#[test]
fn test_sublayer_errors() {
	let catalog = LayerCatalog::new();
	let root = catalog.create("/root.usda");
	let a = catalog.create("/a.usda");
	root.set_sublayer_paths(vec!["./a.usda".into(), "./missing.usda".into()]);
	a.set_sublayer_paths(vec!["./root.usda".into()]);

	let contents = compute_layer_stack(&LayerStackIdentifier::new(root), &muted_set(), &catalog);
	assert_eq!(ids(&contents.layers), vec!["/root.usda", "/a.usda"]);
	assert_eq!(
		contents.errors,
		vec![
			CompositionError::SublayerCycle {
				layer: "/a.usda".into(),
				sublayer: "/root.usda".into(),
			},
			CompositionError::InvalidSublayerPath {
				layer: "/root.usda".into(),
				asset_path: "./missing.usda".into(),
			},
		]
	);
}

/// A layer reached twice through different branches is not a cycle.
#[test]
fn test_diamond_is_not_cycle() {
	let catalog = LayerCatalog::new();
	let root = catalog.create("/root.usda");
	let a = catalog.create("/a.usda");
	let b = catalog.create("/b.usda");
	catalog.create("/shared.usda");
	root.set_sublayer_paths(vec!["./a.usda".into(), "./b.usda".into()]);
	a.set_sublayer_paths(vec!["./shared.usda".into()]);
	b.set_sublayer_paths(vec!["./shared.usda".into()]);

	let contents = compute_layer_stack(&LayerStackIdentifier::new(root), &muted_set(), &catalog);
	assert!(contents.errors.is_empty());
	assert_eq!(contents.layers.len(), 5);
}

/// Stronger relocations win and ancestral relocations are folded in.
#[test]
fn test_relocates() {
	let catalog = LayerCatalog::new();
	let root = catalog.create("/root.usda");
	let weak = catalog.create("/weak.usda");
	root.set_sublayer_paths(vec!["./weak.usda".into()]);
	root.set_relocates(vec![(p("/Char/Rig"), p("/Char/Anim"))]);
	weak.set_relocates(vec![
		(p("/Char/Rig"), p("/Char/Other")),
		(p("/Char/Anim/Arm"), p("/Char/Arm")),
		(p("/Loop"), p("/Loop")),
	]);

	let contents = compute_layer_stack(&LayerStackIdentifier::new(root), &muted_set(), &catalog);
	let relocates = contents.relocates;
	assert_eq!(relocates.source_to_target.get(&p("/Char/Rig")), Some(&p("/Char/Anim")));
	assert_eq!(relocates.source_to_target.get(&p("/Char/Rig/Arm")), Some(&p("/Char/Arm")));
	assert_eq!(
		relocates.incremental_source_to_target.get(&p("/Char/Anim/Arm")),
		Some(&p("/Char/Arm"))
	);
	assert!(!relocates.source_to_target.contains_key(&p("/Loop")));
	assert_eq!(
		relocates.paths_with_relocates,
		vec![p("/Char/Anim"), p("/Char/Arm"), p("/Char/Rig"), p("/Char/Rig/Arm")]
	);
}

/// Identifiers without a root layer are invalid.
#[test]
fn test_identifier_validity() {
	assert!(!LayerStackIdentifier::default().is_valid());
	assert!(LayerStackIdentifier::new(Layer::new("/a.usda")).is_valid());
}
