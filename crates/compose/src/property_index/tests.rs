use lamina_layer::{Layer, LayerRef};
use lamina_primitives::Permission;
use pretty_assertions::assert_eq;

use super::*;
use crate::graph::{ArcType, MapFunction, PrimIndexGraph, Site};
use crate::layer_stack::LayerStack;
use crate::prim_index::PrimIndexCache;

fn p(s: &str) -> Path {
	Path::parse(s).expect("valid path")
}

/// A root prim `/World/Chair` in `shot` with a reference to `/Model` in `model`.
struct Scene {
	shot: LayerRef,
	model: LayerRef,
	graph: PrimIndexGraph,
	reference: NodeId,
}

fn scene() -> Scene {
	let shot = Layer::new("/shot.usda");
	let model = Layer::new("/model.usda");
	shot.define_prim(&p("/World/Chair")).unwrap();
	model.define_prim(&p("/Model")).unwrap();

	let shot_stack = LayerStack::detached(vec![shot.clone()]);
	let model_stack = LayerStack::detached(vec![model.clone()]);
	let mut graph = PrimIndexGraph::new(Site::new(shot_stack, p("/World/Chair")));
	let reference = graph.add_child(
		NodeId::ROOT,
		ArcType::Reference,
		Site::new(model_stack, p("/Model")),
		MapFunction::new([(p("/Model"), p("/World/Chair"))]),
	);
	Scene {
		shot,
		model,
		graph,
		reference,
	}
}

fn attr(layer: &LayerRef, path: &str, type_name: &str) -> SpecHandle {
	layer.define_attribute(&p(path), type_name, Variability::Varying).unwrap();
	layer.attribute_at_path(&p(path)).unwrap()
}

fn specs(index: &PropertyIndex) -> Vec<SpecHandle> {
	index.iter().map(|info| info.spec.clone()).collect()
}

/// Specs come back strongest first, tagged with their node.
#[test]
fn test_gather_strong_to_weak() {
	let s = scene();
	let strong = attr(&s.shot, "/World/Chair.size", "float");
	let weak = attr(&s.model, "/Model.size", "float");
	let index = gather_property_specs(&PrimIndex::new(s.graph), &p("/World/Chair.size"), GatherMode::Hierarchical);

	assert_eq!(specs(&index), vec![strong.clone(), weak.clone()]);
	assert_eq!(index.num_local_specs(), 1);
	assert_eq!(index.strongest().map(|info| &info.spec), Some(&strong));
	let weakest: Vec<&SpecHandle> = index.iter_weak_to_strong().map(|info| &info.spec).collect();
	assert_eq!(weakest, vec![&weak, &strong]);
	assert!(index.local_errors().is_empty());
}

/// The weakest spec fixes the type; a stronger relationship is rejected once.
#[test]
fn test_inconsistent_property_type() {
	let s = scene();
	s.shot.define_relationship(&p("/World/Chair.size")).unwrap();
	let canonical = attr(&s.model, "/Model.size", "float");
	let index = gather_property_specs(&PrimIndex::new(s.graph), &p("/World/Chair.size"), GatherMode::Hierarchical);

	assert_eq!(specs(&index), vec![canonical.clone()]);
	assert_eq!(
		index.local_errors(),
		&[CompositionError::InconsistentPropertyType {
			canonical,
			canonical_type: SpecType::Attribute,
			conflicting: s.shot.relationship_at_path(&p("/World/Chair.size")).unwrap(),
			conflicting_type: SpecType::Relationship,
		}]
	);
}

/// A value type mismatch rejects the spec; a variability mismatch keeps it.
#[test]
fn test_attribute_type_and_variability() {
	let s = scene();
	let canonical = attr(&s.model, "/Model.size", "float");
	let retyped = attr(&s.shot, "/World/Chair.size", "double");
	let index = gather_property_specs(&PrimIndex::new(s.graph.clone()), &p("/World/Chair.size"), GatherMode::Hierarchical);
	assert_eq!(specs(&index), vec![canonical.clone()]);
	assert!(matches!(
		&index.local_errors()[..],
		[CompositionError::InconsistentAttributeType { conflicting, .. }] if *conflicting == retyped
	));

	s.shot
		.define_attribute(&p("/World/Chair.size"), "float", Variability::Uniform)
		.unwrap();
	let index = gather_property_specs(&PrimIndex::new(s.graph), &p("/World/Chair.size"), GatherMode::Hierarchical);
	assert_eq!(specs(&index), vec![retyped.clone(), canonical]);
	assert!(matches!(
		&index.local_errors()[..],
		[CompositionError::InconsistentAttributeVariability {
			conflicting_variability: Variability::Uniform,
			..
		}]
	));
}

/// A private opinion hides the opinions beneath it.
#[test]
fn test_private_opinion_blocks_weaker_nodes() {
	let s = scene();
	let a = attr(&s.shot, "/World/Chair.foo", "float");
	s.shot.set_permission(&p("/World/Chair.foo"), Permission::Private).unwrap();
	let b = attr(&s.model, "/Model.foo", "float");
	let index = gather_property_specs(&PrimIndex::new(s.graph), &p("/World/Chair.foo"), GatherMode::Hierarchical);

	assert_eq!(specs(&index), vec![a]);
	assert_eq!(
		index.local_errors(),
		&[CompositionError::PropertyPermissionDenied {
			property: p("/World/Chair.foo"),
			spec: b,
		}]
	);
}

/// A private node permission restricts only its own subtree.
#[test]
fn test_private_node_leaves_siblings_alone() {
	let mut s = scene();
	let lib = Layer::new("/lib.usda");
	lib.define_prim(&p("/_class_Model")).unwrap();
	let lib_stack = LayerStack::detached(vec![lib.clone()]);
	let class = s.graph.add_child(
		s.reference,
		ArcType::Inherit,
		Site::new(lib_stack.clone(), p("/_class_Model")),
		MapFunction::with_root_identity(p("/_class_Model"), p("/Model")),
	);
	let sibling = s.graph.add_child(
		NodeId::ROOT,
		ArcType::Payload,
		Site::new(lib_stack, p("/Payload")),
		MapFunction::new([(p("/Payload"), p("/World/Chair"))]),
	);
	s.graph.set_permission(s.reference, Permission::Private);
	assert_eq!(sibling.index(), 3);

	let root = attr(&s.shot, "/World/Chair.foo", "float");
	let model = attr(&s.model, "/Model.foo", "float");
	let hidden = attr(&lib, "/_class_Model.foo", "float");
	let payload = attr(&lib, "/Payload.foo", "float");
	let index = gather_property_specs(&PrimIndex::new(s.graph), &p("/World/Chair.foo"), GatherMode::Hierarchical);

	assert_eq!(specs(&index), vec![root, model, payload]);
	assert_eq!(index.local_errors().len(), 1);
	assert!(matches!(
		&index.local_errors()[0],
		CompositionError::PropertyPermissionDenied { spec, .. } if *spec == hidden
	));
	assert_eq!(class.index(), 2);
}

/// Flattened gathering ignores permissions and skips culled nodes.
#[test]
fn test_flattened_mode() {
	let mut s = scene();
	let a = attr(&s.shot, "/World/Chair.foo", "float");
	s.shot.set_permission(&p("/World/Chair.foo"), Permission::Private).unwrap();
	let b = attr(&s.model, "/Model.foo", "float");
	let index = gather_property_specs(&PrimIndex::new(s.graph.clone()), &p("/World/Chair.foo"), GatherMode::Flattened);
	assert_eq!(specs(&index), vec![a.clone(), b]);
	assert!(index.local_errors().is_empty());

	s.graph.set_culled(s.reference, true);
	let index = gather_property_specs(&PrimIndex::new(s.graph), &p("/World/Chair.foo"), GatherMode::Flattened);
	assert_eq!(specs(&index), vec![a]);
}

/// Relational attributes are found beside each relationship spec.
#[test]
fn test_relational_attribute_specs() {
	let s = scene();
	s.shot.define_relationship(&p("/World/Chair.rel")).unwrap();
	s.model.define_relationship(&p("/Model.rel")).unwrap();
	let strong = attr(&s.shot, "/World/Chair.rel[/World/Chair/Target].weight", "float");
	let weak = attr(&s.model, "/Model.rel[/Model/Target].weight", "float");

	let prim_index = PrimIndex::new(s.graph);
	let relationship = gather_property_specs(&prim_index, &p("/World/Chair.rel"), GatherMode::Hierarchical);
	assert_eq!(relationship.len(), 2);

	let path = p("/World/Chair.rel[/World/Chair/Target].weight");
	let index = gather_relational_attribute_specs(&relationship, &path, GatherMode::Hierarchical);
	assert_eq!(specs(&index), vec![strong, weak]);
	assert_eq!(index.num_local_specs(), 1);
}

/// A private relational attribute hides the weaker opinions beneath it.
#[test]
fn test_private_relational_attribute() {
	let s = scene();
	s.shot.define_relationship(&p("/World/Chair.rel")).unwrap();
	s.model.define_relationship(&p("/Model.rel")).unwrap();
	let path = p("/World/Chair.rel[/World/Chair/Target].weight");
	let strong = attr(&s.shot, "/World/Chair.rel[/World/Chair/Target].weight", "float");
	s.shot.set_permission(&path, Permission::Private).unwrap();
	let weak = attr(&s.model, "/Model.rel[/Model/Target].weight", "float");

	let prim_index = PrimIndex::new(s.graph);
	let relationship = gather_property_specs(&prim_index, &p("/World/Chair.rel"), GatherMode::Hierarchical);
	let index = gather_relational_attribute_specs(&relationship, &path, GatherMode::Hierarchical);

	assert_eq!(specs(&index), vec![strong]);
	assert_eq!(
		index.local_errors(),
		&[CompositionError::PropertyPermissionDenied {
			property: path,
			spec: weak,
		}]
	);
}

/// The cache entry point dispatches on the path and collects errors.
#[test]
fn test_build_property_index_through_cache() {
	let s = scene();
	s.shot.define_relationship(&p("/World/Chair.size")).unwrap();
	attr(&s.model, "/Model.size", "float");
	s.shot.define_relationship(&p("/World/Chair.rel")).unwrap();
	let weight = attr(&s.shot, "/World/Chair.rel[/World/Chair/T].weight", "float");

	let graph = s.graph;
	let cache = PrimIndexCache::new(false, move |path| {
		(path == &p("/World/Chair")).then(|| PrimIndex::new(graph.clone()))
	});

	let mut errors = Vec::new();
	let index = build_property_index(&p("/World/Chair.size"), &cache, &mut errors);
	assert_eq!(index.len(), 1);
	assert_eq!(errors.len(), 1);

	let index = build_property_index(&p("/World/Chair.rel[/World/Chair/T].weight"), &cache, &mut errors);
	assert_eq!(specs(&index), vec![weight]);
	assert_eq!(errors.len(), 1);

	let index = build_property_index(&p("/Nowhere.size"), &cache, &mut errors);
	assert!(index.is_empty());
	assert_eq!(cache.len(), 1);
}
