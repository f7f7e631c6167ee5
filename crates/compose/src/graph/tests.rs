use std::sync::Arc;

use lamina_layer::Layer;
use pretty_assertions::assert_eq;

use super::*;
use crate::prim_index::PrimIndex;

fn p(s: &str) -> Path {
	Path::parse(s).expect("valid path")
}

fn site(stack: &Arc<LayerStack>, path: &str) -> Site {
	Site::new(stack.clone(), p(path))
}

/// Root `/World/Chair` references `/Model` in another stack, which inherits
/// `/_class_Model`; the root also inherits `/_class_Chair`.
fn chair_graph() -> (PrimIndexGraph, Arc<LayerStack>, Arc<LayerStack>) {
	let shot = LayerStack::detached(vec![Layer::new("/shot.usda")]);
	let model = LayerStack::detached(vec![Layer::new("/model.usda")]);

	let mut graph = PrimIndexGraph::new(site(&shot, "/World/Chair"));
	let reference = graph.add_child(
		NodeId::ROOT,
		ArcType::Reference,
		site(&model, "/Model"),
		MapFunction::new([(p("/Model"), p("/World/Chair"))]),
	);
	graph.add_child(
		reference,
		ArcType::Inherit,
		site(&model, "/_class_Model"),
		MapFunction::with_root_identity(p("/_class_Model"), p("/Model")),
	);
	graph.add_child(
		NodeId::ROOT,
		ArcType::Inherit,
		site(&shot, "/_class_Chair"),
		MapFunction::with_root_identity(p("/_class_Chair"), p("/World/Chair")),
	);
	(graph, shot, model)
}

/// Strength order visits a node before its children and earlier siblings first.
#[test]
fn test_strength_order_is_preorder() {
	let (graph, _, _) = chair_graph();
	let ids: Vec<usize> = graph.strength_order().iter().map(|id| id.index()).collect();
	assert_eq!(ids, vec![0, 1, 2, 3]);

	let index = PrimIndex::new(graph);
	let weak: Vec<ArcType> = index.nodes_weak_to_strong().map(|n| n.arc_type()).collect();
	assert_eq!(weak, vec![ArcType::Inherit, ArcType::Inherit, ArcType::Reference, ArcType::Root]);
}

/// Adding a child after the order was computed invalidates it.
#[test]
fn test_strength_order_tracks_additions() {
	let (mut graph, shot, _) = chair_graph();
	assert_eq!(graph.strength_order().len(), 4);
	let extra = graph.add_child(
		NodeId(1),
		ArcType::Payload,
		site(&shot, "/Payload"),
		MapFunction::new([(p("/Payload"), p("/Model"))]),
	);
	assert_eq!(graph.strength_order(), &[NodeId(0), NodeId(1), NodeId(2), extra, NodeId(3)]);
}

/// Paths map through every arc on the way to the root and back.
#[test]
fn test_map_to_and_from_root() {
	let (graph, _, _) = chair_graph();
	let index = PrimIndex::new(graph);
	let class = index
		.nodes_strong_to_weak()
		.find(|n| n.path() == &p("/_class_Model"))
		.unwrap();

	assert_eq!(
		class.map_to_root(&p("/_class_Model/Leg.size")),
		Some(p("/World/Chair/Leg.size"))
	);
	assert_eq!(
		class.map_from_root(&p("/World/Chair/Leg.size")),
		Some(p("/_class_Model/Leg.size"))
	);
	// Outside the reference's namespace.
	assert_eq!(class.map_to_root(&p("/Elsewhere")), None);
	assert_eq!(index.root_node().map_to_root(&p("/Anything")), Some(p("/Anything")));
}

/// Subtrees and ancestry follow parent links.
#[test]
fn test_subtree_and_ancestry() {
	let (graph, _, _) = chair_graph();
	let index = PrimIndex::new(graph);
	let nodes: Vec<NodeRef> = index.nodes_strong_to_weak().collect();

	let subtree: Vec<NodeId> = nodes[1].subtree().iter().map(NodeRef::id).collect();
	assert_eq!(subtree, vec![NodeId(1), NodeId(2)]);
	assert!(nodes[0].is_ancestor_of(&nodes[2]));
	assert!(nodes[1].is_ancestor_of(&nodes[1]));
	assert!(!nodes[1].is_ancestor_of(&nodes[3]));
	assert_eq!(nodes[2].parent(), Some(nodes[1].clone()));
	assert_eq!(nodes[2].origin(), Some(nodes[1].clone()));
	assert!(nodes[0].parent().is_none());
}

/// Node lookup by site compares the stack by identity.
#[test]
fn test_node_using_site() {
	let (graph, shot, model) = chair_graph();
	let index = PrimIndex::new(graph);

	let found = index.node_using_site(&site(&model, "/_class_Model")).unwrap();
	assert_eq!(found.id(), NodeId(2));
	assert!(index.node_using_site(&site(&shot, "/_class_Model")).is_none());

	let twin = LayerStack::detached(vec![Layer::new("/model.usda")]);
	assert!(index.node_using_site(&site(&twin, "/Model")).is_none());
}

/// Culled and inert nodes cannot contribute specs.
#[test]
fn test_contribution_flags() {
	let (mut graph, _, _) = chair_graph();
	graph.set_culled(NodeId(2), true);
	graph.set_inert(NodeId(3), true);
	let index = PrimIndex::new(graph);
	let contributing: Vec<NodeId> = index
		.nodes_strong_to_weak()
		.filter(NodeRef::can_contribute_specs)
		.map(|n| n.id())
		.collect();
	assert_eq!(contributing, vec![NodeId(0), NodeId(1)]);
}
