use pretty_assertions::assert_eq;
use rstest::rstest;

use super::{Element, Path};

fn p(s: &str) -> Path {
	Path::parse(s).expect("valid path")
}

#[rstest]
#[case("/")]
#[case("/World")]
#[case("/World/Chair")]
#[case("/Model{shading=red}Geom")]
#[case("/Model{shading=}")]
#[case("/World/Chair.size")]
#[case("/World/Chair.ns:size")]
#[case("/World/Chair.rel[/Target]")]
#[case("/World/Chair.rel[/Target.attr].weight")]
fn test_display_round_trips_parse(#[case] input: &str) {
	assert_eq!(p(input).to_string(), input);
}

#[rstest]
#[case("")]
#[case("World")]
#[case("/World/")]
#[case("/World.")]
#[case("/World.rel[/Target")]
#[case("/World{set}")]
#[case("/1abc")]
fn test_rejects_malformed(#[case] input: &str) {
	assert!(Path::parse(input).is_err(), "{input:?} should not parse");
}

#[test]
fn test_classification() {
	assert!(p("/").is_absolute_root());
	assert!(p("/A/B").is_prim_path());
	assert!(!p("/A.b").is_prim_path());
	assert!(p("/A.b").is_property_path());
	assert!(p("/A{v=x}").is_prim_variant_selection_path());
	assert!(p("/A.rel[/T]").is_target_path());
	assert!(p("/A.rel[/T].w").is_relational_attribute_path());
	assert!(p("/A.rel[/T].w").is_property_path());
}

#[test]
fn test_prim_path_and_parent() {
	assert_eq!(p("/A/B.rel[/T].w").prim_path(), p("/A/B"));
	assert_eq!(p("/A/B.rel[/T].w").parent(), Some(p("/A/B.rel[/T]")));
	assert_eq!(p("/A{v=x}").parent(), Some(p("/A")));
	assert_eq!(p("/A").parent(), Some(p("/")));
	assert_eq!(p("/").parent(), None);
}

#[test]
fn test_name() {
	assert_eq!(p("/A/B").name(), Some("B"));
	assert_eq!(p("/A.size").name(), Some("size"));
	assert_eq!(p("/A{v=x}").name(), Some("x"));
	assert_eq!(p("/A.rel[/T]").name(), None);
	assert_eq!(p("/").name(), None);
}

#[test]
fn test_prefix_replacement() {
	let path = p("/Model/Geom.rel[/Model/Other]");
	assert!(path.has_prefix(&p("/")));
	assert!(path.has_prefix(&p("/Model")));
	assert!(!path.has_prefix(&p("/Mod")));
	assert_eq!(
		path.replace_prefix(&p("/Model"), &p("/World/Instance")),
		Some(p("/World/Instance/Geom.rel[/Model/Other]"))
	);
	assert_eq!(path.replace_prefix(&p("/Other"), &p("/X")), None);
}

#[test]
fn test_target_path_is_innermost() {
	assert_eq!(p("/A.rel[/T].w").target_path(), Some(&p("/T")));
	assert_eq!(p("/A.rel").target_path(), None);
}

#[test]
fn test_builders_match_parse() {
	let built = Path::absolute_root()
		.append_child("A")
		.append_variant_selection("v", "x")
		.append_child("B")
		.append_property("rel")
		.append_target(p("/T"))
		.append_relational_attribute("w");
	assert_eq!(built, p("/A{v=x}B.rel[/T].w"));
	assert_eq!(built.strip_variant_selections(), p("/A/B.rel[/T].w"));
}

#[test]
fn test_split_prim_prefix() {
	let path = p("/A/B.rel[/T]");
	let (prim, rest) = path.split_prim_prefix();
	assert_eq!(prim, p("/A/B"));
	assert_eq!(rest.len(), 2);
	assert!(matches!(&rest[1], Element::Target(t) if *t == p("/T")));
}
