// Systematic unhappy-path coverage: every problem is recorded, nothing
// panics, and the rest of the document still parses.

use wirework_core::element::Element;
use wirework_core::error::{ProblemCategory, ProblemKind};
use wirework_core::extension::ExtensionRegistry;
use wirework_core::parse_document;
use wirework_core::registry::InMemoryRegistry;
use wirework_core::ParseOutcome;

fn parse(doc: &Element) -> (ParseOutcome, InMemoryRegistry) {
    let extensions = ExtensionRegistry::new();
    let mut registry = InMemoryRegistry::new();
    let outcome = parse_document(doc, &mut registry, &extensions, None);
    (outcome, registry)
}

fn scope() -> Element {
    Element::new("definitions")
}

#[test]
fn test_duplicate_name_still_registers_first_definition() {
    let doc = scope()
        .with_child(
            Element::new("definition")
                .with_attr("id", "svc")
                .with_attr("class", "acme.A"),
        )
        .with_child(
            Element::new("definition")
                .with_attr("id", "svc")
                .with_attr("class", "acme.B"),
        );
    let (outcome, registry) = parse(&doc);
    assert_eq!(outcome.problems.len(), 1);
    assert_eq!(outcome.problems[0].category(), ProblemCategory::Naming);
    assert_eq!(
        registry.get("svc").unwrap().definition.type_name.as_deref(),
        Some("acme.A")
    );
}

#[test]
fn test_duplicate_alias_does_not_shadow_earlier_definition() {
    let doc = scope()
        .with_child(
            Element::new("definition")
                .with_attr("id", "a")
                .with_attr("class", "acme.First"),
        )
        .with_child(
            Element::new("definition")
                .with_attr("id", "b")
                .with_attr("name", "a")
                .with_attr("class", "acme.Second"),
        );
    let (outcome, registry) = parse(&doc);
    assert_eq!(outcome.problems.len(), 1);
    assert_eq!(outcome.problems[0].category(), ProblemCategory::Naming);
    // Both definitions register under their canonical names; the clashing
    // alias is dropped, so lookup by "a" still finds the first.
    assert_eq!(
        registry.get("a").unwrap().definition.type_name.as_deref(),
        Some("acme.First")
    );
    assert_eq!(
        registry.get("b").unwrap().definition.type_name.as_deref(),
        Some("acme.Second")
    );
}

#[test]
fn test_problem_in_one_definition_does_not_stop_the_next() {
    let doc = scope()
        .with_child(
            Element::new("definition")
                .with_attr("id", "bad")
                .with_attr("class", "acme.Bad")
                .with_child(Element::new("property").with_attr("name", "p")),
        )
        .with_child(
            Element::new("definition")
                .with_attr("id", "good")
                .with_attr("class", "acme.Good"),
        );
    let (outcome, registry) = parse(&doc);
    assert_eq!(outcome.problems.len(), 1);
    // The malformed property is dropped but its definition survives.
    assert_eq!(outcome.registered, vec!["bad", "good"]);
    assert!(registry.get("bad").unwrap().definition.properties.is_empty());
}

#[test]
fn test_property_missing_name_attribute() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_child(Element::new("property").with_attr("value", "1")),
    );
    let (outcome, _) = parse(&doc);
    assert_eq!(
        outcome.problems[0].kind,
        ProblemKind::MissingAttribute {
            element: "property".to_string(),
            attribute: "name".to_string()
        }
    );
}

#[test]
fn test_ref_and_value_attributes_together() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_child(
                Element::new("property")
                    .with_attr("name", "p")
                    .with_attr("ref", "other")
                    .with_attr("value", "1"),
            ),
    );
    let (outcome, registry) = parse(&doc);
    assert_eq!(outcome.problems.len(), 1);
    assert!(matches!(
        outcome.problems[0].kind,
        ProblemKind::AmbiguousValueSource { .. }
    ));
    assert!(registry.get("svc").unwrap().definition.properties.is_empty());
}

#[test]
fn test_two_sub_elements_in_constructor_arg() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_child(
                Element::new("constructor-arg")
                    .with_child(Element::new("value").with_text("1"))
                    .with_child(Element::new("value").with_text("2")),
            ),
    );
    let (outcome, _) = parse(&doc);
    // The extra child is reported, then the pair of sources is ambiguous.
    assert!(outcome
        .problems
        .iter()
        .any(|p| matches!(p.kind, ProblemKind::MultipleSubElements { .. })));
}

#[test]
fn test_map_entry_missing_key() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_child(
                Element::new("property").with_attr("name", "m").with_child(
                    Element::new("map")
                        .with_child(Element::new("entry").with_attr("value", "v")),
                ),
            ),
    );
    let (outcome, _) = parse(&doc);
    assert_eq!(outcome.problems[0].kind, ProblemKind::MissingEntryKey);
}

#[test]
fn test_map_entry_value_type_without_literal_value() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_child(
                Element::new("property").with_attr("name", "m").with_child(
                    Element::new("map").with_child(
                        Element::new("entry")
                            .with_attr("key", "k")
                            .with_attr("value-ref", "other")
                            .with_attr("value-type", "int"),
                    ),
                ),
            ),
    );
    let (outcome, _) = parse(&doc);
    assert!(outcome
        .problems
        .iter()
        .any(|p| p.kind == ProblemKind::IllegalValueType));
}

#[test]
fn test_lookup_method_and_overrides_survive_sibling_problems() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_attr("singleton", "true")
            .with_child(
                Element::new("lookup-method")
                    .with_attr("name", "create")
                    .with_attr("bean", "proto"),
            ),
    );
    let (outcome, registry) = parse(&doc);
    assert_eq!(outcome.problems[0].kind, ProblemKind::LegacySingletonAttribute);
    assert_eq!(
        registry.get("svc").unwrap().definition.method_overrides.len(),
        1
    );
}

#[test]
fn test_frames_locate_deeply_nested_problems() {
    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "outer")
            .with_attr("class", "acme.Outer")
            .with_child(
                Element::new("property").with_attr("name", "inner").with_child(
                    Element::new("definition")
                        .with_attr("class", "acme.Inner")
                        .with_child(Element::new("property").with_attr("name", "broken")),
                ),
            ),
    );
    let (outcome, _) = parse(&doc);
    assert_eq!(outcome.problems.len(), 1);
    let rendered = outcome.problems[0].to_string();
    assert!(
        rendered.contains("definition 'outer' > property 'inner'"),
        "{rendered}"
    );
    assert!(rendered.contains("property 'broken'"), "{rendered}");
}

#[test]
fn test_unnamed_definition_without_type_parent_or_factory() {
    let doc = scope().with_child(Element::new("definition"));
    let (outcome, registry) = parse(&doc);
    assert!(registry.is_empty());
    assert_eq!(outcome.problems.len(), 1);
    assert!(matches!(
        outcome.problems[0].kind,
        ProblemKind::NameGeneration { .. }
    ));
}

#[test]
fn test_type_resolver_rejects_definition_type() {
    struct Known;
    impl wirework_core::registry::TypeResolver for Known {
        fn can_resolve(&self, type_name: &str) -> bool {
            type_name == "acme.Known"
        }
    }

    let doc = scope()
        .with_child(
            Element::new("definition")
                .with_attr("id", "good")
                .with_attr("class", "acme.Known"),
        )
        .with_child(
            Element::new("definition")
                .with_attr("id", "bad")
                .with_attr("class", "acme.Missing"),
        );
    let extensions = ExtensionRegistry::new();
    let mut registry = InMemoryRegistry::new();
    let outcome = parse_document(&doc, &mut registry, &extensions, Some(&Known));
    assert_eq!(outcome.registered, vec!["good"]);
    assert_eq!(
        outcome.problems[0].kind,
        ProblemKind::DefinitionTypeNotFound {
            type_name: "acme.Missing".to_string()
        }
    );
    assert_eq!(outcome.problems[0].category(), ProblemCategory::TypeResolution);
}

#[test]
fn test_type_resolver_downgrades_scalar_type_to_untyped() {
    struct Nothing;
    impl wirework_core::registry::TypeResolver for Nothing {
        fn can_resolve(&self, type_name: &str) -> bool {
            type_name.starts_with("acme.")
        }
    }

    let doc = scope().with_child(
        Element::new("definition")
            .with_attr("id", "svc")
            .with_attr("class", "acme.Svc")
            .with_child(
                Element::new("property").with_attr("name", "p").with_child(
                    Element::new("value").with_attr("type", "bogus.T").with_text("x"),
                ),
            ),
    );
    let extensions = ExtensionRegistry::new();
    let mut registry = InMemoryRegistry::new();
    let outcome = parse_document(&doc, &mut registry, &extensions, Some(&Nothing));
    assert_eq!(
        outcome.problems[0].kind,
        ProblemKind::TypeNotFound {
            type_name: "bogus.T".to_string()
        }
    );
    // The value itself survives, just without the bad type hint.
    assert_eq!(
        registry.get("svc").unwrap().definition.property("p").unwrap().value,
        wirework_core::model::ValueNode::Scalar {
            value: "x".to_string(),
            type_name: None
        }
    );
}
