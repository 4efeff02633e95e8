//! Document-level entry point: walks a scope element tree, drives a
//! [`ParserDelegate`] per scope and registers every completed definition.

use crate::defaults::DefaultsSnapshot;
use crate::diagnostics::Problem;
use crate::element::Element;
use crate::error::ProblemKind;
use crate::extension::ExtensionRegistry;
use crate::model::DefinitionHolder;
use crate::parser::{ParserDelegate, DEFINITION_ELEMENT, DESCRIPTION_ELEMENT, SCOPE_ELEMENT};
use crate::registry::{DefinitionRegistry, TypeResolver};
use log::debug;

/// What a full document parse produced: the canonical names registered, in
/// document order, and every problem recorded along the way. Problems never
/// abort the walk; a fragment with a problem is simply not registered.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub registered: Vec<String>,
    pub problems: Vec<Problem>,
}

impl ParseOutcome {
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }
}

/// Parses one configuration document rooted at a scope element. Definitions
/// land in `registry`; foreign grammars are resolved through `extensions`;
/// `type_resolver` (when given) vets declared type names.
pub fn parse_document(
    root: &Element,
    registry: &mut dyn DefinitionRegistry,
    extensions: &ExtensionRegistry,
    type_resolver: Option<&dyn TypeResolver>,
) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    parse_scope(
        root,
        None,
        registry,
        extensions,
        type_resolver,
        &mut outcome,
    );
    debug!(
        "parsed document: {} definition(s) registered, {} problem(s)",
        outcome.registered.len(),
        outcome.problems.len()
    );
    outcome
}

fn parse_scope(
    root: &Element,
    parent_defaults: Option<&DefaultsSnapshot>,
    registry: &mut dyn DefinitionRegistry,
    extensions: &ExtensionRegistry,
    type_resolver: Option<&dyn TypeResolver>,
    outcome: &mut ParseOutcome,
) {
    let mut delegate = ParserDelegate::new(extensions, type_resolver);

    if !(delegate.is_default_namespace(root) && root.local_name() == SCOPE_ELEMENT) {
        outcome.problems.push(Problem {
            kind: ProblemKind::UnexpectedScopeElement {
                name: root.local_name().to_string(),
            },
            span: root.span(),
            frames: Vec::new(),
        });
        return;
    }

    delegate.init_defaults(root, parent_defaults);

    for child in root.children() {
        if delegate.is_default_namespace(child) {
            match child.local_name() {
                DEFINITION_ELEMENT => {
                    if let Some(holder) = delegate.parse_definition_element(child, None, registry)
                    {
                        let holder = delegate.decorate_definition(child, holder, None, registry);
                        outcome.registered.push(holder.name.clone());
                        registry.register(holder);
                    }
                }
                SCOPE_ELEMENT => {
                    // Nested scopes inherit this scope's defaults but get
                    // their own delegate, so their names do not clash with
                    // ours.
                    let defaults = delegate.defaults().clone();
                    parse_scope(
                        child,
                        Some(&defaults),
                        registry,
                        extensions,
                        type_resolver,
                        outcome,
                    );
                }
                DESCRIPTION_ELEMENT => {}
                other => {
                    delegate.report_problem(
                        ProblemKind::UnexpectedScopeElement {
                            name: other.to_string(),
                        },
                        child.span(),
                    );
                }
            }
        } else if let Some(definition) = delegate.parse_foreign_element(child, None, registry) {
            match registry.generate_name(&definition, false) {
                Ok(name) => {
                    outcome.registered.push(name.clone());
                    registry.register(DefinitionHolder::new(definition, name));
                }
                Err(err) => {
                    delegate.report_problem(
                        ProblemKind::NameGeneration {
                            message: err.to_string(),
                        },
                        child.span(),
                    );
                }
            }
        }
    }

    outcome
        .problems
        .extend(delegate.into_diagnostics().into_problems());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;

    fn definition(id: &str, class: &str) -> Element {
        Element::new(DEFINITION_ELEMENT)
            .with_attr("id", id)
            .with_attr("class", class)
    }

    #[test]
    fn registers_definitions_in_document_order() {
        let root = Element::new(SCOPE_ELEMENT)
            .with_child(definition("a", "acme.A"))
            .with_child(definition("b", "acme.B"));
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        assert!(!outcome.has_problems());
        assert_eq!(outcome.registered, vec!["a", "b"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn nested_scope_inherits_and_overrides_defaults() {
        let inner = Element::new(SCOPE_ELEMENT)
            .with_attr("default-autowire", "by-type")
            .with_child(definition("inner", "acme.Inner"));
        let root = Element::new(SCOPE_ELEMENT)
            .with_attr("default-lazy-init", "true")
            .with_child(definition("outer", "acme.Outer"))
            .with_child(inner);
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        assert!(!outcome.has_problems());

        let outer = registry.get("outer").unwrap();
        assert!(outer.definition.lazy_init);
        assert_eq!(outer.definition.autowire, crate::model::AutowireMode::No);

        let inner = registry.get("inner").unwrap();
        assert!(inner.definition.lazy_init);
        assert_eq!(
            inner.definition.autowire,
            crate::model::AutowireMode::ByType
        );
    }

    #[test]
    fn sibling_scopes_have_independent_name_spaces() {
        let root = Element::new(SCOPE_ELEMENT)
            .with_child(Element::new(SCOPE_ELEMENT).with_child(definition("svc", "acme.A")))
            .with_child(Element::new(SCOPE_ELEMENT).with_child(definition("svc", "acme.B")));
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        // No duplicate-name problem across sibling scopes; the registry
        // still keeps only the first registration.
        assert!(!outcome.has_problems());
        assert_eq!(outcome.registered, vec!["svc", "svc"]);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("svc").unwrap().definition.type_name.as_deref(),
            Some("acme.A")
        );
    }

    #[test]
    fn unexpected_element_in_scope_is_reported_and_skipped() {
        let root = Element::new(SCOPE_ELEMENT)
            .with_child(Element::new("import").with_attr("resource", "other"))
            .with_child(definition("a", "acme.A"));
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        assert_eq!(outcome.registered, vec!["a"]);
        assert_eq!(outcome.problems.len(), 1);
        assert_eq!(
            outcome.problems[0].kind,
            ProblemKind::UnexpectedScopeElement {
                name: "import".to_string()
            }
        );
    }

    #[test]
    fn wrong_root_element_is_a_single_problem() {
        let root = Element::new("configuration");
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        assert!(outcome.registered.is_empty());
        assert_eq!(outcome.problems.len(), 1);
        assert!(matches!(
            outcome.problems[0].kind,
            ProblemKind::UnexpectedScopeElement { .. }
        ));
    }

    #[test]
    fn unknown_foreign_top_level_element_outside_family_is_ignored() {
        let root = Element::new(SCOPE_ELEMENT)
            .with_child(Element::new("widget").in_namespace("https://example.org/widgets"))
            .with_child(definition("a", "acme.A"));
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        assert!(!outcome.has_problems());
        assert_eq!(outcome.registered, vec!["a"]);
    }

    #[test]
    fn unresolved_family_namespace_is_an_extension_problem() {
        let root = Element::new(SCOPE_ELEMENT).with_child(
            Element::new("task").in_namespace("https://wirework.dev/schema/tasks"),
        );
        let extensions = ExtensionRegistry::new();
        let mut registry = InMemoryRegistry::new();
        let outcome = parse_document(&root, &mut registry, &extensions, None);
        assert_eq!(outcome.problems.len(), 1);
        assert_eq!(
            outcome.problems[0].kind,
            ProblemKind::UnresolvableNamespace {
                namespace: "https://wirework.dev/schema/tasks".to_string()
            }
        );
    }
}
