use crate::element::Element;
use crate::error::ProblemKind;
use crate::model::{Definition, DefinitionHolder};
use crate::parser::ParserDelegate;
use crate::registry::DefinitionRegistry;
use miette::SourceSpan;
use std::collections::HashMap;
use std::sync::Arc;

/// Namespace identifier of the default grammar. Elements with no namespace
/// are treated as belonging to it as well.
pub const CORE_NAMESPACE: &str = "https://wirework.dev/schema/definitions";

/// Prefix of the core system's own extension family. A namespace under this
/// prefix with no registered handler is an error; any other unresolved
/// namespace is silently ignored.
pub const EXTENSION_FAMILY_PREFIX: &str = "https://wirework.dev/";

/// Whether a namespace identifier (or its absence) denotes the default
/// grammar.
pub fn is_default_namespace_uri(namespace: Option<&str>) -> bool {
    namespace.map_or(true, |ns| ns == CORE_NAMESPACE)
}

/// A foreign-grammar node offered to an extension's decorate capability.
#[derive(Debug, Clone, Copy)]
pub enum ForeignNode<'a> {
    Attribute {
        namespace: &'a str,
        name: &'a str,
        value: &'a str,
    },
    Element(&'a Element),
}

/// What an extension gets to work with: the delegate for recursive parsing,
/// the registry, and the definition currently under construction (if any).
pub struct ExtensionContext<'c, 'a> {
    pub delegate: &'c mut ParserDelegate<'a>,
    pub registry: &'c mut dyn DefinitionRegistry,
    pub containing: Option<&'c Definition>,
}

impl ExtensionContext<'_, '_> {
    pub fn report(&mut self, kind: ProblemKind, span: SourceSpan) {
        self.delegate.report_problem(kind, span);
    }
}

/// A pluggable grammar extension, resolved by namespace identifier.
pub trait NamespaceExtension {
    /// Parses a foreign element into a definition. Returning `None` means
    /// the extension handled the element itself (or declined it); problems
    /// go through the context.
    fn parse(&self, element: &Element, ctx: &mut ExtensionContext<'_, '_>) -> Option<Definition>;

    /// Offers a foreign attribute or child element for decorating an already
    /// parsed definition, returning the (possibly replaced) wrapper.
    fn decorate(
        &self,
        node: &ForeignNode<'_>,
        holder: DefinitionHolder,
        ctx: &mut ExtensionContext<'_, '_>,
    ) -> DefinitionHolder {
        let _ = (node, ctx);
        holder
    }
}

/// Maps namespace identifiers to their grammar extensions. Built once by the
/// embedder and shared read-only across parses.
#[derive(Default)]
pub struct ExtensionRegistry {
    handlers: HashMap<String, Arc<dyn NamespaceExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> ExtensionRegistry {
        ExtensionRegistry::default()
    }

    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        handler: Arc<dyn NamespaceExtension>,
    ) {
        self.handlers.insert(namespace.into(), handler);
    }

    pub fn resolve(&self, namespace: &str) -> Option<Arc<dyn NamespaceExtension>> {
        self.handlers.get(namespace).cloned()
    }

    /// Whether a namespace belongs to the core system's own extension
    /// family, for which missing handlers are hard errors.
    pub fn is_core_family(namespace: &str) -> bool {
        namespace.starts_with(EXTENSION_FAMILY_PREFIX)
    }
}
