use miette::SourceSpan;

/// A single attribute on an [`Element`]. Attributes carried by a foreign
/// grammar keep their namespace identifier; attributes of the default grammar
/// have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// One node of the element tree handed to the parser by the external
/// tokenizer. The tokenizer guarantees well-formedness; this crate only
/// interprets the tree.
///
/// Elements are assembled builder-style, which also keeps test fixtures
/// readable:
///
/// ```
/// use wirework_core::element::Element;
///
/// let ele = Element::new("definition")
///     .with_attr("id", "svc")
///     .with_child(Element::new("property").with_attr("name", "p").with_attr("value", "1"));
/// assert_eq!(ele.attr("id"), Some("svc"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    local_name: String,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Element>,
    text: String,
    span: SourceSpan,
}

impl Element {
    pub fn new(local_name: impl Into<String>) -> Self {
        Element {
            local_name: local_name.into(),
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
            span: (0, 0).into(),
        }
    }

    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            namespace: None,
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Attach an attribute belonging to a foreign grammar.
    #[must_use]
    pub fn with_foreign_attr(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.push(Attribute {
            namespace: Some(namespace.into()),
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Record where in the source document this element came from.
    #[must_use]
    pub fn at(mut self, offset: usize, len: usize) -> Self {
        self.span = (offset, len).into();
        self
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Look up a default-grammar attribute by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn children_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.local_name == name)
    }
}
