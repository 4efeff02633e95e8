use miette::SourceSpan;
use serde::Serialize;

/// How (if at all) the assembly engine should wire unresolved collaborators
/// of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutowireMode {
    #[default]
    No,
    ByName,
    ByType,
    Constructor,
    Autodetect,
}

impl AutowireMode {
    /// Maps an `autowire` attribute value. Anything unrecognized (including
    /// the `"default"` sentinel once defaults have been consulted) means no
    /// autowiring.
    pub fn from_attr(raw: &str) -> AutowireMode {
        match raw {
            "by-name" => AutowireMode::ByName,
            "by-type" => AutowireMode::ByType,
            "constructor" => AutowireMode::Constructor,
            "autodetect" => AutowireMode::Autodetect,
            _ => AutowireMode::No,
        }
    }
}

/// A method-override directive recorded on a definition and acted on by the
/// assembly engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MethodOverride {
    /// Replace a method's return value with the named definition.
    Redirect { method: String, target: String },
    /// Replace a method body with the named delegate; `arg_types` narrows the
    /// overload when the method name alone is ambiguous.
    Replace {
        method: String,
        replacer: String,
        arg_types: Vec<String>,
    },
}

/// A type-tagged set of key/value attributes narrowing candidate selection
/// for an ambiguous dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Qualifier {
    pub type_name: String,
    pub attributes: Vec<(String, String)>,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// Wraps a constructor-argument value together with its optional declared
/// type and argument name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueHolder {
    pub value: ValueNode,
    pub type_name: Option<String>,
    pub name: Option<String>,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// Constructor-argument values of one definition: explicitly indexed holders
/// plus un-indexed ("generic") ones matched positionally by the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConstructorArgs {
    pub indexed: Vec<(usize, ValueHolder)>,
    pub generic: Vec<ValueHolder>,
}

impl ConstructorArgs {
    pub fn has_index(&self, index: usize) -> bool {
        self.indexed.iter().any(|(i, _)| *i == index)
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }
}

/// A named property value of one definition, with any `meta` entries declared
/// on the property element itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyValue {
    pub name: String,
    pub value: ValueNode,
    pub meta: Vec<(String, String)>,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// A parsed value expression. Exactly one variant per node; the builders in
/// the parser reject multiple simultaneously-specified sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValueNode {
    Scalar {
        value: String,
        type_name: Option<String>,
    },
    /// A reference to another definition, resolved at assembly time.
    /// `to_parent` targets the enclosing assembly context instead.
    BeanRef { name: String, to_parent: bool },
    /// A reference by name only: the engine injects the name string, not the
    /// instance.
    NameRef { name: String },
    Null,
    Nested(Box<DefinitionHolder>),
    Array {
        elements: Vec<ValueNode>,
        element_type: Option<String>,
        merge: bool,
    },
    List {
        elements: Vec<ValueNode>,
        element_type: Option<String>,
        merge: bool,
    },
    Set {
        elements: Vec<ValueNode>,
        element_type: Option<String>,
        merge: bool,
    },
    Map {
        entries: Vec<(ValueNode, ValueNode)>,
        key_type: Option<String>,
        value_type: Option<String>,
        merge: bool,
    },
    PropertyTable {
        entries: Vec<(String, String)>,
        merge: bool,
    },
}

/// A construction recipe for one object, independent of the engine that later
/// instantiates it. Built up in document order during one parse pass and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub type_name: Option<String>,
    pub parent_name: Option<String>,
    pub scope: Option<String>,
    pub is_abstract: bool,
    pub lazy_init: bool,
    pub autowire: AutowireMode,
    pub depends_on: Vec<String>,
    pub autowire_candidate: bool,
    pub primary: bool,
    pub init_method: Option<String>,
    /// False when `init_method` was merely inherited from scope defaults;
    /// absence of an inherited method on the eventual type is not an error.
    pub enforce_init_method: bool,
    pub destroy_method: Option<String>,
    pub enforce_destroy_method: bool,
    pub factory_method: Option<String>,
    pub factory_bean: Option<String>,
    pub constructor_args: ConstructorArgs,
    pub properties: Vec<PropertyValue>,
    pub qualifiers: Vec<Qualifier>,
    pub method_overrides: Vec<MethodOverride>,
    pub meta: Vec<(String, String)>,
    pub description: Option<String>,
    #[serde(skip)]
    pub span: SourceSpan,
}

impl Definition {
    pub fn new(
        type_name: Option<String>,
        parent_name: Option<String>,
        span: SourceSpan,
    ) -> Definition {
        Definition {
            type_name,
            parent_name,
            scope: None,
            is_abstract: false,
            lazy_init: false,
            autowire: AutowireMode::No,
            depends_on: Vec::new(),
            autowire_candidate: true,
            primary: false,
            init_method: None,
            enforce_init_method: true,
            destroy_method: None,
            enforce_destroy_method: true,
            factory_method: None,
            factory_bean: None,
            constructor_args: ConstructorArgs::default(),
            properties: Vec::new(),
            qualifiers: Vec::new(),
            method_overrides: Vec::new(),
            meta: Vec::new(),
            description: None,
            span,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A completed definition together with its canonical name and aliases, ready
/// for registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinitionHolder {
    pub definition: Definition,
    pub name: String,
    pub aliases: Vec<String>,
}

impl DefinitionHolder {
    pub fn new(definition: Definition, name: impl Into<String>) -> DefinitionHolder {
        DefinitionHolder {
            definition,
            name: name.into(),
            aliases: Vec::new(),
        }
    }
}
