use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a recorded problem, used by callers that only
/// care about the family of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemCategory {
    Structural,
    Naming,
    Index,
    Extension,
    Reference,
    TypeResolution,
}

/// Everything the parser can complain about. All of these are recoverable:
/// the offending fragment is omitted and parsing continues, so one pass can
/// surface several independent problems.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ProblemKind {
    #[error("{context} is only allowed to contain either a 'ref' attribute OR a 'value' attribute OR a sub-element")]
    #[diagnostic(code(parse::ambiguous_value_source))]
    AmbiguousValueSource { context: String },

    #[error("{context} must specify a ref or value")]
    #[diagnostic(code(parse::missing_value_source))]
    MissingValueSource { context: String },

    #[error("{context} must not contain more than one sub-element")]
    #[diagnostic(code(parse::multiple_sub_elements))]
    MultipleSubElements { context: String },

    #[error("unknown value sub-element <{name}>")]
    #[diagnostic(code(parse::unknown_element))]
    UnknownElement { name: String },

    #[error("unexpected element <{name}> at scope level")]
    #[diagnostic(code(parse::unexpected_scope_element))]
    UnexpectedScopeElement { name: String },

    #[error("'{attribute}' is required for <{element}> element")]
    #[diagnostic(code(parse::missing_attribute))]
    MissingAttribute { element: String, attribute: String },

    #[error("old 'singleton' attribute in use - upgrade to a 'scope' declaration")]
    #[diagnostic(code(parse::legacy_singleton_attribute))]
    LegacySingletonAttribute,

    #[error("multiple 'property' entries for property '{name}'")]
    #[diagnostic(code(parse::duplicate_property))]
    DuplicateProperty { name: String },

    #[error("<entry> element is only allowed to contain one <key> sub-element")]
    #[diagnostic(code(parse::multiple_key_elements))]
    MultipleKeyElements,

    #[error("<entry> element is only allowed to contain either a 'key' attribute OR a 'key-ref' attribute OR a <key> sub-element")]
    #[diagnostic(code(parse::ambiguous_entry_key))]
    AmbiguousEntryKey,

    #[error("<entry> element must specify a key")]
    #[diagnostic(code(parse::missing_entry_key))]
    MissingEntryKey,

    #[error("<entry> element is only allowed to contain either a 'value' attribute OR a 'value-ref' attribute OR a <value> sub-element")]
    #[diagnostic(code(parse::ambiguous_entry_value))]
    AmbiguousEntryValue,

    #[error("<entry> element is only allowed to contain a 'value-type' attribute when it has a 'value' attribute")]
    #[diagnostic(code(parse::illegal_value_type))]
    IllegalValueType,

    #[error("<entry> element must specify a value")]
    #[diagnostic(code(parse::missing_entry_value))]
    MissingEntryValue,

    #[error("qualifier <attribute> element must have a 'key' and a 'value'")]
    #[diagnostic(code(parse::qualifier_attribute_incomplete))]
    QualifierAttributeIncomplete,

    #[error("definition name '{name}' is already used in this scope")]
    #[diagnostic(code(parse::duplicate_name))]
    DuplicateName { name: String },

    #[error("could not generate a definition name: {message}")]
    #[diagnostic(code(parse::name_generation))]
    NameGeneration { message: String },

    #[error("'index' cannot be lower than 0")]
    #[diagnostic(code(parse::negative_index))]
    NegativeIndex,

    #[error("'index' attribute of <constructor-arg> must be an integer, got '{raw}'")]
    #[diagnostic(code(parse::invalid_index))]
    InvalidIndex { raw: String },

    #[error("ambiguous constructor-arg entries for index {index}")]
    #[diagnostic(code(parse::duplicate_index))]
    DuplicateIndex { index: usize },

    #[error("unable to locate an extension handler for namespace [{namespace}]")]
    #[diagnostic(code(parse::unresolvable_namespace))]
    UnresolvableNamespace { namespace: String },

    #[error("incorrect usage of element <{name}> in a nested manner")]
    #[diagnostic(code(parse::nested_foreign_element))]
    NestedForeignElement { name: String },

    #[error("{context} contains an empty reference target")]
    #[diagnostic(code(parse::empty_reference))]
    EmptyReference { context: String },

    #[error("declared type [{type_name}] could not be resolved")]
    #[diagnostic(code(parse::type_not_found))]
    TypeNotFound { type_name: String },

    #[error("definition type [{type_name}] not found")]
    #[diagnostic(code(parse::definition_type_not_found))]
    DefinitionTypeNotFound { type_name: String },
}

impl ProblemKind {
    pub fn category(&self) -> ProblemCategory {
        use ProblemKind::*;
        match self {
            AmbiguousValueSource { .. }
            | MissingValueSource { .. }
            | MultipleSubElements { .. }
            | UnknownElement { .. }
            | UnexpectedScopeElement { .. }
            | MissingAttribute { .. }
            | LegacySingletonAttribute
            | DuplicateProperty { .. }
            | MultipleKeyElements
            | AmbiguousEntryKey
            | MissingEntryKey
            | AmbiguousEntryValue
            | IllegalValueType
            | MissingEntryValue
            | QualifierAttributeIncomplete => ProblemCategory::Structural,
            DuplicateName { .. } | NameGeneration { .. } => ProblemCategory::Naming,
            NegativeIndex | InvalidIndex { .. } | DuplicateIndex { .. } => ProblemCategory::Index,
            UnresolvableNamespace { .. } | NestedForeignElement { .. } => {
                ProblemCategory::Extension
            }
            EmptyReference { .. } => ProblemCategory::Reference,
            TypeNotFound { .. } | DefinitionTypeNotFound { .. } => ProblemCategory::TypeResolution,
        }
    }
}
