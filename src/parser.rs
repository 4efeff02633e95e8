use crate::defaults::DefaultsSnapshot;
use crate::diagnostics::{Diagnostics, ParseFrame};
use crate::element::Element;
use crate::error::ProblemKind;
use crate::extension::{
    is_default_namespace_uri, ExtensionContext, ExtensionRegistry, ForeignNode,
};
use crate::model::{
    AutowireMode, Definition, DefinitionHolder, MethodOverride, PropertyValue, Qualifier,
    ValueHolder, ValueNode,
};
use crate::registry::{DefinitionRegistry, TypeResolver, GENERATED_NAME_SEPARATOR};
use crate::utils::{any_pattern_matches, tokenize_list};
use log::debug;
use miette::SourceSpan;
use std::collections::HashSet;

pub const TRUE_VALUE: &str = "true";
pub const DEFAULT_VALUE: &str = "default";

pub const DEFINITION_ELEMENT: &str = "definition";
pub const SCOPE_ELEMENT: &str = "definitions";
pub const DESCRIPTION_ELEMENT: &str = "description";
pub const META_ELEMENT: &str = "meta";
pub const LOOKUP_METHOD_ELEMENT: &str = "lookup-method";
pub const REPLACED_METHOD_ELEMENT: &str = "replaced-method";
pub const ARG_TYPE_ELEMENT: &str = "arg-type";
pub const CONSTRUCTOR_ARG_ELEMENT: &str = "constructor-arg";
pub const PROPERTY_ELEMENT: &str = "property";
pub const QUALIFIER_ELEMENT: &str = "qualifier";
pub const QUALIFIER_ATTRIBUTE_ELEMENT: &str = "attribute";
pub const REF_ELEMENT: &str = "ref";
pub const IDREF_ELEMENT: &str = "idref";
pub const VALUE_ELEMENT: &str = "value";
pub const NULL_ELEMENT: &str = "null";
pub const ARRAY_ELEMENT: &str = "array";
pub const LIST_ELEMENT: &str = "list";
pub const SET_ELEMENT: &str = "set";
pub const MAP_ELEMENT: &str = "map";
pub const ENTRY_ELEMENT: &str = "entry";
pub const KEY_ELEMENT: &str = "key";
pub const PROPS_ELEMENT: &str = "props";
pub const PROP_ELEMENT: &str = "prop";

const ID_ATTRIBUTE: &str = "id";
const NAME_ATTRIBUTE: &str = "name";
const CLASS_ATTRIBUTE: &str = "class";
const PARENT_ATTRIBUTE: &str = "parent";
const SCOPE_ATTRIBUTE: &str = "scope";
const SINGLETON_ATTRIBUTE: &str = "singleton";
const ABSTRACT_ATTRIBUTE: &str = "abstract";
const LAZY_INIT_ATTRIBUTE: &str = "lazy-init";
const AUTOWIRE_ATTRIBUTE: &str = "autowire";
const AUTOWIRE_CANDIDATE_ATTRIBUTE: &str = "autowire-candidate";
const PRIMARY_ATTRIBUTE: &str = "primary";
const DEPENDS_ON_ATTRIBUTE: &str = "depends-on";
const INIT_METHOD_ATTRIBUTE: &str = "init-method";
const DESTROY_METHOD_ATTRIBUTE: &str = "destroy-method";
const FACTORY_METHOD_ATTRIBUTE: &str = "factory-method";
const FACTORY_BEAN_ATTRIBUTE: &str = "factory-bean";
const INDEX_ATTRIBUTE: &str = "index";
const TYPE_ATTRIBUTE: &str = "type";
const REF_ATTRIBUTE: &str = "ref";
const VALUE_ATTRIBUTE: &str = "value";
const KEY_ATTRIBUTE: &str = "key";
const KEY_REF_ATTRIBUTE: &str = "key-ref";
const VALUE_REF_ATTRIBUTE: &str = "value-ref";
const KEY_TYPE_ATTRIBUTE: &str = "key-type";
const VALUE_TYPE_ATTRIBUTE: &str = "value-type";
const MERGE_ATTRIBUTE: &str = "merge";
const BEAN_REF_ATTRIBUTE: &str = "bean";
const PARENT_REF_ATTRIBUTE: &str = "parent";
const REPLACER_ATTRIBUTE: &str = "replacer";
const ARG_TYPE_MATCH_ATTRIBUTE: &str = "match";

/// The recursive-descent engine for one configuration scope. Owns the
/// per-scope used-name set, the active defaults snapshot and the diagnostic
/// frame stack; a nested scope gets a fresh delegate that inherits only the
/// snapshot.
pub struct ParserDelegate<'a> {
    extensions: &'a ExtensionRegistry,
    type_resolver: Option<&'a dyn TypeResolver>,
    defaults: DefaultsSnapshot,
    used_names: HashSet<String>,
    diagnostics: Diagnostics,
    foreign_name_counter: usize,
}

impl<'a> ParserDelegate<'a> {
    pub fn new(
        extensions: &'a ExtensionRegistry,
        type_resolver: Option<&'a dyn TypeResolver>,
    ) -> ParserDelegate<'a> {
        ParserDelegate {
            extensions,
            type_resolver,
            defaults: DefaultsSnapshot::default(),
            used_names: HashSet::new(),
            diagnostics: Diagnostics::new(),
            foreign_name_counter: 0,
        }
    }

    /// Builds this delegate's defaults snapshot from the scope element,
    /// falling back field-by-field to the parent scope's snapshot.
    pub fn init_defaults(&mut self, root: &Element, parent: Option<&DefaultsSnapshot>) {
        self.defaults = DefaultsSnapshot::from_scope(root, parent);
    }

    pub fn defaults(&self) -> &DefaultsSnapshot {
        &self.defaults
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn report_problem(&mut self, kind: ProblemKind, span: SourceSpan) {
        self.diagnostics.report(kind, span);
    }

    pub fn is_default_namespace(&self, ele: &Element) -> bool {
        is_default_namespace_uri(ele.namespace())
    }

    fn with_frame<T>(&mut self, frame: ParseFrame, f: impl FnOnce(&mut Self) -> T) -> T {
        self.diagnostics.push_frame(frame);
        let out = f(self);
        self.diagnostics.pop_frame();
        out
    }

    /// Parses a `definition` element into a named holder. Returns `None`
    /// when the body could not be parsed; the problem is recorded and the
    /// caller simply gets no definition for this node.
    pub fn parse_definition_element(
        &mut self,
        ele: &Element,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<DefinitionHolder> {
        let id = ele.attr(ID_ATTRIBUTE).unwrap_or("");
        let mut aliases = ele
            .attr(NAME_ATTRIBUTE)
            .map(tokenize_list)
            .unwrap_or_default();

        let mut name = id.to_string();
        if name.is_empty() && !aliases.is_empty() {
            name = aliases.remove(0);
            debug!("no 'id' specified - using '{name}' as definition name, {aliases:?} as aliases");
        }

        if containing.is_none() {
            self.check_name_uniqueness(&name, &aliases, ele);
        }

        let definition = self.parse_definition_body(ele, &name, containing, registry)?;

        if name.is_empty() {
            match registry.generate_name(&definition, containing.is_some()) {
                Ok(generated) => {
                    // Top-level only: when the generator produced
                    // "type-name#counter", keep the bare type name reachable
                    // as an alias if nothing else claimed it. Legacy
                    // convenience, not a guarantee.
                    if containing.is_none() {
                        if let Some(type_name) = definition.type_name.as_deref() {
                            if generated.len() > type_name.len()
                                && generated.starts_with(type_name)
                                && !registry.is_name_in_use(type_name)
                            {
                                aliases.push(type_name.to_string());
                            }
                        }
                    }
                    debug!("neither 'id' nor 'name' specified - using generated name [{generated}]");
                    name = generated;
                }
                Err(err) => {
                    self.report_problem(
                        ProblemKind::NameGeneration {
                            message: err.to_string(),
                        },
                        ele.span(),
                    );
                    return None;
                }
            }
        }

        Some(DefinitionHolder {
            definition,
            name,
            aliases,
        })
    }

    /// Enforces per-scope uniqueness over canonical names and aliases. Only
    /// the first offender is reported; every name is recorded as used either
    /// way so one pass surfaces each clash exactly once.
    fn check_name_uniqueness(&mut self, name: &str, aliases: &[String], ele: &Element) {
        let mut found: Option<&str> = None;
        if !name.trim().is_empty() && self.used_names.contains(name) {
            found = Some(name);
        }
        if found.is_none() {
            found = aliases
                .iter()
                .find(|a| self.used_names.contains(a.as_str()))
                .map(String::as_str);
        }
        if let Some(offender) = found {
            self.report_problem(
                ProblemKind::DuplicateName {
                    name: offender.to_string(),
                },
                ele.span(),
            );
        }

        if !name.is_empty() {
            self.used_names.insert(name.to_string());
        }
        self.used_names.extend(aliases.iter().cloned());
    }

    fn parse_definition_body(
        &mut self,
        ele: &Element,
        name: &str,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<Definition> {
        let frame = ParseFrame::Definition(if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        });
        self.with_frame(frame, |this| {
            let type_name = ele
                .attr(CLASS_ATTRIBUTE)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            if let (Some(t), Some(resolver)) = (type_name.as_deref(), this.type_resolver) {
                if !resolver.can_resolve(t) {
                    this.report_problem(
                        ProblemKind::DefinitionTypeNotFound {
                            type_name: t.to_string(),
                        },
                        ele.span(),
                    );
                    return None;
                }
            }
            let parent_name = ele
                .attr(PARENT_ATTRIBUTE)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            let mut definition = Definition::new(type_name, parent_name, ele.span());
            this.parse_definition_attributes(ele, name, containing, &mut definition);

            definition.description = ele
                .children()
                .iter()
                .find(|c| this.is_default_namespace(c) && c.local_name() == DESCRIPTION_ELEMENT)
                .map(|c| c.text().to_string())
                .filter(|t| !t.is_empty());

            let mut meta = Vec::new();
            this.parse_meta_elements(ele, &mut meta);
            definition.meta = meta;

            this.parse_lookup_override_elements(ele, &mut definition);
            this.parse_replaced_method_elements(ele, &mut definition);
            this.parse_constructor_arg_elements(ele, &mut definition, registry);
            this.parse_property_elements(ele, &mut definition, registry);
            this.parse_qualifier_elements(ele, &mut definition);

            Some(definition)
        })
    }

    fn parse_definition_attributes(
        &mut self,
        ele: &Element,
        name: &str,
        containing: Option<&Definition>,
        bd: &mut Definition,
    ) {
        if ele.has_attr(SINGLETON_ATTRIBUTE) {
            self.report_problem(ProblemKind::LegacySingletonAttribute, ele.span());
        } else if let Some(scope) = ele.attr(SCOPE_ATTRIBUTE) {
            bd.scope = Some(scope.to_string());
        } else if let Some(containing) = containing {
            // Inner definitions without an explicit scope share their
            // containing definition's scope.
            bd.scope = containing.scope.clone();
        }

        if let Some(raw) = ele.attr(ABSTRACT_ATTRIBUTE) {
            bd.is_abstract = raw == TRUE_VALUE;
        }

        let lazy = ele.attr(LAZY_INIT_ATTRIBUTE).unwrap_or(DEFAULT_VALUE);
        bd.lazy_init = if lazy == DEFAULT_VALUE {
            self.defaults.lazy_init
        } else {
            lazy == TRUE_VALUE
        };

        bd.autowire = self.autowire_mode(ele.attr(AUTOWIRE_ATTRIBUTE).unwrap_or(DEFAULT_VALUE));

        if let Some(depends) = ele.attr(DEPENDS_ON_ATTRIBUTE) {
            bd.depends_on = tokenize_list(depends);
        }

        let candidate = ele.attr(AUTOWIRE_CANDIDATE_ATTRIBUTE).unwrap_or("");
        if candidate.is_empty() || candidate == DEFAULT_VALUE {
            if let Some(patterns) = &self.defaults.autowire_candidates {
                // The name may still be empty here; generation happens after
                // the body parse and the patterns see whatever we have.
                bd.autowire_candidate = any_pattern_matches(patterns, name);
            }
        } else {
            bd.autowire_candidate = candidate == TRUE_VALUE;
        }

        if let Some(raw) = ele.attr(PRIMARY_ATTRIBUTE) {
            bd.primary = raw == TRUE_VALUE;
        }

        if let Some(init) = ele.attr(INIT_METHOD_ATTRIBUTE) {
            bd.init_method = Some(init.to_string());
        } else if let Some(default_init) = &self.defaults.init_method {
            bd.init_method = Some(default_init.clone());
            bd.enforce_init_method = false;
        }

        if let Some(destroy) = ele.attr(DESTROY_METHOD_ATTRIBUTE) {
            bd.destroy_method = Some(destroy.to_string());
        } else if let Some(default_destroy) = &self.defaults.destroy_method {
            bd.destroy_method = Some(default_destroy.clone());
            bd.enforce_destroy_method = false;
        }

        if let Some(factory_method) = ele.attr(FACTORY_METHOD_ATTRIBUTE) {
            bd.factory_method = Some(factory_method.to_string());
        }
        if let Some(factory_bean) = ele.attr(FACTORY_BEAN_ATTRIBUTE) {
            bd.factory_bean = Some(factory_bean.to_string());
        }
    }

    fn autowire_mode(&self, raw: &str) -> AutowireMode {
        if raw == DEFAULT_VALUE || raw.is_empty() {
            self.defaults.autowire
        } else {
            AutowireMode::from_attr(raw)
        }
    }

    fn parse_meta_elements(&mut self, ele: &Element, out: &mut Vec<(String, String)>) {
        for child in ele.children() {
            if self.is_default_namespace(child) && child.local_name() == META_ELEMENT {
                let key = child.attr(KEY_ATTRIBUTE).unwrap_or("").to_string();
                let value = child.attr(VALUE_ATTRIBUTE).unwrap_or("").to_string();
                out.push((key, value));
            }
        }
    }

    fn parse_lookup_override_elements(&mut self, ele: &Element, bd: &mut Definition) {
        for child in ele.children() {
            if self.is_default_namespace(child) && child.local_name() == LOOKUP_METHOD_ELEMENT {
                let method = child.attr(NAME_ATTRIBUTE).unwrap_or("").to_string();
                let target = child.attr(BEAN_REF_ATTRIBUTE).unwrap_or("").to_string();
                bd.method_overrides
                    .push(MethodOverride::Redirect { method, target });
            }
        }
    }

    fn parse_replaced_method_elements(&mut self, ele: &Element, bd: &mut Definition) {
        for child in ele.children() {
            if !(self.is_default_namespace(child) && child.local_name() == REPLACED_METHOD_ELEMENT)
            {
                continue;
            }
            let method = child.attr(NAME_ATTRIBUTE).unwrap_or("").to_string();
            let replacer = child.attr(REPLACER_ATTRIBUTE).unwrap_or("").to_string();
            let mut arg_types = Vec::new();
            for arg in child.children_by_name(ARG_TYPE_ELEMENT) {
                let matched = arg
                    .attr(ARG_TYPE_MATCH_ATTRIBUTE)
                    .filter(|m| !m.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| arg.text().trim().to_string());
                if !matched.is_empty() {
                    arg_types.push(matched);
                }
            }
            bd.method_overrides.push(MethodOverride::Replace {
                method,
                replacer,
                arg_types,
            });
        }
    }

    fn parse_constructor_arg_elements(
        &mut self,
        ele: &Element,
        bd: &mut Definition,
        registry: &mut dyn DefinitionRegistry,
    ) {
        for child in ele.children() {
            if self.is_default_namespace(child) && child.local_name() == CONSTRUCTOR_ARG_ELEMENT {
                self.parse_constructor_arg_element(child, bd, registry);
            }
        }
    }

    fn parse_constructor_arg_element(
        &mut self,
        ele: &Element,
        bd: &mut Definition,
        registry: &mut dyn DefinitionRegistry,
    ) {
        let type_attr = ele
            .attr(TYPE_ATTRIBUTE)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let name_attr = ele
            .attr(NAME_ATTRIBUTE)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if let Some(raw_index) = ele.attr(INDEX_ATTRIBUTE).filter(|s| !s.is_empty()) {
            let index = match raw_index.parse::<i64>() {
                Ok(index) if index < 0 => {
                    self.report_problem(ProblemKind::NegativeIndex, ele.span());
                    return;
                }
                Ok(index) => index as usize,
                Err(_) => {
                    self.report_problem(
                        ProblemKind::InvalidIndex {
                            raw: raw_index.to_string(),
                        },
                        ele.span(),
                    );
                    return;
                }
            };
            self.with_frame(ParseFrame::ConstructorArg(Some(index)), |this| {
                let Some(value) = this.parse_value_expression(ele, None, Some(&*bd), registry)
                else {
                    return;
                };
                if bd.constructor_args.has_index(index) {
                    this.report_problem(ProblemKind::DuplicateIndex { index }, ele.span());
                    return;
                }
                bd.constructor_args.indexed.push((
                    index,
                    ValueHolder {
                        value,
                        type_name: type_attr,
                        name: name_attr,
                        span: ele.span(),
                    },
                ));
            });
        } else {
            self.with_frame(ParseFrame::ConstructorArg(None), |this| {
                let Some(value) = this.parse_value_expression(ele, None, Some(&*bd), registry)
                else {
                    return;
                };
                bd.constructor_args.generic.push(ValueHolder {
                    value,
                    type_name: type_attr,
                    name: name_attr,
                    span: ele.span(),
                });
            });
        }
    }

    fn parse_property_elements(
        &mut self,
        ele: &Element,
        bd: &mut Definition,
        registry: &mut dyn DefinitionRegistry,
    ) {
        for child in ele.children() {
            if self.is_default_namespace(child) && child.local_name() == PROPERTY_ELEMENT {
                self.parse_property_element(child, bd, registry);
            }
        }
    }

    fn parse_property_element(
        &mut self,
        ele: &Element,
        bd: &mut Definition,
        registry: &mut dyn DefinitionRegistry,
    ) {
        let Some(name) = ele.attr(NAME_ATTRIBUTE).filter(|s| !s.is_empty()) else {
            self.report_problem(
                ProblemKind::MissingAttribute {
                    element: PROPERTY_ELEMENT.to_string(),
                    attribute: NAME_ATTRIBUTE.to_string(),
                },
                ele.span(),
            );
            return;
        };
        let name = name.to_string();
        self.with_frame(ParseFrame::Property(name.clone()), |this| {
            // Only the first occurrence of a property name counts.
            if bd.properties.iter().any(|p| p.name == name) {
                this.report_problem(
                    ProblemKind::DuplicateProperty { name: name.clone() },
                    ele.span(),
                );
                return;
            }
            let Some(value) =
                this.parse_value_expression(ele, Some(name.as_str()), Some(&*bd), registry)
            else {
                return;
            };
            let mut meta = Vec::new();
            this.parse_meta_elements(ele, &mut meta);
            bd.properties.push(PropertyValue {
                name: name.clone(),
                value,
                meta,
                span: ele.span(),
            });
        });
    }

    fn parse_qualifier_elements(&mut self, ele: &Element, bd: &mut Definition) {
        for child in ele.children() {
            if self.is_default_namespace(child) && child.local_name() == QUALIFIER_ELEMENT {
                self.parse_qualifier_element(child, bd);
            }
        }
    }

    fn parse_qualifier_element(&mut self, ele: &Element, bd: &mut Definition) {
        let Some(type_name) = ele.attr(TYPE_ATTRIBUTE).filter(|s| !s.is_empty()) else {
            self.report_problem(
                ProblemKind::MissingAttribute {
                    element: QUALIFIER_ELEMENT.to_string(),
                    attribute: TYPE_ATTRIBUTE.to_string(),
                },
                ele.span(),
            );
            return;
        };
        let type_name = type_name.to_string();
        self.with_frame(ParseFrame::Qualifier(type_name.clone()), |this| {
            let mut qualifier = Qualifier {
                type_name: type_name.clone(),
                attributes: Vec::new(),
                span: ele.span(),
            };
            if let Some(value) = ele.attr(VALUE_ATTRIBUTE).filter(|s| !s.is_empty()) {
                qualifier
                    .attributes
                    .push((VALUE_ATTRIBUTE.to_string(), value.to_string()));
            }
            for child in ele.children() {
                if !(this.is_default_namespace(child)
                    && child.local_name() == QUALIFIER_ATTRIBUTE_ELEMENT)
                {
                    continue;
                }
                let key = child.attr(KEY_ATTRIBUTE).filter(|s| !s.is_empty());
                let value = child.attr(VALUE_ATTRIBUTE).filter(|s| !s.is_empty());
                match (key, value) {
                    (Some(key), Some(value)) => {
                        qualifier
                            .attributes
                            .push((key.to_string(), value.to_string()));
                    }
                    _ => {
                        this.report_problem(
                            ProblemKind::QualifierAttributeIncomplete,
                            child.span(),
                        );
                        return;
                    }
                }
            }
            bd.qualifiers.push(qualifier);
        });
    }

    /// Parses the value of a `property` or `constructor-arg` element: a
    /// `ref` attribute, a `value` attribute, or exactly one qualifying child
    /// element. Any two together, or none, is a structural problem and no
    /// node is produced.
    fn parse_value_expression(
        &mut self,
        ele: &Element,
        property_name: Option<&str>,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<ValueNode> {
        let context = match property_name {
            Some(name) => format!("<property> element for property '{name}'"),
            None => "<constructor-arg> element".to_string(),
        };

        let mut sub_element: Option<&Element> = None;
        for child in ele.children() {
            if self.is_default_namespace(child)
                && matches!(child.local_name(), DESCRIPTION_ELEMENT | META_ELEMENT)
            {
                continue;
            }
            if sub_element.is_some() {
                self.report_problem(
                    ProblemKind::MultipleSubElements {
                        context: context.clone(),
                    },
                    ele.span(),
                );
            } else {
                sub_element = Some(child);
            }
        }

        let ref_attr = ele.attr(REF_ATTRIBUTE);
        let value_attr = ele.attr(VALUE_ATTRIBUTE);
        let sources =
            usize::from(ref_attr.is_some()) + usize::from(value_attr.is_some())
                + usize::from(sub_element.is_some());
        if sources > 1 {
            self.report_problem(ProblemKind::AmbiguousValueSource { context }, ele.span());
            return None;
        }

        if let Some(name) = ref_attr {
            if name.trim().is_empty() {
                self.report_problem(ProblemKind::EmptyReference { context }, ele.span());
                return None;
            }
            return Some(ValueNode::BeanRef {
                name: name.to_string(),
                to_parent: false,
            });
        }
        if let Some(value) = value_attr {
            return Some(ValueNode::Scalar {
                value: value.to_string(),
                type_name: None,
            });
        }
        if let Some(sub) = sub_element {
            return self.parse_value_sub_element(sub, containing, None, registry);
        }

        self.report_problem(ProblemKind::MissingValueSource { context }, ele.span());
        None
    }

    /// Dispatches one value sub-element by identity. Foreign-grammar
    /// elements go through the extension registry; unknown default-grammar
    /// elements are structural problems.
    fn parse_value_sub_element(
        &mut self,
        ele: &Element,
        containing: Option<&Definition>,
        default_type: Option<&str>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<ValueNode> {
        if !self.is_default_namespace(ele) {
            return self.parse_nested_foreign_element(ele, containing, registry);
        }
        match ele.local_name() {
            DEFINITION_ELEMENT => {
                let holder = self.parse_definition_element(ele, containing, registry)?;
                let holder = self.decorate_definition(ele, holder, containing, registry);
                Some(ValueNode::Nested(Box::new(holder)))
            }
            REF_ELEMENT => self.parse_ref_element(ele),
            IDREF_ELEMENT => self.parse_idref_element(ele),
            VALUE_ELEMENT => Some(self.parse_value_element(ele, default_type)),
            NULL_ELEMENT => Some(ValueNode::Null),
            ARRAY_ELEMENT | LIST_ELEMENT | SET_ELEMENT => {
                self.parse_collection_element(ele, containing, registry)
            }
            MAP_ELEMENT => Some(self.parse_map_element(ele, containing, registry)),
            PROPS_ELEMENT => Some(self.parse_props_element(ele)),
            other => {
                self.report_problem(
                    ProblemKind::UnknownElement {
                        name: other.to_string(),
                    },
                    ele.span(),
                );
                None
            }
        }
    }

    fn parse_ref_element(&mut self, ele: &Element) -> Option<ValueNode> {
        let (name, to_parent) = match ele.attr(BEAN_REF_ATTRIBUTE).filter(|s| !s.is_empty()) {
            Some(name) => (name, false),
            None => match ele.attr(PARENT_REF_ATTRIBUTE).filter(|s| !s.is_empty()) {
                Some(name) => (name, true),
                None => {
                    self.report_problem(
                        ProblemKind::MissingAttribute {
                            element: REF_ELEMENT.to_string(),
                            attribute: "bean' or 'parent".to_string(),
                        },
                        ele.span(),
                    );
                    return None;
                }
            },
        };
        if name.trim().is_empty() {
            self.report_problem(
                ProblemKind::EmptyReference {
                    context: "<ref> element".to_string(),
                },
                ele.span(),
            );
            return None;
        }
        Some(ValueNode::BeanRef {
            name: name.to_string(),
            to_parent,
        })
    }

    fn parse_idref_element(&mut self, ele: &Element) -> Option<ValueNode> {
        let Some(name) = ele.attr(BEAN_REF_ATTRIBUTE).filter(|s| !s.is_empty()) else {
            self.report_problem(
                ProblemKind::MissingAttribute {
                    element: IDREF_ELEMENT.to_string(),
                    attribute: BEAN_REF_ATTRIBUTE.to_string(),
                },
                ele.span(),
            );
            return None;
        };
        if name.trim().is_empty() {
            self.report_problem(
                ProblemKind::EmptyReference {
                    context: "<idref> element".to_string(),
                },
                ele.span(),
            );
            return None;
        }
        Some(ValueNode::NameRef {
            name: name.to_string(),
        })
    }

    fn parse_value_element(&mut self, ele: &Element, default_type: Option<&str>) -> ValueNode {
        let type_name = ele
            .attr(TYPE_ATTRIBUTE)
            .filter(|s| !s.is_empty())
            .or(default_type);
        self.build_typed_scalar(ele.text().to_string(), type_name, ele.span())
    }

    /// Attaches a declared type to a scalar, falling back to an untyped one
    /// when the configured resolver rejects the type name.
    fn build_typed_scalar(
        &mut self,
        value: String,
        type_name: Option<&str>,
        span: SourceSpan,
    ) -> ValueNode {
        if let (Some(t), Some(resolver)) = (type_name, self.type_resolver) {
            if !resolver.can_resolve(t) {
                self.report_problem(
                    ProblemKind::TypeNotFound {
                        type_name: t.to_string(),
                    },
                    span,
                );
                return ValueNode::Scalar {
                    value,
                    type_name: None,
                };
            }
        }
        ValueNode::Scalar {
            value,
            type_name: type_name.map(str::to_string),
        }
    }

    fn parse_collection_element(
        &mut self,
        ele: &Element,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<ValueNode> {
        let element_type = ele
            .attr(VALUE_TYPE_ATTRIBUTE)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let merge = self.parse_merge_attribute(ele);

        let mut elements = Vec::new();
        for child in ele.children() {
            if self.is_default_namespace(child) && child.local_name() == DESCRIPTION_ELEMENT {
                continue;
            }
            if let Some(node) =
                self.parse_value_sub_element(child, containing, element_type.as_deref(), registry)
            {
                elements.push(node);
            }
        }

        match ele.local_name() {
            ARRAY_ELEMENT => Some(ValueNode::Array {
                elements,
                element_type,
                merge,
            }),
            LIST_ELEMENT => Some(ValueNode::List {
                elements,
                element_type,
                merge,
            }),
            SET_ELEMENT => Some(ValueNode::Set {
                elements,
                element_type,
                merge,
            }),
            _ => unreachable!("dispatched on element identity"),
        }
    }

    fn parse_map_element(
        &mut self,
        ele: &Element,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> ValueNode {
        let key_type = ele
            .attr(KEY_TYPE_ATTRIBUTE)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let value_type = ele
            .attr(VALUE_TYPE_ATTRIBUTE)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let merge = self.parse_merge_attribute(ele);

        let mut entries: Vec<(ValueNode, ValueNode)> = Vec::new();
        for entry in ele.children() {
            if !(self.is_default_namespace(entry) && entry.local_name() == ENTRY_ELEMENT) {
                continue;
            }
            if let Some((key, value)) = self.parse_map_entry(
                entry,
                containing,
                key_type.as_deref(),
                value_type.as_deref(),
                registry,
            ) {
                // Ordered-map put semantics: a duplicate key overwrites the
                // earlier value in place.
                if let Some(existing) = entries.iter_mut().find(|(k, _)| *k == key) {
                    existing.1 = value;
                } else {
                    entries.push((key, value));
                }
            }
        }

        ValueNode::Map {
            entries,
            key_type,
            value_type,
            merge,
        }
    }

    fn parse_map_entry(
        &mut self,
        entry: &Element,
        containing: Option<&Definition>,
        default_key_type: Option<&str>,
        default_value_type: Option<&str>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<(ValueNode, ValueNode)> {
        let mut key_ele: Option<&Element> = None;
        let mut value_ele: Option<&Element> = None;
        for child in entry.children() {
            if self.is_default_namespace(child) && child.local_name() == KEY_ELEMENT {
                if key_ele.is_some() {
                    self.report_problem(ProblemKind::MultipleKeyElements, entry.span());
                } else {
                    key_ele = Some(child);
                }
            } else if self.is_default_namespace(child)
                && child.local_name() == DESCRIPTION_ELEMENT
            {
                // ignore
            } else if value_ele.is_some() {
                self.report_problem(
                    ProblemKind::MultipleSubElements {
                        context: "<entry> element".to_string(),
                    },
                    entry.span(),
                );
            } else {
                value_ele = Some(child);
            }
        }

        let has_key_attr = entry.has_attr(KEY_ATTRIBUTE);
        let has_key_ref = entry.has_attr(KEY_REF_ATTRIBUTE);
        if (has_key_attr && has_key_ref)
            || ((has_key_attr || has_key_ref) && key_ele.is_some())
        {
            self.report_problem(ProblemKind::AmbiguousEntryKey, entry.span());
            return None;
        }
        let key = if has_key_attr {
            Some(self.build_typed_scalar(
                entry.attr(KEY_ATTRIBUTE).unwrap_or("").to_string(),
                default_key_type,
                entry.span(),
            ))
        } else if has_key_ref {
            let name = entry.attr(KEY_REF_ATTRIBUTE).unwrap_or("");
            if name.trim().is_empty() {
                self.report_problem(
                    ProblemKind::EmptyReference {
                        context: "<entry> 'key-ref' attribute".to_string(),
                    },
                    entry.span(),
                );
                None
            } else {
                Some(ValueNode::BeanRef {
                    name: name.to_string(),
                    to_parent: false,
                })
            }
        } else if let Some(key_ele) = key_ele {
            self.parse_key_element(key_ele, containing, default_key_type, registry)
        } else {
            self.report_problem(ProblemKind::MissingEntryKey, entry.span());
            None
        };

        let has_value_attr = entry.has_attr(VALUE_ATTRIBUTE);
        let has_value_ref = entry.has_attr(VALUE_REF_ATTRIBUTE);
        let has_value_type = entry.has_attr(VALUE_TYPE_ATTRIBUTE);
        if (has_value_attr && has_value_ref)
            || ((has_value_attr || has_value_ref) && value_ele.is_some())
        {
            self.report_problem(ProblemKind::AmbiguousEntryValue, entry.span());
            return None;
        }
        if has_value_type && (has_value_ref || !has_value_attr || value_ele.is_some()) {
            self.report_problem(ProblemKind::IllegalValueType, entry.span());
            return None;
        }
        let value = if has_value_attr {
            let value_type = entry
                .attr(VALUE_TYPE_ATTRIBUTE)
                .filter(|s| !s.is_empty())
                .or(default_value_type);
            Some(self.build_typed_scalar(
                entry.attr(VALUE_ATTRIBUTE).unwrap_or("").to_string(),
                value_type,
                entry.span(),
            ))
        } else if has_value_ref {
            let name = entry.attr(VALUE_REF_ATTRIBUTE).unwrap_or("");
            if name.trim().is_empty() {
                self.report_problem(
                    ProblemKind::EmptyReference {
                        context: "<entry> 'value-ref' attribute".to_string(),
                    },
                    entry.span(),
                );
                None
            } else {
                Some(ValueNode::BeanRef {
                    name: name.to_string(),
                    to_parent: false,
                })
            }
        } else if let Some(value_ele) = value_ele {
            self.parse_value_sub_element(value_ele, containing, default_value_type, registry)
        } else {
            self.report_problem(ProblemKind::MissingEntryValue, entry.span());
            None
        };

        match (key, value) {
            (Some(key), Some(value)) => Some((key, value)),
            // The offending half was already reported; the entry is omitted.
            _ => None,
        }
    }

    fn parse_key_element(
        &mut self,
        key_ele: &Element,
        containing: Option<&Definition>,
        default_key_type: Option<&str>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<ValueNode> {
        let mut sub_element: Option<&Element> = None;
        for child in key_ele.children() {
            if sub_element.is_some() {
                self.report_problem(
                    ProblemKind::MultipleSubElements {
                        context: "<key> element".to_string(),
                    },
                    key_ele.span(),
                );
            } else {
                sub_element = Some(child);
            }
        }
        let sub = sub_element?;
        self.parse_value_sub_element(sub, containing, default_key_type, registry)
    }

    fn parse_props_element(&mut self, ele: &Element) -> ValueNode {
        let merge = self.parse_merge_attribute(ele);
        let mut entries = Vec::new();
        for prop in ele.children() {
            if self.is_default_namespace(prop) && prop.local_name() == PROP_ELEMENT {
                let key = prop.attr(KEY_ATTRIBUTE).unwrap_or("").to_string();
                // Trim to shed the indentation whitespace typical of markup
                // formatting.
                let value = prop.text().trim().to_string();
                entries.push((key, value));
            }
        }
        ValueNode::PropertyTable { entries, merge }
    }

    /// Resolves the `merge` attribute of a container element; the sentinel
    /// falls back to the scope defaults.
    fn parse_merge_attribute(&self, ele: &Element) -> bool {
        let raw = ele.attr(MERGE_ATTRIBUTE).unwrap_or(DEFAULT_VALUE);
        if raw == DEFAULT_VALUE {
            self.defaults.merge
        } else {
            raw == TRUE_VALUE
        }
    }

    /// Routes a foreign-grammar element to its namespace extension. A
    /// missing handler under the core family prefix is an error; anything
    /// else is ignored.
    pub fn parse_foreign_element(
        &mut self,
        ele: &Element,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<Definition> {
        let namespace = ele.namespace()?.to_string();
        match self.extensions.resolve(&namespace) {
            Some(handler) => {
                let mut ctx = ExtensionContext {
                    delegate: self,
                    registry,
                    containing,
                };
                handler.parse(ele, &mut ctx)
            }
            None => {
                if ExtensionRegistry::is_core_family(&namespace) {
                    self.report_problem(
                        ProblemKind::UnresolvableNamespace { namespace },
                        ele.span(),
                    );
                } else {
                    debug!("no extension handler for namespace [{namespace}], ignoring");
                }
                None
            }
        }
    }

    fn parse_nested_foreign_element(
        &mut self,
        ele: &Element,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<ValueNode> {
        let Some(definition) = self.parse_foreign_element(ele, containing, registry) else {
            self.report_problem(
                ProblemKind::NestedForeignElement {
                    name: ele.local_name().to_string(),
                },
                ele.span(),
            );
            return None;
        };
        self.foreign_name_counter += 1;
        let name = format!(
            "{}{GENERATED_NAME_SEPARATOR}{}",
            ele.local_name(),
            self.foreign_name_counter
        );
        debug!("using generated name [{name}] for nested foreign element");
        Some(ValueNode::Nested(Box::new(DefinitionHolder::new(
            definition, name,
        ))))
    }

    /// Offers every foreign attribute, then every foreign child element, of
    /// a parsed definition to the extension registry's decorate capability,
    /// in document order.
    pub fn decorate_definition(
        &mut self,
        ele: &Element,
        holder: DefinitionHolder,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> DefinitionHolder {
        let mut decorated = holder;
        for attr in ele.attributes() {
            if let Some(namespace) = attr.namespace.as_deref() {
                let node = ForeignNode::Attribute {
                    namespace,
                    name: &attr.name,
                    value: &attr.value,
                };
                decorated = self.decorate_if_required(
                    &node, namespace, ele.span(), decorated, containing, registry,
                );
            }
        }
        for child in ele.children() {
            if let Some(namespace) = child.namespace() {
                if !is_default_namespace_uri(Some(namespace)) {
                    let node = ForeignNode::Element(child);
                    decorated = self.decorate_if_required(
                        &node, namespace, child.span(), decorated, containing, registry,
                    );
                }
            }
        }
        decorated
    }

    fn decorate_if_required(
        &mut self,
        node: &ForeignNode<'_>,
        namespace: &str,
        span: SourceSpan,
        holder: DefinitionHolder,
        containing: Option<&Definition>,
        registry: &mut dyn DefinitionRegistry,
    ) -> DefinitionHolder {
        if is_default_namespace_uri(Some(namespace)) {
            return holder;
        }
        match self.extensions.resolve(namespace) {
            Some(handler) => {
                let mut ctx = ExtensionContext {
                    delegate: self,
                    registry,
                    containing,
                };
                handler.decorate(node, holder, &mut ctx)
            }
            None => {
                if ExtensionRegistry::is_core_family(namespace) {
                    self.report_problem(
                        ProblemKind::UnresolvableNamespace {
                            namespace: namespace.to_string(),
                        },
                        span,
                    );
                } else {
                    debug!("no extension handler for namespace [{namespace}], not decorating");
                }
                holder
            }
        }
    }
}
