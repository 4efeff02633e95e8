use crate::model::{Definition, DefinitionHolder};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Separator between the base name and the counter in generated names.
pub const GENERATED_NAME_SEPARATOR: &str = "#";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("definition has neither a declared type, a parent, nor a factory target to derive a name from")]
pub struct NameGenerationError;

/// The collaborator completed definitions are handed to. Its consistency
/// under concurrent registration is its own responsibility; the parser only
/// ever talks to it from one thread.
pub trait DefinitionRegistry {
    fn register(&mut self, holder: DefinitionHolder);
    fn is_name_in_use(&self, name: &str) -> bool;
    /// Produces a deterministic name for an anonymous definition. `nested`
    /// selects the scoped generator used for definitions nested inside
    /// another definition's value.
    fn generate_name(
        &mut self,
        definition: &Definition,
        nested: bool,
    ) -> Result<String, NameGenerationError>;
}

/// Decides whether a declared type name can be resolved to a loadable
/// implementation. When no resolver is configured, every declared type is
/// kept as an opaque hint.
pub trait TypeResolver {
    fn can_resolve(&self, type_name: &str) -> bool;
}

/// A registry keeping definitions in memory, in registration order. The
/// first registration for a name wins; later ones are dropped.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    definitions: HashMap<String, DefinitionHolder>,
    aliases: HashMap<String, String>,
    order: Vec<String>,
    nested_counter: usize,
}

/// Serializable view of one registered definition, used by the JSON/YAML
/// dumps.
#[derive(Serialize)]
pub struct RegisteredDefinition<'a> {
    pub name: &'a str,
    pub aliases: &'a [String],
    pub definition: &'a Definition,
}

impl InMemoryRegistry {
    pub fn new() -> InMemoryRegistry {
        InMemoryRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered canonical names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Looks up a definition by canonical name or alias. Canonical names
    /// take precedence, so an alias can never shadow one.
    pub fn get(&self, name: &str) -> Option<&DefinitionHolder> {
        if let Some(holder) = self.definitions.get(name) {
            return Some(holder);
        }
        let canonical = self.aliases.get(name)?;
        self.definitions.get(canonical)
    }

    pub fn export(&self) -> Vec<RegisteredDefinition<'_>> {
        self.order
            .iter()
            .map(|name| {
                let holder = &self.definitions[name];
                RegisteredDefinition {
                    name: &holder.name,
                    aliases: &holder.aliases,
                    definition: &holder.definition,
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.export())
    }

    fn base_name(definition: &Definition) -> Result<String, NameGenerationError> {
        if let Some(type_name) = &definition.type_name {
            return Ok(type_name.clone());
        }
        if let Some(parent) = &definition.parent_name {
            return Ok(format!("{parent}$child"));
        }
        if let Some(factory) = &definition.factory_bean {
            return Ok(format!("{factory}$created"));
        }
        Err(NameGenerationError)
    }
}

impl DefinitionRegistry for InMemoryRegistry {
    fn register(&mut self, holder: DefinitionHolder) {
        if self.is_name_in_use(&holder.name) {
            log::debug!("ignoring duplicate registration for '{}'", holder.name);
            return;
        }
        for alias in &holder.aliases {
            // An alias never displaces an earlier registration under the
            // same name.
            if self.is_name_in_use(alias) {
                log::debug!("ignoring alias '{alias}' already bound to an earlier definition");
                continue;
            }
            self.aliases.insert(alias.clone(), holder.name.clone());
        }
        self.order.push(holder.name.clone());
        self.definitions.insert(holder.name.clone(), holder);
    }

    fn is_name_in_use(&self, name: &str) -> bool {
        self.definitions.contains_key(name) || self.aliases.contains_key(name)
    }

    fn generate_name(
        &mut self,
        definition: &Definition,
        nested: bool,
    ) -> Result<String, NameGenerationError> {
        let base = Self::base_name(definition)?;
        if nested {
            // Nested definitions never reach the registry under their own
            // name, so a monotone counter keeps them distinct.
            loop {
                self.nested_counter += 1;
                let candidate =
                    format!("{base}{GENERATED_NAME_SEPARATOR}{}", self.nested_counter);
                if !self.is_name_in_use(&candidate) {
                    return Ok(candidate);
                }
            }
        }
        let mut counter = 0usize;
        loop {
            let candidate = format!("{base}{GENERATED_NAME_SEPARATOR}{counter}");
            if !self.is_name_in_use(&candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition_of(type_name: &str) -> Definition {
        Definition::new(Some(type_name.to_string()), None, (0, 0).into())
    }

    #[test]
    fn generated_names_are_deterministic() {
        let mut registry = InMemoryRegistry::new();
        let def = definition_of("acme.Mailer");
        assert_eq!(registry.generate_name(&def, false).unwrap(), "acme.Mailer#0");

        registry.register(DefinitionHolder::new(def.clone(), "acme.Mailer#0"));
        assert_eq!(registry.generate_name(&def, false).unwrap(), "acme.Mailer#1");
    }

    #[test]
    fn base_name_falls_back_to_parent_then_factory() {
        let mut registry = InMemoryRegistry::new();
        let child = Definition::new(None, Some("tpl".to_string()), (0, 0).into());
        assert_eq!(registry.generate_name(&child, false).unwrap(), "tpl$child#0");

        let mut created = Definition::new(None, None, (0, 0).into());
        created.factory_bean = Some("factory".to_string());
        assert_eq!(
            registry.generate_name(&created, false).unwrap(),
            "factory$created#0"
        );

        let bare = Definition::new(None, None, (0, 0).into());
        assert_eq!(registry.generate_name(&bare, false), Err(NameGenerationError));
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = InMemoryRegistry::new();
        let mut first = definition_of("a.B");
        first.primary = true;
        registry.register(DefinitionHolder::new(first, "svc"));
        registry.register(DefinitionHolder::new(definition_of("a.C"), "svc"));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("svc").unwrap().definition.primary);
    }

    #[test]
    fn alias_never_shadows_an_earlier_canonical_name() {
        let mut registry = InMemoryRegistry::new();
        registry.register(DefinitionHolder::new(definition_of("acme.First"), "a"));
        let mut second = DefinitionHolder::new(definition_of("acme.Second"), "b");
        second.aliases = vec!["a".to_string()];
        registry.register(second);

        assert_eq!(registry.len(), 2);
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
    fn aliases_resolve_to_canonical_definition() {
        let mut registry = InMemoryRegistry::new();
        let mut holder = DefinitionHolder::new(definition_of("a.B"), "svc");
        holder.aliases = vec!["other".to_string()];
        registry.register(holder);

        assert!(registry.is_name_in_use("other"));
        assert_eq!(registry.get("other").unwrap().name, "svc");
    }
}
