use crate::element::Element;
use crate::model::AutowireMode;
use crate::parser::{DEFAULT_VALUE, TRUE_VALUE};
use crate::utils::comma_list;

/// The six scope-inheritable default options. Built once per scope from the
/// scope element's explicit attributes, falling back field-by-field to the
/// parent scope's snapshot; immutable afterwards and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultsSnapshot {
    pub lazy_init: bool,
    pub merge: bool,
    pub autowire: AutowireMode,
    /// Glob patterns matched against definition names when the
    /// `autowire-candidate` attribute is absent or `"default"`.
    pub autowire_candidates: Option<Vec<String>>,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
}

const DEFAULT_LAZY_INIT: &str = "default-lazy-init";
const DEFAULT_MERGE: &str = "default-merge";
const DEFAULT_AUTOWIRE: &str = "default-autowire";
const DEFAULT_AUTOWIRE_CANDIDATES: &str = "default-autowire-candidates";
const DEFAULT_INIT_METHOD: &str = "default-init-method";
const DEFAULT_DESTROY_METHOD: &str = "default-destroy-method";

impl DefaultsSnapshot {
    /// Builds the snapshot for one scope element. An absent attribute or the
    /// literal `"default"` inherits the parent's value; the bottom of the
    /// chain is lazy-init=false, merge=false, autowire=no.
    pub fn from_scope(root: &Element, parent: Option<&DefaultsSnapshot>) -> DefaultsSnapshot {
        let lazy_init = match root.attr(DEFAULT_LAZY_INIT) {
            Some(raw) if raw != DEFAULT_VALUE => raw == TRUE_VALUE,
            _ => parent.is_some_and(|p| p.lazy_init),
        };
        let merge = match root.attr(DEFAULT_MERGE) {
            Some(raw) if raw != DEFAULT_VALUE => raw == TRUE_VALUE,
            _ => parent.is_some_and(|p| p.merge),
        };
        let autowire = match root.attr(DEFAULT_AUTOWIRE) {
            Some(raw) if raw != DEFAULT_VALUE => AutowireMode::from_attr(raw),
            _ => parent.map_or(AutowireMode::No, |p| p.autowire),
        };
        let autowire_candidates = match root.attr(DEFAULT_AUTOWIRE_CANDIDATES) {
            Some(raw) => Some(comma_list(raw)),
            None => parent.and_then(|p| p.autowire_candidates.clone()),
        };
        let init_method = match root.attr(DEFAULT_INIT_METHOD) {
            Some(raw) => Some(raw.to_string()),
            None => parent.and_then(|p| p.init_method.clone()),
        };
        let destroy_method = match root.attr(DEFAULT_DESTROY_METHOD) {
            Some(raw) => Some(raw.to_string()),
            None => parent.and_then(|p| p.destroy_method.clone()),
        };

        DefaultsSnapshot {
            lazy_init,
            merge,
            autowire,
            autowire_candidates,
            init_method,
            destroy_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_level_defaults() {
        let snapshot = DefaultsSnapshot::from_scope(&Element::new("definitions"), None);
        assert!(!snapshot.lazy_init);
        assert!(!snapshot.merge);
        assert_eq!(snapshot.autowire, AutowireMode::No);
        assert!(snapshot.autowire_candidates.is_none());
        assert!(snapshot.init_method.is_none());
    }

    #[test]
    fn sentinel_inherits_from_parent() {
        let outer = Element::new("definitions")
            .with_attr("default-lazy-init", "true")
            .with_attr("default-merge", "true")
            .with_attr("default-autowire", "by-name")
            .with_attr("default-init-method", "start");
        let parent = DefaultsSnapshot::from_scope(&outer, None);

        let inner = Element::new("definitions")
            .with_attr("default-lazy-init", "default")
            .with_attr("default-autowire", "constructor");
        let child = DefaultsSnapshot::from_scope(&inner, Some(&parent));

        assert!(child.lazy_init);
        assert!(child.merge);
        assert_eq!(child.autowire, AutowireMode::Constructor);
        assert_eq!(child.init_method.as_deref(), Some("start"));
    }

    #[test]
    fn explicit_false_beats_inherited_true() {
        let outer = Element::new("definitions").with_attr("default-merge", "true");
        let parent = DefaultsSnapshot::from_scope(&outer, None);
        let inner = Element::new("definitions").with_attr("default-merge", "false");
        let child = DefaultsSnapshot::from_scope(&inner, Some(&parent));
        assert!(!child.merge);
    }

    #[test]
    fn candidate_patterns_are_comma_split() {
        let root =
            Element::new("definitions").with_attr("default-autowire-candidates", "*Service, *Dao");
        let snapshot = DefaultsSnapshot::from_scope(&root, None);
        assert_eq!(
            snapshot.autowire_candidates,
            Some(vec!["*Service".to_string(), "*Dao".to_string()])
        );
    }
}
