//! Creator registries shaped like the state tree.
//!
//! Each position keeps its own creators in `local` and nests child
//! registries by label, so a child labelled `_` (or anything else) never
//! collides with the local bucket.

use std::collections::BTreeMap;
use std::ops::Index;

use crate::core::action::ActionCreator;
use crate::core::path::segments;
use crate::thunk::ThunkCreator;

pub type ActionRegistry = Registry<ActionCreator>;
pub type ThunkRegistry = Registry<ThunkCreator>;

/// Anything registered under a qualified action type.
pub trait Qualified {
    fn qualified_type(&self) -> &str;
}

impl Qualified for ActionCreator {
    fn qualified_type(&self) -> &str {
        self.action_type()
    }
}

impl Qualified for ThunkCreator {
    fn qualified_type(&self) -> &str {
        self.action_type()
    }
}

#[derive(Debug, Clone)]
pub struct Registry<C> {
    local: BTreeMap<String, C>,
    children: BTreeMap<String, Registry<C>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            local: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

impl<C> Registry<C> {
    /// Creators defined at this position of the tree.
    pub fn local(&self) -> &BTreeMap<String, C> {
        &self.local
    }

    pub fn get(&self, name: &str) -> Option<&C> {
        self.local.get(name)
    }

    pub fn children(&self) -> &BTreeMap<String, Registry<C>> {
        &self.children
    }

    pub fn child(&self, label: &str) -> Option<&Registry<C>> {
        self.children.get(label)
    }

    /// Resolve a `/`-separated label path relative to this registry.
    pub fn select(&self, path: &str) -> Option<&Registry<C>> {
        segments(path).try_fold(self, |registry, label| registry.child(label))
    }

    /// Returns true if neither this position nor any descendant has creators.
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.children.values().all(Registry::is_empty)
    }

    pub(crate) fn insert_local(&mut self, name: String, creator: C) {
        self.local.insert(name, creator);
    }

    pub(crate) fn insert_child(&mut self, label: String, child: Registry<C>) {
        self.children.insert(label, child);
    }
}

impl<C: Qualified> Registry<C> {
    /// Every qualified type reachable from here, depth-first in label order.
    pub fn qualified_types(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_types(&mut out);
        out
    }

    fn collect_types(&self, out: &mut Vec<String>) {
        out.extend(self.local.values().map(|c| c.qualified_type().to_string()));
        for child in self.children.values() {
            child.collect_types(out);
        }
    }
}

impl<C> Index<&str> for Registry<C> {
    type Output = Registry<C>;

    /// # Panics
    ///
    /// Panics if there is no child registry labelled `label`.
    fn index(&self, label: &str) -> &Registry<C> {
        match self.child(label) {
            Some(child) => child,
            None => panic!("no child registry labelled `{label}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::Arc;

    fn creator(kind: &str) -> ActionCreator {
        ActionCreator::new(kind.to_string(), Arc::new(|_: Value| Value::Null))
    }

    fn registry() -> ActionRegistry {
        let mut inner = ActionRegistry::default();
        inner.insert_local("reset".to_string(), creator("/a/_/reset"));
        let mut a = ActionRegistry::default();
        a.insert_local("increment".to_string(), creator("/a/increment"));
        a.insert_child("_".to_string(), inner);
        let mut root = ActionRegistry::default();
        root.insert_local("logout".to_string(), creator("/logout"));
        root.insert_child("a".to_string(), a);
        root
    }

    #[test]
    fn underscore_label_is_an_ordinary_child() {
        let root = registry();
        let inner = root.select("a/_").expect("child labelled _");
        assert!(inner.get("reset").is_some());
        assert!(root["a"].get("reset").is_none());
    }

    #[test]
    fn qualified_types_lists_whole_tree() {
        assert_eq!(
            registry().qualified_types(),
            vec!["/logout", "/a/increment", "/a/_/reset"]
        );
    }

    #[test]
    #[should_panic(expected = "no child registry labelled `missing`")]
    fn index_panics_on_unknown_label() {
        let _ = &registry()["missing"];
    }

    #[test]
    fn emptiness_considers_descendants() {
        assert!(ActionRegistry::default().is_empty());
        assert!(!registry().is_empty());
    }
}
