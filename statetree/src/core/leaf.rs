//! Leaf nodes: a value plus the local events that update it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::core::action::Action;
use crate::core::draft::{Draft, produce};
use crate::core::path::{action_type, check_segment};

/// Mutation-style update for a leaf value.
pub type LeafReducer = Arc<dyn Fn(&mut Draft<'_, Value>, &Action) + Send + Sync>;

/// Definition of a leaf: initial value and reducers keyed by local event name.
#[derive(Clone)]
pub struct Leaf {
    initial: Arc<Value>,
    reducers: BTreeMap<String, LeafReducer>,
}

impl Default for Leaf {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl Leaf {
    pub fn new(initial: Value) -> Self {
        Self {
            initial: Arc::new(initial),
            reducers: BTreeMap::new(),
        }
    }

    /// Register `reducer` for local event `event`, replacing any previous one.
    pub fn on<F>(mut self, event: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&mut Draft<'_, Value>, &Action) + Send + Sync + 'static,
    {
        self.reducers.insert(event.into(), Arc::new(reducer));
        self
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }

    /// Local event names this leaf reacts to, in sorted order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.reducers.keys().map(String::as_str)
    }

    /// Compile the transition for this leaf mounted at `path`.
    pub fn build_transition(&self, path: &str) -> LeafTransition {
        let handlers: HashMap<String, LeafReducer> = self
            .reducers
            .iter()
            .map(|(event, reducer)| {
                check_segment("event", path, event);
                (action_type(path, event), Arc::clone(reducer))
            })
            .collect();
        trace!(path, handlers = handlers.len(), "leaf transition built");
        LeafTransition {
            initial: Arc::clone(&self.initial),
            handlers,
        }
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("initial", &self.initial)
            .field("events", &self.reducers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Compiled leaf transition with handlers indexed by qualified action type.
#[derive(Clone)]
pub struct LeafTransition {
    initial: Arc<Value>,
    handlers: HashMap<String, LeafReducer>,
}

impl LeafTransition {
    pub fn initial(&self) -> &Arc<Value> {
        &self.initial
    }

    /// Returns true if an action of type `kind` updates this leaf.
    pub fn handles(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Compute the next leaf value.
    ///
    /// A missing `prior` is seeded with the initial value. Actions this leaf
    /// does not handle return `prior` unchanged.
    pub fn apply(&self, prior: Option<&Arc<Value>>, action: &Action) -> Arc<Value> {
        let prior = prior.unwrap_or(&self.initial);
        match self.handlers.get(&action.kind) {
            Some(reducer) => produce(prior, |draft| reducer(draft, action)),
            None => Arc::clone(prior),
        }
    }
}

impl fmt::Debug for LeafTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafTransition")
            .field("initial", &self.initial)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter() -> Leaf {
        Leaf::new(json!({"value": 0}))
            .on("increment", |draft, _| {
                let next = draft["value"].as_i64().unwrap_or_default() + 1;
                draft["value"] = json!(next);
            })
            .on("set", |draft, action| draft.set(action.payload.clone()))
    }

    #[test]
    fn seeds_initial_value_without_prior() {
        let transition = counter().build_transition("");
        let next = transition.apply(None, &Action::new("@@INIT", Value::Null));
        assert!(Arc::ptr_eq(&next, transition.initial()));
        assert_eq!(*next, json!({"value": 0}));
    }

    #[test]
    fn matching_type_runs_reducer() {
        let transition = counter().build_transition("/a");
        let prior = Arc::new(json!({"value": 4}));
        let next = transition.apply(Some(&prior), &Action::new("/a/increment", Value::Null));
        assert_eq!(*next, json!({"value": 5}));
        assert_eq!(*prior, json!({"value": 4}));
    }

    #[test]
    fn unmatched_type_keeps_identity() {
        let transition = counter().build_transition("/a");
        let prior = Arc::new(json!({"value": 4}));
        for kind in ["/increment", "/a/b/increment", "/a/incrementPending", "increment"] {
            let next = transition.apply(Some(&prior), &Action::new(kind, Value::Null));
            assert!(Arc::ptr_eq(&prior, &next), "{kind} should not match");
        }
    }

    #[test]
    fn handlers_are_indexed_by_qualified_type() {
        let transition = counter().build_transition("/a/b");
        assert!(transition.handles("/a/b/increment"));
        assert!(transition.handles("/a/b/set"));
        assert!(!transition.handles("/a/increment"));
    }

    #[test]
    fn default_leaf_is_null_and_inert() {
        let leaf = Leaf::default();
        assert!(leaf.initial().is_null());
        assert_eq!(leaf.events().count(), 0);
    }
}
