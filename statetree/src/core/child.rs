//! Child links: a nested state mounted under a label of its parent.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::core::action::Action;
use crate::core::draft::Draft;
use crate::core::node::StateNode;
use crate::core::path::{action_type, check_segment, join};
use crate::core::registry::{ActionRegistry, ThunkRegistry};
use crate::core::state::{State, Transition};

/// Parent-addressed update applied to the whole child node.
pub type OverrideReducer = Arc<dyn Fn(&mut Draft<'_, StateNode>, &Action) + Send + Sync>;

/// Reference to a nested state plus the parent events that reach into it.
///
/// The nested state is shared, not owned; the same definition may be
/// mounted under several parents.
#[derive(Clone)]
pub struct ChildLink {
    state: Arc<State>,
    overrides: BTreeMap<String, OverrideReducer>,
}

impl ChildLink {
    pub fn new(state: impl Into<Arc<State>>) -> Self {
        Self {
            state: state.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// React to the parent's local event `event` by rewriting the child node.
    ///
    /// The override is addressed at the parent's path, not the child's.
    pub fn on<F>(mut self, event: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&mut Draft<'_, StateNode>, &Action) + Send + Sync + 'static,
    {
        self.overrides.insert(event.into(), Arc::new(reducer));
        self
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn build_transition(&self, parent: &str, label: &str) -> ChildTransition {
        check_segment("label", parent, label);
        let overrides: HashMap<String, OverrideReducer> = self
            .overrides
            .iter()
            .map(|(event, reducer)| {
                check_segment("override", parent, event);
                (action_type(parent, event), Arc::clone(reducer))
            })
            .collect();
        let path = join(parent, label);
        trace!(path = %path, overrides = overrides.len(), "child transition built");
        ChildTransition {
            overrides,
            inner: self.state.build_transition(&path),
        }
    }

    pub fn build_actions(&self, parent: &str, label: &str) -> ActionRegistry {
        self.state.build_actions(&join(parent, label))
    }

    pub fn build_thunks(&self, parent: &str, label: &str) -> ThunkRegistry {
        self.state.build_thunks(&join(parent, label))
    }
}

impl From<State> for ChildLink {
    fn from(state: State) -> Self {
        Self::new(state)
    }
}

impl From<Arc<State>> for ChildLink {
    fn from(state: Arc<State>) -> Self {
        Self::new(state)
    }
}

impl fmt::Debug for ChildLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildLink")
            .field("state", &self.state)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Compiled transition for one mounted child.
#[derive(Clone)]
pub struct ChildTransition {
    overrides: HashMap<String, OverrideReducer>,
    inner: Transition,
}

impl ChildTransition {
    /// Compute the next child node.
    ///
    /// An override addressed at the parent path takes precedence and sees the
    /// whole child node; otherwise the nested transition handles the action.
    /// Exactly one of the two runs.
    pub fn apply(&self, prior: Option<&StateNode>, action: &Action) -> StateNode {
        let Some(reducer) = self.overrides.get(&action.kind) else {
            return self.inner.apply(prior, action);
        };
        let seeded;
        let prior = match prior {
            Some(node) => node,
            None => {
                seeded = self.inner.initial_node();
                &seeded
            }
        };
        let mut draft = Draft::new(prior);
        reducer(&mut draft, action);
        draft.finish().unwrap_or_else(|| prior.clone())
    }

    pub fn initial_node(&self) -> StateNode {
        self.inner.initial_node()
    }

    /// Returns true if `kind` is intercepted by an override.
    pub fn overrides(&self, kind: &str) -> bool {
        self.overrides.contains_key(kind)
    }
}

impl fmt::Debug for ChildTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildTransition")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::leaf::Leaf;
    use serde_json::{Value, json};

    fn counter() -> State {
        State::new()
            .leaf(Leaf::new(json!({"value": 0})).on("increment", |draft, _| {
                let next = draft["value"].as_i64().unwrap_or_default() + 1;
                draft["value"] = json!(next);
            }))
            .action("increment", |_| Value::Null)
    }

    fn link() -> ChildLink {
        ChildLink::new(counter()).on("reset", |draft, _| {
            draft.node_mut()["value"] = json!(0);
        })
    }

    #[test]
    fn delegates_child_addressed_actions() {
        let transition = link().build_transition("", "a");
        let prior = transition.initial_node();
        let next = transition.apply(Some(&prior), &Action::new("/a/increment", Value::Null));
        assert_eq!(next.node()["value"], json!(1));
    }

    #[test]
    fn override_is_addressed_at_parent_path() {
        let transition = link().build_transition("/p", "a");
        assert!(transition.overrides("/p/reset"));
        assert!(!transition.overrides("/p/a/reset"));

        let prior = StateNode::new(json!({"value": 9}));
        let next = transition.apply(Some(&prior), &Action::new("/p/reset", Value::Null));
        assert_eq!(next.node()["value"], json!(0));
        assert_eq!(prior.node()["value"], json!(9));

        let untouched = transition.apply(Some(&prior), &Action::new("/p/a/reset", Value::Null));
        assert!(StateNode::ptr_eq(&prior, &untouched));
    }

    #[test]
    fn override_reuses_event_name_at_parent_path() {
        let link = ChildLink::new(counter()).on("increment", |draft, _| {
            draft.node_mut()["value"] = json!(100);
        });
        // Mounted at the root, the child's own event is `/a/increment` while the
        // override listens to `/increment`; only the override fires for it.
        let transition = link.build_transition("", "a");
        let prior = transition.initial_node();
        let next = transition.apply(Some(&prior), &Action::new("/increment", Value::Null));
        assert_eq!(next.node()["value"], json!(100));
    }

    #[test]
    fn override_without_prior_runs_on_seeded_node() {
        let transition = link().build_transition("", "a");
        let next = transition.apply(None, &Action::new("/reset", Value::Null));
        assert_eq!(next.node(), &json!({"value": 0}));
    }

    #[test]
    fn read_only_override_keeps_identity() {
        let link = ChildLink::new(counter()).on("peek", |draft, _| {
            assert_eq!(draft.node()["value"], json!(0));
        });
        let transition = link.build_transition("", "a");
        let prior = transition.initial_node();
        let next = transition.apply(Some(&prior), &Action::new("/peek", Value::Null));
        assert!(StateNode::ptr_eq(&prior, &next));
    }

    #[test]
    fn registries_are_rerooted_under_label() {
        let actions = link().build_actions("/p", "a");
        let creator = actions.get("increment").expect("increment");
        assert_eq!(creator.action_type(), "/p/a/increment");
        assert!(link().build_thunks("/p", "a").is_empty());
    }
}
