//! Composite states and the recursive composition of their parts.
//!
//! A [`State`] is a definition: a leaf, labelled child links and local
//! action and thunk creators. Composing it at a path produces three things
//! shaped like the runtime tree:
//!
//! - a [`Transition`] that fans every action out to the leaf and to every
//!   child, each of which decides independently whether to respond;
//! - an [`ActionRegistry`] of creators qualified with the path;
//! - a [`ThunkRegistry`] of thunk creators qualified with the path.
//!
//! Composition runs once at startup. The results are immutable and may be
//! shared freely across threads.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::action::{Action, ActionCreator, PayloadCreator};
use crate::core::child::{ChildLink, ChildTransition};
use crate::core::leaf::{Leaf, LeafTransition};
use crate::core::node::StateNode;
use crate::core::path::{action_type, check_segment};
use crate::core::registry::{ActionRegistry, ThunkRegistry};
use crate::thunk::{Operation, ThunkBody, ThunkCreator};

#[derive(Clone, Default)]
pub struct State {
    leaf: Leaf,
    children: BTreeMap<String, ChildLink>,
    actions: BTreeMap<String, PayloadCreator>,
    thunks: BTreeMap<String, ThunkBody>,
}

impl State {
    /// An empty state: `null` leaf, no children, no creators.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(mut self, leaf: Leaf) -> Self {
        self.leaf = leaf;
        self
    }

    /// Mount `link` under `label`, replacing any child with the same label.
    pub fn child(mut self, label: impl Into<String>, link: impl Into<ChildLink>) -> Self {
        self.children.insert(label.into(), link.into());
        self
    }

    /// Register a local action creator returning the payload for its arguments.
    pub fn action<F>(mut self, name: impl Into<String>, creator: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(creator));
        self
    }

    /// Register a local thunk creator returning the operation for its arguments.
    pub fn thunk<F>(mut self, name: impl Into<String>, creator: F) -> Self
    where
        F: Fn(Value) -> Operation + Send + Sync + 'static,
    {
        self.thunks.insert(name.into(), Arc::new(creator));
        self
    }

    pub fn leaf_def(&self) -> &Leaf {
        &self.leaf
    }

    pub fn children(&self) -> &BTreeMap<String, ChildLink> {
        &self.children
    }

    pub fn build_transition(&self, path: &str) -> Transition {
        let children = self
            .children
            .iter()
            .map(|(label, link)| (label.clone(), link.build_transition(path, label)))
            .collect();
        Transition {
            leaf: self.leaf.build_transition(path),
            children,
        }
    }

    pub fn build_actions(&self, path: &str) -> ActionRegistry {
        let mut registry = ActionRegistry::default();
        for (name, creator) in &self.actions {
            check_segment("action", path, name);
            registry.insert_local(
                name.clone(),
                ActionCreator::new(action_type(path, name), Arc::clone(creator)),
            );
        }
        for (label, link) in &self.children {
            registry.insert_child(label.clone(), link.build_actions(path, label));
        }
        registry
    }

    pub fn build_thunks(&self, path: &str) -> ThunkRegistry {
        let mut registry = ThunkRegistry::default();
        for (name, body) in &self.thunks {
            check_segment("thunk", path, name);
            registry.insert_local(name.clone(), ThunkCreator::new(path, name, Arc::clone(body)));
        }
        for (label, link) in &self.children {
            registry.insert_child(label.clone(), link.build_thunks(path, label));
        }
        registry
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("leaf", &self.leaf)
            .field("children", &self.children)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("thunks", &self.thunks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Composed, pure transition function for a whole subtree.
#[derive(Clone)]
pub struct Transition {
    leaf: LeafTransition,
    children: Vec<(String, ChildTransition)>,
}

impl Transition {
    /// Compute the next state for `action`.
    ///
    /// A missing `prior` (or a missing child within it) is seeded from the
    /// initial values. Storage that no handler touched is reused: when
    /// nothing matched anywhere, `prior` itself is returned and nothing is
    /// allocated.
    pub fn apply(&self, prior: Option<&StateNode>, action: &Action) -> StateNode {
        let Some(prior) = prior else {
            return self.seed(action);
        };
        let node = self.leaf.apply(Some(prior.node_arc()), action);

        // Copied from `prior` only once some child actually changes.
        let mut children: Option<BTreeMap<String, StateNode>> = None;
        for (label, child) in &self.children {
            let prior_child = prior.child(label);
            let next = child.apply(prior_child, action);
            if prior_child.is_some_and(|p| StateNode::ptr_eq(p, &next)) {
                continue;
            }
            children
                .get_or_insert_with(|| prior.children().clone())
                .insert(label.clone(), next);
        }

        match children {
            Some(children) => StateNode::from_parts(node, Arc::new(children)),
            None if Arc::ptr_eq(prior.node_arc(), &node) => prior.clone(),
            None => StateNode::from_parts(node, Arc::clone(prior.children_arc())),
        }
    }

    fn seed(&self, action: &Action) -> StateNode {
        let children = self
            .children
            .iter()
            .map(|(label, child)| (label.clone(), child.apply(None, action)))
            .collect();
        StateNode::from_parts(self.leaf.apply(None, action), Arc::new(children))
    }

    /// The fully seeded tree, as produced for an absent prior state.
    pub fn initial_node(&self) -> StateNode {
        let children = self
            .children
            .iter()
            .map(|(label, child)| (label.clone(), child.initial_node()))
            .collect();
        StateNode::from_parts(Arc::clone(self.leaf.initial()), Arc::new(children))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("leaf", &self.leaf)
            .field("children", &self.children)
            .finish()
    }
}
