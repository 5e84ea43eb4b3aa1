//! Runtime state tree produced by the composed transition function.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::path::segments;

/// One position of the runtime state tree: a leaf value plus labelled children.
///
/// Both parts sit behind `Arc`, so cloning is cheap and subtrees that a
/// transition leaves alone are shared with the previous state. The set of
/// children is fixed when the tree is first seeded; there is no way to add
/// or remove a label afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateNode {
    node: Arc<Value>,
    children: Arc<BTreeMap<String, StateNode>>,
}

impl StateNode {
    /// Create a node with the given value and no children.
    pub fn new(node: Value) -> Self {
        Self::from_parts(Arc::new(node), Arc::new(BTreeMap::new()))
    }

    pub(crate) fn from_parts(
        node: Arc<Value>,
        children: Arc<BTreeMap<String, StateNode>>,
    ) -> Self {
        Self { node, children }
    }

    pub fn node(&self) -> &Value {
        &self.node
    }

    pub fn node_arc(&self) -> &Arc<Value> {
        &self.node
    }

    pub fn children(&self) -> &BTreeMap<String, StateNode> {
        &self.children
    }

    pub(crate) fn children_arc(&self) -> &Arc<BTreeMap<String, StateNode>> {
        &self.children
    }

    pub fn child(&self, label: &str) -> Option<&StateNode> {
        self.children.get(label)
    }

    /// Resolve a `/`-separated path relative to this node.
    ///
    /// The empty path resolves to `self`.
    pub fn at(&self, path: &str) -> Option<&StateNode> {
        segments(path).try_fold(self, |node, label| node.child(label))
    }

    /// Mutable access to the leaf value, cloning it first if it is shared.
    pub fn node_mut(&mut self) -> &mut Value {
        Arc::make_mut(&mut self.node)
    }

    /// Replace the leaf value.
    pub fn set_node(&mut self, node: Value) {
        self.node = Arc::new(node);
    }

    /// Mutable access to a child, copying only the children map on the way.
    pub fn child_mut(&mut self, label: &str) -> Option<&mut StateNode> {
        if !self.children.contains_key(label) {
            return None;
        }
        Arc::make_mut(&mut self.children).get_mut(label)
    }

    /// Returns true if both nodes share the same value and children storage.
    pub fn ptr_eq(a: &StateNode, b: &StateNode) -> bool {
        Self::node_ptr_eq(a, b) && Self::children_ptr_eq(a, b)
    }

    pub fn node_ptr_eq(a: &StateNode, b: &StateNode) -> bool {
        Arc::ptr_eq(&a.node, &b.node)
    }

    pub fn children_ptr_eq(a: &StateNode, b: &StateNode) -> bool {
        Arc::ptr_eq(&a.children, &b.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> StateNode {
        let leaf = StateNode::new(json!({"value": 1}));
        let mid = StateNode::from_parts(
            Arc::new(json!("mid")),
            Arc::new(BTreeMap::from([("leaf".to_string(), leaf)])),
        );
        StateNode::from_parts(
            Arc::new(json!(null)),
            Arc::new(BTreeMap::from([
                ("mid".to_string(), mid),
                ("other".to_string(), StateNode::new(json!(0))),
            ])),
        )
    }

    #[test]
    fn at_walks_nested_labels() {
        let root = tree();
        assert_eq!(root.at("").map(StateNode::node), Some(&json!(null)));
        assert_eq!(
            root.at("mid/leaf").map(StateNode::node),
            Some(&json!({"value": 1}))
        );
        assert!(root.at("mid/missing").is_none());
    }

    #[test]
    fn child_mut_copies_only_the_modified_spine() {
        let before = tree();
        let mut after = before.clone();
        after
            .child_mut("mid")
            .and_then(|mid| mid.child_mut("leaf"))
            .expect("leaf")
            .node_mut()["value"] = json!(2);

        assert_eq!(before.at("mid/leaf").expect("leaf").node()["value"], json!(1));
        assert_eq!(after.at("mid/leaf").expect("leaf").node()["value"], json!(2));
        assert!(!StateNode::children_ptr_eq(&before, &after));
        assert!(StateNode::node_ptr_eq(&before, &after));
        assert!(StateNode::ptr_eq(
            before.child("other").expect("other"),
            after.child("other").expect("other"),
        ));
        assert!(StateNode::node_ptr_eq(
            before.child("mid").expect("mid"),
            after.child("mid").expect("mid"),
        ));
    }

    #[test]
    fn child_mut_on_unknown_label_leaves_storage_shared() {
        let before = tree();
        let mut after = before.clone();
        assert!(after.child_mut("nope").is_none());
        assert!(StateNode::ptr_eq(&before, &after));
    }

    #[test]
    fn serializes_as_node_and_children() {
        let value = serde_json::to_value(tree()).expect("serialize");
        assert_eq!(value["children"]["mid"]["children"]["leaf"]["node"]["value"], json!(1));
        assert_eq!(value["children"]["other"]["node"], json!(0));
    }
}
