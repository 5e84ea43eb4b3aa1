//! Dispatched action objects and the creators that build them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload creator registered on a state: maps call arguments to a payload.
///
/// Arguments are a single JSON value; use an array or object for several.
pub type PayloadCreator = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Message exchanged between callers and the transition function.
///
/// Serializes as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Returns true if this action is addressed at exactly `kind`.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

/// Action creator bound to its qualified action type.
#[derive(Clone)]
pub struct ActionCreator {
    kind: String,
    payload: PayloadCreator,
}

impl ActionCreator {
    pub(crate) fn new(kind: String, payload: PayloadCreator) -> Self {
        Self { kind, payload }
    }

    /// Qualified type of every action this creator builds.
    pub fn action_type(&self) -> &str {
        &self.kind
    }

    /// Build an action whose payload is the local creator applied to `args`.
    pub fn create(&self, args: Value) -> Action {
        Action::new(self.kind.clone(), (self.payload)(args))
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
