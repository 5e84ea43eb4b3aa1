//! Asynchronous thunks and their Pending/Resolved/Rejected lifecycle.
//!
//! A thunk creator registered on a [`State`](crate::core::state::State)
//! returns an [`Operation`]. Dispatching the resulting [`Thunk`] through
//! [`Store::dispatch_thunk`] emits exactly one `Pending` action before the
//! operation starts and exactly one terminal action after it finishes.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::core::action::Action;
use crate::core::path::{Phase, action_type, lifecycle_type};
use crate::store::Store;

/// Future returned by a started operation.
pub type OperationFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Thunk creator registered on a state: maps call arguments to an operation.
pub type ThunkBody = Arc<dyn Fn(Value) -> Operation + Send + Sync>;

/// Deferred asynchronous work, started with a handle to the store.
///
/// The store handle provides both `dispatch` and `get_state` to the work.
pub struct Operation(Box<dyn FnOnce(Store) -> OperationFuture + Send>);

impl Operation {
    pub fn new<F, Fut>(work: F) -> Self
    where
        F: FnOnce(Store) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self(Box::new(move |store| Box::pin(work(store))))
    }

    fn start(self, store: Store) -> OperationFuture {
        (self.0)(store)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation(..)")
    }
}

/// Error an operation returns to choose the exact `Rejected` payload.
///
/// Any other error is reported as its `{:#}` message string.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection(pub Value);

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rejected with {}", self.0)
    }
}

impl std::error::Error for Rejection {}

/// Thunk creator bound to its path.
#[derive(Clone)]
pub struct ThunkCreator {
    path: String,
    name: String,
    kind: String,
    body: ThunkBody,
}

impl ThunkCreator {
    pub(crate) fn new(path: &str, name: &str, body: ThunkBody) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            kind: action_type(path, name),
            body,
        }
    }

    /// Qualified base type, without a lifecycle suffix.
    pub fn action_type(&self) -> &str {
        &self.kind
    }

    /// Qualified type of the lifecycle action for `phase`.
    pub fn lifecycle_type(&self, phase: Phase) -> String {
        lifecycle_type(&self.path, &self.name, phase)
    }

    /// Bind `args` into a dispatchable thunk.
    ///
    /// The local thunk creator itself only runs once the thunk is dispatched,
    /// after its `Pending` action.
    pub fn create(&self, args: Value) -> Thunk {
        Thunk {
            pending: self.lifecycle_type(Phase::Pending),
            resolved: self.lifecycle_type(Phase::Resolved),
            rejected: self.lifecycle_type(Phase::Rejected),
            deferred: Deferred {
                body: Arc::clone(&self.body),
                args,
            },
        }
    }
}

impl fmt::Debug for ThunkCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThunkCreator")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A ready-to-dispatch thunk invocation.
#[derive(Debug)]
pub struct Thunk {
    pending: String,
    resolved: String,
    rejected: String,
    deferred: Deferred,
}

impl Thunk {
    pub fn pending_type(&self) -> &str {
        &self.pending
    }

    pub(crate) fn into_parts(self) -> (Action, Lifecycle, Deferred) {
        let pending = Action::new(self.pending, Value::Null);
        let lifecycle = Lifecycle {
            resolved: self.resolved,
            rejected: self.rejected,
        };
        (pending, lifecycle, self.deferred)
    }
}

/// Thunk creator call that has not happened yet.
pub(crate) struct Deferred {
    body: ThunkBody,
    args: Value,
}

impl Deferred {
    /// Call the thunk creator, then start the operation it returns.
    pub(crate) fn start(self, store: Store) -> OperationFuture {
        (self.body)(self.args).start(store)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Terminal action types of one invocation.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    resolved: String,
    rejected: String,
}

impl Lifecycle {
    pub(crate) fn resolved(self, value: Value) -> Action {
        Action::new(self.resolved, value)
    }

    pub(crate) fn rejected(self, error: anyhow::Error) -> Action {
        let payload = match error.downcast::<Rejection>() {
            Ok(Rejection(value)) => value,
            Err(error) => Value::String(format!("{error:#}")),
        };
        Action::new(self.rejected, payload)
    }

    pub(crate) fn panicked(self, panic: Box<dyn Any + Send>) -> Action {
        let message = if let Some(message) = panic.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = panic.downcast_ref::<String>() {
            message.clone()
        } else {
            "operation panicked".to_string()
        };
        Action::new(self.rejected, Value::String(message))
    }
}

/// Handle to an in-flight thunk invocation.
///
/// Joining waits until the terminal action has been dispatched. It does not
/// report whether the operation succeeded; observe the dispatched actions
/// for that.
#[derive(Debug)]
pub struct ThunkHandle {
    task: JoinHandle<()>,
}

impl ThunkHandle {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!(error = %err, "thunk task did not complete");
        }
    }
}
