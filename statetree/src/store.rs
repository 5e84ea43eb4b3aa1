//! Store factory: owns the runtime state tree and serializes dispatches.
//!
//! The root [`State`] is composed once. Every dispatched action runs the
//! composed transition under a lock, replaces the current state and is then
//! delivered to every subscriber together with the state it produced.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use futures::FutureExt;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::core::action::{Action, ActionCreator};
use crate::core::node::StateNode;
use crate::core::registry::{ActionRegistry, ThunkRegistry};
use crate::core::state::{State, Transition};
use crate::thunk::{Thunk, ThunkCreator, ThunkHandle};

/// Notification sent to subscribers after each dispatch.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub action: Action,
    /// State immediately after `action` was applied.
    pub state: StateNode,
}

/// Cheaply clonable handle to a running store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    transition: Transition,
    actions: ActionRegistry,
    thunks: ThunkRegistry,
    state: Mutex<StateNode>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StoreEvent>>>,
}

impl Store {
    /// Build a store for `root` with the default configuration.
    pub fn new(root: &State) -> Self {
        Self::build(root, &StoreConfig::default())
    }

    pub fn with_config(root: &State, config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(root, config))
    }

    fn build(root: &State, config: &StoreConfig) -> Self {
        let transition = root.build_transition("");
        let actions = root.build_actions("");
        let thunks = root.build_thunks("");
        let init = Action::new(config.init_action.clone(), Value::Null);
        let state = transition.apply(None, &init);
        debug!(
            init = %init.kind,
            actions = actions.qualified_types().len(),
            thunks = thunks.qualified_types().len(),
            "store created"
        );
        Self {
            inner: Arc::new(Inner {
                transition,
                actions,
                thunks,
                state: Mutex::new(state),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Apply `action` to the current state and notify subscribers.
    ///
    /// Dispatches are serialized; no two transitions run at the same time,
    /// and every subscriber receives events in transition order.
    pub fn dispatch(&self, action: Action) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = self.inner.transition.apply(Some(&*state), &action);
        let changed = !StateNode::ptr_eq(&state, &next);
        *state = next.clone();
        debug!(action = %action.kind, changed, "dispatched");
        self.notify(StoreEvent { action, state: next });
    }

    fn notify(&self, event: StoreEvent) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            trace!("no subscribers");
        }
    }

    /// Dispatch a thunk: `Pending` now, then `Resolved` or `Rejected` later.
    ///
    /// `Pending` is dispatched before this returns and before the thunk
    /// creator or its operation runs. The operation runs as its own task on
    /// the current tokio runtime; failures and panics are turned into the
    /// `Rejected` action and never surface to the caller.
    ///
    /// Fails without dispatching anything when called outside a tokio
    /// runtime.
    pub fn dispatch_thunk(&self, thunk: Thunk) -> Result<ThunkHandle> {
        let runtime = Handle::try_current()
            .with_context(|| format!("dispatch thunk {}", thunk.pending_type()))?;
        let (pending, lifecycle, deferred) = thunk.into_parts();
        self.dispatch(pending);

        let store = self.clone();
        let task = runtime.spawn(async move {
            let worker = store.clone();
            let outcome = AssertUnwindSafe(async move { deferred.start(worker).await })
                .catch_unwind()
                .await;
            let terminal = match outcome {
                Ok(Ok(value)) => lifecycle.resolved(value),
                Ok(Err(error)) => {
                    debug!(error = %format!("{error:#}"), "thunk operation failed");
                    lifecycle.rejected(error)
                }
                Err(panic) => {
                    warn!("thunk operation panicked");
                    lifecycle.panicked(panic)
                }
            };
            store.dispatch(terminal);
        });
        Ok(ThunkHandle::new(task))
    }

    pub fn get_state(&self) -> StateNode {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive every dispatch that happens after this call.
    ///
    /// Delivery is unbounded and never drops events. Dropping the receiver
    /// unsubscribes on the next dispatch.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Local action creators of the registry subtree chosen by `select`.
    pub fn actions<F>(&self, select: F) -> &BTreeMap<String, ActionCreator>
    where
        F: FnOnce(&ActionRegistry) -> &ActionRegistry,
    {
        select(&self.inner.actions).local()
    }

    /// Local thunk creators of the registry subtree chosen by `select`.
    pub fn thunks<F>(&self, select: F) -> &BTreeMap<String, ThunkCreator>
    where
        F: FnOnce(&ThunkRegistry) -> &ThunkRegistry,
    {
        select(&self.inner.thunks).local()
    }

    pub fn root_actions(&self) -> &ActionRegistry {
        &self.inner.actions
    }

    pub fn root_thunks(&self) -> &ThunkRegistry {
        &self.inner.thunks
    }

    pub fn transition(&self) -> &Transition {
        &self.inner.transition
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("Store")
            .field("state", &self.get_state())
            .field("subscribers", &subscribers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::leaf::Leaf;
    use crate::thunk::Operation;
    use serde_json::json;

    fn counter() -> State {
        State::new()
            .leaf(Leaf::new(json!({"value": 0})).on("increment", |draft, _| {
                let next = draft["value"].as_i64().unwrap_or_default() + 1;
                draft["value"] = json!(next);
            }))
            .action("increment", |_| Value::Null)
    }

    #[test]
    fn state_is_seeded_on_creation() {
        let store = Store::new(&counter());
        assert_eq!(store.get_state().node(), &json!({"value": 0}));
    }

    #[test]
    fn dispatch_notifies_subscribers_in_order() {
        let store = Store::new(&counter());
        let mut rx = store.subscribe();
        let increment = store.actions(|r| r)["increment"].create(Value::Null);
        store.dispatch(increment.clone());
        store.dispatch(Action::new("/unknown", Value::Null));

        let first = rx.try_recv().expect("first event");
        assert_eq!(first.action, increment);
        assert_eq!(first.state.node()["value"], json!(1));
        let second = rx.try_recv().expect("second event");
        assert_eq!(second.action.kind, "/unknown");
        assert!(StateNode::ptr_eq(&first.state, &second.state));
    }

    #[test]
    fn with_config_rejects_invalid_config() {
        let config = StoreConfig {
            init_action: String::new(),
        };
        assert!(Store::with_config(&counter(), &config).is_err());
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let store = Store::new(&counter());
        let kept = store.subscribe();
        drop(store.subscribe());
        store.dispatch(Action::new("/increment", Value::Null));
        assert_eq!(store.inner.subscribers.lock().expect("lock").len(), 1);
        drop(kept);
        store.dispatch(Action::new("/increment", Value::Null));
        assert!(store.inner.subscribers.lock().expect("lock").is_empty());
    }

    /// Outside a runtime nothing is dispatched, so no Pending is left dangling.
    #[test]
    fn thunk_outside_runtime_dispatches_nothing() {
        let state = counter().thunk("load", |args| {
            Operation::new(move |_| async move { Ok(args) })
        });
        let store = Store::new(&state);
        let mut rx = store.subscribe();
        let thunk = store.thunks(|r| r)["load"].create(json!(1));

        let err = store.dispatch_thunk(thunk).expect_err("no runtime");
        assert!(format!("{err:#}").contains("/loadPending"));
        assert!(rx.try_recv().is_err());
        assert_eq!(store.get_state().node(), &json!({"value": 0}));
    }

    #[test]
    fn reducer_panic_keeps_last_committed_state() {
        let state = counter().leaf(
            Leaf::new(json!({"value": 0}))
                .on("increment", |draft, _| draft["value"] = json!(1))
                .on("explode", |_, _| panic!("reducer bug")),
        );
        let store = Store::new(&state);
        store.dispatch(Action::new("/increment", Value::Null));
        let clone = store.clone();
        let result = std::panic::catch_unwind(AssertUnwindSafe(move || {
            clone.dispatch(Action::new("/explode", Value::Null));
        }));
        assert!(result.is_err());
        assert_eq!(store.get_state().node()["value"], json!(1));
        store.dispatch(Action::new("/increment", Value::Null));
        assert_eq!(store.get_state().node()["value"], json!(1));
    }
}
