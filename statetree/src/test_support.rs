//! Test-only fixtures: the counter trees and an event collector.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::core::action::Action;
use crate::core::child::ChildLink;
use crate::core::draft::Draft;
use crate::core::leaf::Leaf;
use crate::core::state::State;
use crate::store::StoreEvent;
use crate::thunk::{Operation, Rejection};

/// Add `amount` to the `value` field of a counter leaf.
pub fn add_to_value(draft: &mut Draft<'_, Value>, amount: i64) {
    let next = draft["value"].as_i64().unwrap_or_default() + amount;
    draft["value"] = json!(next);
}

fn payload_amount(action: &Action) -> i64 {
    action.payload.as_i64().unwrap_or_default()
}

/// Root counter: leaf `{value: 0}` with a local `increment` action.
pub fn counter() -> State {
    State::new()
        .leaf(Leaf::new(json!({"value": 0})).on("increment", |draft, _| add_to_value(draft, 1)))
        .action("increment", |_| Value::Null)
}

/// Counter that adds its payload, with an async variant resolving after `delay`.
///
/// `increaseAsync(amount)` resolves with `amount`; `failAsync(reason)` rejects
/// with `{"reason": reason}`.
pub fn amount_counter(delay: Duration) -> State {
    State::new()
        .leaf(
            Leaf::new(json!({"value": 0}))
                .on("increaseByAmount", |draft, action| {
                    add_to_value(draft, payload_amount(action));
                })
                .on("increaseAsyncResolved", |draft, action| {
                    add_to_value(draft, payload_amount(action));
                })
                .on("failAsyncRejected", |draft, action| {
                    draft["error"] = action.payload.clone();
                }),
        )
        .action("increaseByAmount", |amount| amount)
        .thunk("increaseAsync", move |amount| {
            Operation::new(move |_| async move {
                tokio::time::sleep(delay).await;
                Ok(amount)
            })
        })
        .thunk("failAsync", move |reason| {
            Operation::new(move |_| async move {
                tokio::time::sleep(delay).await;
                let rejected: anyhow::Result<Value> =
                    Err(Rejection(json!({ "reason": reason })).into());
                rejected
            })
        })
}

/// Root counter with an [`amount_counter`] mounted at `a`.
///
/// The root's `reset` event also zeroes `a` through an override.
pub fn counter_tree(delay: Duration) -> State {
    counter()
        .action("reset", |_| Value::Null)
        .child(
            "a",
            ChildLink::new(amount_counter(delay)).on("reset", |draft, _| {
                draft.node_mut()["value"] = json!(0);
            }),
        )
}

/// Receive the next `count` actions, failing if any takes longer than `wait`.
pub async fn collect_actions(
    rx: &mut mpsc::UnboundedReceiver<StoreEvent>,
    count: usize,
    wait: Duration,
) -> Result<Vec<Action>, String> {
    let mut actions = Vec::with_capacity(count);
    while actions.len() < count {
        match tokio::time::timeout(wait, rx.recv()).await {
            Ok(Some(event)) => actions.push(event.action),
            Ok(None) => return Err("store dropped".to_string()),
            Err(_) => {
                return Err(format!(
                    "timed out after {} of {count} actions",
                    actions.len()
                ));
            }
        }
    }
    Ok(actions)
}

/// Qualified types of `actions`, for compact assertions.
pub fn kinds(actions: &[Action]) -> Vec<&str> {
    actions.iter().map(|action| action.kind.as_str()).collect()
}
