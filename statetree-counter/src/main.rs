//! Counter demo for the statetree library.
//!
//! Builds a root counter with an amount counter mounted at `a`, dispatches a
//! root `increment`, `a/increaseByAmount(amount)` and the
//! `a/increaseAsync(amount)` thunk, prints every observed action and then
//! the final state tree.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use statetree::config::load_config;
use statetree::{ChildLink, Draft, Leaf, Operation, Rejection, State, Store};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "statetree-counter",
    version,
    about = "Dispatch counter actions through a composed state tree"
)]
struct Args {
    /// Amount passed to `increaseByAmount` and `increaseAsync`
    #[arg(long, default_value_t = 5)]
    amount: i64,

    /// Delay before the async increase settles, in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// Make the async increase reject instead of resolving
    #[arg(long)]
    fail: bool,

    /// Store configuration file (TOML); defaults apply when missing
    #[arg(long)]
    config: Option<PathBuf>,
}

fn add(draft: &mut Draft<'_, Value>, amount: i64) {
    let next = draft["value"].as_i64().unwrap_or_default() + amount;
    draft["value"] = json!(next);
}

fn amount_counter(delay: Duration, fail: bool) -> State {
    State::new()
        .leaf(
            Leaf::new(json!({"value": 0, "loading": false, "error": null}))
                .on("increaseByAmount", |draft, action| {
                    add(draft, action.payload.as_i64().unwrap_or_default());
                })
                .on("increaseAsyncPending", |draft, _| {
                    draft["loading"] = json!(true);
                })
                .on("increaseAsyncResolved", |draft, action| {
                    add(draft, action.payload.as_i64().unwrap_or_default());
                    draft["loading"] = json!(false);
                })
                .on("increaseAsyncRejected", |draft, action| {
                    draft["loading"] = json!(false);
                    draft["error"] = action.payload.clone();
                }),
        )
        .action("increaseByAmount", |amount| amount)
        .thunk("increaseAsync", move |amount| {
            Operation::new(move |_| async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(anyhow::Error::new(Rejection(json!({"amount": amount}))));
                }
                Ok(amount)
            })
        })
}

fn counter_tree(delay: Duration, fail: bool) -> State {
    State::new()
        .leaf(
            Leaf::new(json!({"value": 0}))
                .on("increment", |draft, _| add(draft, 1))
                .on("reset", |draft, _| draft["value"] = json!(0)),
        )
        .action("increment", |_| Value::Null)
        .action("reset", |_| Value::Null)
        .child(
            "a",
            ChildLink::new(amount_counter(delay, fail)).on("reset", |draft, _| {
                draft.node_mut()["value"] = json!(0);
            }),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    statetree::logging::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => statetree::StoreConfig::default(),
    };
    let root = counter_tree(Duration::from_millis(args.delay_ms), args.fail);
    let store = Store::with_config(&root, &config).context("build store")?;
    let mut rx = store.subscribe();
    info!(amount = args.amount, fail = args.fail, "dispatching counter actions");

    store.dispatch(store.actions(|r| r)["increment"].create(Value::Null));
    store.dispatch(store.actions(|r| &r["a"])["increaseByAmount"].create(json!(args.amount)));
    store
        .dispatch_thunk(store.thunks(|r| &r["a"])["increaseAsync"].create(json!(args.amount)))?
        .join()
        .await;

    while let Ok(event) = rx.try_recv() {
        println!("{}", serde_json::to_string(&event.action)?);
    }
    println!("{}", serde_json::to_string_pretty(&store.get_state())?);
    Ok(())
}
