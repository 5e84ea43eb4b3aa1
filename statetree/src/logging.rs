//! Optional `tracing` subscriber setup.
//!
//! The library only emits events (dispatches at `debug`, composition
//! warnings at `warn`); embedding applications normally install their own
//! subscriber. The counter demo calls [`init`].

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a compact stderr subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` only warnings are shown, e.g. ambiguous labels found
/// during composition. Use `RUST_LOG=statetree=debug` to trace every
/// dispatch and thunk outcome.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
