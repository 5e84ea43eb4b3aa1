//! Hierarchical reducer composition.
//!
//! Application state is described as a tree of [`State`] definitions. Each
//! position owns a leaf value and the events that update it, and mounts
//! nested states under labels through [`ChildLink`]s. Composition turns the
//! tree into one transition function plus action and thunk creator
//! registries, all addressed by `/`-joined paths such as `/a/increment`.
//!
//! - **[`core`]**: Pure composition and transition logic. No I/O, fully
//!   testable in isolation.
//! - **[`store`]**: Serialized dispatch, subscriptions and the registry
//!   selectors.
//! - **[`thunk`]**: Asynchronous operations reported through
//!   `Pending`/`Resolved`/`Rejected` actions.

pub mod config;
pub mod core;
pub mod logging;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod thunk;

pub use crate::config::StoreConfig;
pub use crate::core::action::{Action, ActionCreator};
pub use crate::core::child::ChildLink;
pub use crate::core::draft::Draft;
pub use crate::core::leaf::Leaf;
pub use crate::core::node::StateNode;
pub use crate::core::path::Phase;
pub use crate::core::registry::{ActionRegistry, Registry, ThunkRegistry};
pub use crate::core::state::State;
pub use crate::store::{Store, StoreEvent};
pub use crate::thunk::{Operation, Rejection, Thunk, ThunkCreator, ThunkHandle};
