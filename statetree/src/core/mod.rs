//! Pure composition logic: definitions, compiled transitions, registries.
//!
//! Core modules are free of I/O and scheduling. They build immutable values
//! at startup and compute new state trees from old ones.

pub mod action;
pub mod child;
pub mod draft;
pub mod leaf;
pub mod node;
pub mod path;
pub mod registry;
pub mod state;
