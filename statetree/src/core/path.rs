//! Helpers for rendering path-qualified action types.
//!
//! Paths are `/`-joined labels from the root. The root path is the empty
//! string, so an action local to the root is addressed as `/name`.

use tracing::warn;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Lifecycle phase of a thunk invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Resolved,
    Rejected,
}

impl Phase {
    /// Literal suffix appended to the thunk name for this phase.
    pub fn suffix(self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Resolved => "Resolved",
            Phase::Rejected => "Rejected",
        }
    }
}

/// Return the path of `label` nested under `parent`.
pub fn join(parent: &str, label: &str) -> String {
    format!("{parent}{SEPARATOR}{label}")
}

/// Return the qualified action type for local event `name` at `path`.
pub fn action_type(path: &str, name: &str) -> String {
    join(path, name)
}

/// Return the qualified action type for one phase of thunk `name` at `path`.
pub fn lifecycle_type(path: &str, name: &str, phase: Phase) -> String {
    format!("{path}{SEPARATOR}{name}{}", phase.suffix())
}

/// Iterate the non-empty segments of a `/`-separated path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Log a warning when `segment` cannot be addressed unambiguously.
///
/// Empty segments and segments containing the separator are not rejected;
/// dispatch behaviour for them is undefined.
pub(crate) fn check_segment(kind: &str, path: &str, segment: &str) {
    if segment.is_empty() || segment.contains(SEPARATOR) {
        warn!(kind, path, segment, "ambiguous path segment");
    }
}
