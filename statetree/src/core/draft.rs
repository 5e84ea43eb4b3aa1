//! Copy-on-write drafts used by mutation-style reducers.
//!
//! A [`Draft`] borrows a base value and hands out a private copy on the
//! first mutable access. Reads before that go straight to the base, so a
//! reducer that never writes produces no allocation and [`produce`] returns
//! the base `Arc` itself.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Mutable view over a value that is cloned lazily on first write.
pub struct Draft<'a, T: Clone> {
    base: &'a T,
    copy: Option<T>,
}

impl<'a, T: Clone> Draft<'a, T> {
    pub fn new(base: &'a T) -> Self {
        Self { base, copy: None }
    }

    /// The value the draft was opened on, ignoring any writes.
    pub fn base(&self) -> &'a T {
        self.base
    }

    /// Returns true once the draft has handed out mutable access.
    pub fn is_modified(&self) -> bool {
        self.copy.is_some()
    }

    /// Replace the drafted value wholesale without cloning the base first.
    pub fn set(&mut self, value: T) {
        self.copy = Some(value);
    }

    /// Consume the draft, returning the new value if it was modified.
    pub fn finish(self) -> Option<T> {
        self.copy
    }
}

impl<T: Clone> Deref for Draft<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.copy.as_ref().unwrap_or(self.base)
    }
}

impl<T: Clone> DerefMut for Draft<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        let base = self.base;
        self.copy.get_or_insert_with(|| base.clone())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Draft<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("value", &**self)
            .field("modified", &self.is_modified())
            .finish()
    }
}

/// Run `recipe` against a draft of `base` and return the resulting value.
///
/// Returns `base` itself (pointer-equal) when the recipe never wrote.
pub fn produce<T, F>(base: &Arc<T>, recipe: F) -> Arc<T>
where
    T: Clone,
    F: FnOnce(&mut Draft<'_, T>),
{
    let mut draft = Draft::new(base.as_ref());
    recipe(&mut draft);
    match draft.finish() {
        Some(value) => Arc::new(value),
        None => Arc::clone(base),
    }
}
