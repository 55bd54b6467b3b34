//! Scoped acquisition of the shared rendering context.
//!
//! The rendering context is process-wide and shared with the embedding
//! application with zero internal locking. The only sanctioned way to
//! touch it is through [`ContextGuard`]: save the caller's context,
//! activate ours, and restore theirs when the guard drops. Because
//! restoration runs in `Drop`, it happens on every exit path, early
//! returns and errors included. An asymmetric save/restore would not
//! crash anything; it silently corrupts rendering in the embedding
//! application, which only shows up at integration time.

use crate::driver::{Driver, SavedContext};

/// Makes the subsystem's context current for the guard's lifetime and
/// restores the caller's context on drop.
pub struct ContextGuard<'a> {
    driver: &'a dyn Driver,
    saved: Option<SavedContext>,
}

impl<'a> ContextGuard<'a> {
    pub fn new(driver: &'a dyn Driver) -> Self {
        let saved = driver.save_context();
        driver.make_current();
        Self {
            driver,
            saved: Some(saved),
        }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.driver.restore_context(saved);
        }
    }
}

/// Named marker around a GPU command sequence, for driver-level
/// diagnostics. Purely advisory; the pop on drop keeps push/pop
/// symmetric on every exit path.
pub struct DebugScope<'a> {
    driver: &'a dyn Driver,
}

impl<'a> DebugScope<'a> {
    pub fn new(driver: &'a dyn Driver, label: &str) -> Self {
        driver.push_debug(label);
        Self { driver }
    }
}

impl Drop for DebugScope<'_> {
    fn drop(&mut self) {
        self.driver.pop_debug();
    }
}
