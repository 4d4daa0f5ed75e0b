use std::cell::Cell;

/// Mutual-exclusion flag for single-threaded, re-entrant call paths.
///
/// A nested entry while the guard is held is refused rather than queued.
#[derive(Debug, Default)]
pub struct ReentryGuard {
    busy: Cell<bool>,
}

impl ReentryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded section. `None` if it is already occupied.
    pub fn try_enter(&self) -> Option<GuardToken<'_>> {
        if self.busy.replace(true) {
            None
        } else {
            Some(GuardToken { guard: self })
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }
}

/// Releases the guard when dropped, including on early return.
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken<'a> {
    guard: &'a ReentryGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.busy.set(false);
    }
}
