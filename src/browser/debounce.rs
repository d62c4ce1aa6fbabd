use std::time::Duration;

use tokio::time::Instant;

use crate::browser::criteria::FilterEdit;

/// Coalesces bursts of filter edits.
///
/// Each edit re-arms a single deadline `quiet` after the edit. Only when the
/// deadline passes without another edit does [`fire`](Self::fire) yield the
/// revision that should be queried; intermediate revisions are never
/// reported.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
    pending: Option<u64>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record an edit made at `now`, cancelling any pending fire.
    pub fn schedule(&mut self, edit: FilterEdit, now: Instant) {
        self.deadline = Some(now + self.quiet);
        self.pending = Some(edit.revision);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending revision if its quiet period has elapsed by `now`.
    pub fn fire(&mut self, now: Instant) -> Option<u64> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Drop the pending revision without firing.
    pub fn cancel(&mut self) -> Option<u64> {
        self.deadline = None;
        self.pending.take()
    }
}
