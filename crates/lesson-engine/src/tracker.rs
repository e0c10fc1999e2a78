//! Latest-wins bookkeeping for availability checks fired by rapid edits.
//!
//! Each check takes a [`CheckTicket`] carrying a sequence number. When a check
//! completes, its result is kept only if no newer ticket has been issued in
//! the meantime; late answers to superseded checks are discarded. This is a
//! plain generation counter, usable from threads, async tasks or a UI event
//! loop alike.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::conflict::{check_availability, AvailabilityResult, Candidate};
use crate::error::Result;
use crate::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckTicket(u64);

impl CheckTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Holds the value produced by the most recently issued ticket.
#[derive(Debug)]
pub struct LatestResult<T> {
    issued: AtomicU64,
    accepted: Mutex<Option<(u64, T)>>,
}

impl<T> Default for LatestResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestResult<T> {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            accepted: Mutex::new(None),
        }
    }

    /// Start a new check, superseding every earlier ticket.
    pub fn begin(&self) -> CheckTicket {
        CheckTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: CheckTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Record `value` for `ticket`. Returns `false` if the ticket was superseded.
    pub fn complete(&self, ticket: CheckTicket, value: T) -> bool {
        let mut slot = self.accepted.lock().unwrap_or_else(|p| p.into_inner());
        if !self.is_current(ticket) {
            tracing::debug!(ticket = ticket.0, "stale check result discarded");
            return false;
        }
        if matches!(&*slot, Some((seq, _)) if *seq >= ticket.0) {
            return false;
        }
        *slot = Some((ticket.0, value));
        true
    }
}

impl<T: Clone> LatestResult<T> {
    /// The accepted value and the sequence number that produced it.
    pub fn current(&self) -> Option<(u64, T)> {
        self.accepted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// What the UI may show after a check: a definite answer, or "could not confirm".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AvailabilityOutcome {
    Checked(AvailabilityResult),
    Unconfirmed { message: String },
}

#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    inner: LatestResult<AvailabilityOutcome>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> CheckTicket {
        self.inner.begin()
    }

    /// Record the result of a check. Errors become [`AvailabilityOutcome::Unconfirmed`].
    pub fn finish(&self, ticket: CheckTicket, result: Result<AvailabilityResult>) -> bool {
        let outcome = match result {
            Ok(r) => AvailabilityOutcome::Checked(r),
            Err(e) => AvailabilityOutcome::Unconfirmed {
                message: e.to_string(),
            },
        };
        self.inner.complete(ticket, outcome)
    }

    /// Issue, run and record a check in one go.
    pub fn run<S: SessionStore + ?Sized>(&self, store: &S, candidate: &Candidate) -> bool {
        let ticket = self.begin();
        self.finish(ticket, check_availability(store, candidate))
    }

    pub fn latest(&self) -> Option<AvailabilityOutcome> {
        self.inner.current().map(|(_, outcome)| outcome)
    }

    /// Submission is allowed only on a confirmed "available" from the newest check.
    pub fn can_submit(&self) -> bool {
        let Some((seq, outcome)) = self.inner.current() else {
            return false;
        };
        seq == self.inner.issued.load(Ordering::SeqCst)
            && matches!(outcome, AvailabilityOutcome::Checked(ref r) if r.available)
    }
}
