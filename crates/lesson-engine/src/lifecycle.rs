//! Session lifecycle state machine.
//!
//! ```text
//! scheduled ──► in_progress ──► completed
//!     │  └──────────────────────► completed
//!     ├──► cancelled ◄── in_progress
//!     └──► no_show   ◄── in_progress
//! ```
//!
//! `completed`, `cancelled` and `no_show` are terminal. Completion is only
//! accepted once the session's end (date + end time) has passed relative to
//! the caller-supplied `now`. Nothing here reads the system clock and nothing
//! fires on a timer: every transition is an explicit request.

use chrono::NaiveDateTime;

use crate::error::{EngineError, Result};
use crate::model::{Session, SessionId, SessionStatus};
use crate::store::SessionStore;

/// Whether `from -> to` is an edge of the state machine.
pub fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    matches!(
        (from, to),
        (Scheduled, InProgress)
            | (Scheduled, Completed)
            | (InProgress, Completed)
            | (Scheduled | InProgress, Cancelled)
            | (Scheduled | InProgress, NoShow)
    )
}

/// Fail with [`EngineError::TerminalSession`] if the session's time and resources are frozen.
pub fn ensure_mutable(session: &Session) -> Result<()> {
    if session.status.is_terminal() {
        return Err(EngineError::TerminalSession {
            id: session.id,
            status: session.status,
        });
    }
    Ok(())
}

/// Apply a status change to a copy of `session`.
///
/// `reason` is recorded only when cancelling; blank reasons are dropped.
///
/// # Errors
///
/// - [`EngineError::InvalidTransition`] when `next` is not reachable from the current state.
/// - [`EngineError::PrematureCompletion`] when completing before `date + end_time`.
pub fn transition(
    session: &Session,
    next: SessionStatus,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<Session> {
    if !can_transition(session.status, next) {
        return Err(EngineError::InvalidTransition {
            from: session.status,
            to: next,
        });
    }

    if next == SessionStatus::Completed {
        let ends_at = session.ends_at();
        if now < ends_at {
            return Err(EngineError::PrematureCompletion { ends_at, now });
        }
    }

    let mut updated = session.clone();
    updated.status = next;
    if next == SessionStatus::Cancelled {
        updated.cancellation_reason = normalize_text(reason);
    }
    Ok(updated)
}

/// Load a session, transition it, and persist the result.
pub fn request_status_change<S: SessionStore + ?Sized>(
    store: &S,
    id: SessionId,
    next: SessionStatus,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<Session> {
    let current = store.get(id)?;
    let updated = transition(&current, next, reason, now)?;
    let saved = store.update(updated)?;
    tracing::info!(
        session = %id,
        from = %current.status,
        to = %saved.status,
        "session status changed"
    );
    Ok(saved)
}

/// Edit the free-text fields, allowed in every state including terminal ones.
///
/// `Some("")` clears a field; `None` leaves it untouched. A cancellation
/// reason implies the cancelled state, so setting one on any other session
/// fails with [`EngineError::InvalidTransition`] towards `cancelled`.
pub fn edit_notes(session: &Session, notes: Option<&str>, reason: Option<&str>) -> Result<Session> {
    let mut updated = session.clone();
    if let Some(notes) = notes {
        updated.notes = normalize_text(Some(notes));
    }
    if let Some(reason) = reason {
        if session.status != SessionStatus::Cancelled {
            return Err(EngineError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Cancelled,
            });
        }
        updated.cancellation_reason = normalize_text(Some(reason));
    }
    Ok(updated)
}

fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
