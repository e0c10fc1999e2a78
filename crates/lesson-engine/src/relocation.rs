//! Drag/move and resize validation.
//!
//! A relocation is checked in this order:
//!
//! 1. the new range must be well-formed (`InvalidRange` error);
//! 2. its start must not lie in the past, regardless of availability;
//! 3. the session must still be movable (not in a terminal state);
//! 4. the session's own student, instructor and vehicle must be free in the
//!    new range, ignoring the session's current occurrence.
//!
//! The validator is stateless. On rejection the caller puts the event back
//! where it was.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::conflict::{check_availability, Candidate, Conflict};
use crate::error::{EngineError, Result};
use crate::model::{EventId, SessionId, SessionStatus};
use crate::range::TimeRange;
use crate::store::SessionStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    PastMoment {
        requested: NaiveDateTime,
        now: NaiveDateTime,
    },
    ResourceConflict {
        conflicts: Vec<Conflict>,
    },
    TerminalSession {
        status: SessionStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RelocationDecision {
    Ok,
    Rejected { reason: RejectionReason },
}

impl RelocationDecision {
    pub fn is_ok(&self) -> bool {
        matches!(self, RelocationDecision::Ok)
    }

    /// Turn a rejection into the matching [`EngineError`].
    pub fn into_result(self, session: SessionId) -> Result<()> {
        match self {
            RelocationDecision::Ok => Ok(()),
            RelocationDecision::Rejected { reason } => Err(match reason {
                RejectionReason::PastMoment { requested, now } => {
                    EngineError::PastMoment { requested, now }
                }
                RejectionReason::ResourceConflict { conflicts } => {
                    EngineError::ResourceConflict(conflicts)
                }
                RejectionReason::TerminalSession { status } => EngineError::TerminalSession {
                    id: session,
                    status,
                },
            }),
        }
    }

    fn rejected(reason: RejectionReason) -> Self {
        RelocationDecision::Rejected { reason }
    }
}

/// Validate moving or resizing session `id` to `new_date` `[new_start, new_end)`.
///
/// # Errors
///
/// - [`EngineError::InvalidRange`] when `new_start >= new_end`.
/// - [`EngineError::SessionNotFound`] / [`EngineError::StoreUnavailable`] from the store.
pub fn validate_relocation<S: SessionStore + ?Sized>(
    store: &S,
    id: SessionId,
    new_date: NaiveDate,
    new_start: NaiveTime,
    new_end: NaiveTime,
    now: NaiveDateTime,
) -> Result<RelocationDecision> {
    let target = TimeRange::new(new_date, new_start, new_end)?;

    if target.starts_before(now) {
        tracing::debug!(session = %id, requested = %target.start_datetime(), "relocation into the past rejected");
        return Ok(RelocationDecision::rejected(RejectionReason::PastMoment {
            requested: target.start_datetime(),
            now,
        }));
    }

    let session = store.get(id)?;
    if session.status.is_terminal() {
        return Ok(RelocationDecision::rejected(
            RejectionReason::TerminalSession {
                status: session.status,
            },
        ));
    }

    let candidate = Candidate {
        student: Some(session.student),
        instructor: session.instructor,
        vehicle: session.vehicle,
        date: new_date,
        start_time: new_start,
        end_time: new_end,
        exclude: Some(session.id),
    };
    let availability = check_availability(store, &candidate)?;
    if !availability.available {
        return Ok(RelocationDecision::rejected(
            RejectionReason::ResourceConflict {
                conflicts: availability.conflicts,
            },
        ));
    }

    Ok(RelocationDecision::Ok)
}

/// Validate a drag on a calendar event. Exam events are rejected before any check runs.
pub fn validate_event_relocation<S: SessionStore + ?Sized>(
    store: &S,
    event: EventId,
    new_date: NaiveDate,
    new_start: NaiveTime,
    new_end: NaiveTime,
    now: NaiveDateTime,
) -> Result<RelocationDecision> {
    match event {
        EventId::Exam(_) => Err(EngineError::ImmutableEvent(event)),
        EventId::Session(id) => validate_relocation(store, id, new_date, new_start, new_end, now),
    }
}
