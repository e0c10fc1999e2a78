//! Error types for lesson-engine operations.

use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::conflict::Conflict;
use crate::model::{EventId, SessionId, SessionStatus, VehicleId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid range: start {start} is not before end {end}")]
    InvalidRange { start: NaiveTime, end: NaiveTime },

    #[error("Cannot write into the past: {requested} is before {now}")]
    PastMoment {
        requested: NaiveDateTime,
        now: NaiveDateTime,
    },

    #[error("Resource conflict: {} resource(s) already booked", .0.len())]
    ResourceConflict(Vec<Conflict>),

    #[error("Session cannot be completed before it ends at {ends_at} (now {now})")]
    PrematureCompletion {
        ends_at: NaiveDateTime,
        now: NaiveDateTime,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Ambiguous vehicle: {} candidates, a manual choice is required", .0.len())]
    AmbiguousVehicle(Vec<VehicleId>),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {id} is {status}; its time and resources can no longer change")]
    TerminalSession { id: SessionId, status: SessionStatus },

    #[error("Event {0} is immutable from this interface")]
    ImmutableEvent(EventId),

    #[error("Vehicle {0} cannot be selected for this instructor")]
    InvalidVehicleSelection(VehicleId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures reported by the external persistence layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error("no session with id {0}")]
    NotFound(SessionId),

    /// Write-time overlap re-check failed; carries the colliding conflicts.
    #[error("write rejected by overlap constraint")]
    Overlap(Vec<Conflict>),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
            StoreError::NotFound(id) => EngineError::SessionNotFound(id),
            StoreError::Overlap(conflicts) => EngineError::ResourceConflict(conflicts),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
