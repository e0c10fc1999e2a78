//! # lesson-engine
//!
//! Scheduling and availability rules for a driving school.
//!
//! Lessons bind up to three resources (a student, an instructor and a
//! vehicle) to a wall-clock range on a single date. The engine guarantees no
//! resource is double-booked, drives each lesson through its lifecycle, and
//! projects lessons and exams into viewer-scoped calendar events. It owns no
//! storage and never reads the system clock: stores are traits, and every
//! time-sensitive operation takes `now` from the caller.
//!
//! ## Modules
//!
//! - [`range`]: half-open time ranges on a date
//! - [`conflict`]: per-resource overlap detection
//! - [`lifecycle`]: status state machine and completion guard
//! - [`vehicle`]: auto-assignment of an instructor's vehicle
//! - [`calendar`]: projection into display events
//! - [`relocation`]: drag/move and resize validation
//! - [`booking`]: the write path (book, relocate, delete)
//! - [`tracker`]: latest-wins bookkeeping for superseded checks
//! - [`hours`]: completed-hours tally
//! - [`store`]: persistence traits and the in-memory store
//! - [`config`]: engine configuration
//! - [`error`]: error types

pub mod booking;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod error;
pub mod hours;
pub mod lifecycle;
pub mod model;
pub mod range;
pub mod relocation;
pub mod store;
pub mod tracker;
pub mod vehicle;

pub use booking::{book_session, delete_session, relocate_session, BookingRequest};
pub use calendar::{project, CalendarEvent, EventRecord};
pub use config::{CalendarPalette, EngineConfig};
pub use conflict::{
    check_availability, find_double_bookings, AvailabilityResult, Candidate, Conflict,
    ConflictingSession, DoubleBooking, ResourceTimeline,
};
pub use error::{EngineError, StoreError};
pub use hours::{completed_hours, StudentHours};
pub use lifecycle::{can_transition, edit_notes, request_status_change, transition};
pub use model::*;
pub use range::TimeRange;
pub use relocation::{
    validate_event_relocation, validate_relocation, RejectionReason, RelocationDecision,
};
pub use store::{ExamSource, InMemoryStore, SessionStore, StoreSnapshot};
pub use tracker::{AvailabilityOutcome, AvailabilityTracker, CheckTicket, LatestResult};
pub use vehicle::{resolve_vehicle, VehicleDirectory, VehicleResolution, VehicleSelection};
