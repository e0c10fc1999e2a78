//! The write path: booking, moving and deleting sessions.
//!
//! Every write runs the same checks the UI runs beforehand, then relies on
//! the store's own write-time overlap re-check. A check that passed a moment
//! ago is never trusted on its own.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::conflict::{check_availability, Candidate};
use crate::error::{EngineError, Result};
use crate::model::*;
use crate::range::TimeRange;
use crate::relocation::validate_relocation;
use crate::store::SessionStore;
use crate::vehicle::{VehicleDirectory, VehicleSelection};

/// A new lesson as submitted by the booking form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub student: StudentId,
    pub student_name: String,
    #[serde(default)]
    pub instructor: Option<InstructorId>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    /// Left empty to let the instructor's single assigned vehicle fill in.
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
    #[serde(default)]
    pub vehicle_label: Option<String>,
    pub session_type: SessionType,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Book a new `scheduled` session.
///
/// # Errors
///
/// - [`EngineError::InvalidRange`] for an empty or inverted range.
/// - [`EngineError::PastMoment`] when the lesson would start before `now`.
/// - [`EngineError::AmbiguousVehicle`] when the instructor has several
///   vehicles and none was picked.
/// - [`EngineError::InvalidVehicleSelection`] for a vehicle the instructor
///   may not use (unless overrides are enabled), or any vehicle on a
///   session without an instructor.
/// - [`EngineError::ResourceConflict`] from the pre-check or the store's re-check.
pub fn book_session<S, D>(
    store: &S,
    vehicles: &D,
    request: BookingRequest,
    now: NaiveDateTime,
    config: &EngineConfig,
) -> Result<Session>
where
    S: SessionStore + ?Sized,
    D: VehicleDirectory + ?Sized,
{
    let range = TimeRange::new(request.date, request.start_time, request.end_time)?;
    if range.starts_before(now) {
        return Err(EngineError::PastMoment {
            requested: range.start_datetime(),
            now,
        });
    }

    let (vehicle, vehicle_label) = match request.instructor {
        Some(instructor) => {
            let mut selection = VehicleSelection::new(config.allow_vehicle_override);
            selection.set_instructor(vehicles, Some(instructor))?;
            if let Some(picked) = request.vehicle {
                selection.choose(picked)?;
            }
            let vehicle = selection.finalize()?;
            let label = match (vehicle, request.vehicle_label) {
                (Some(id), None) => vehicles
                    .find_vehicles_by_instructor(instructor)?
                    .into_iter()
                    .find(|v| v.id == id)
                    .map(|v| v.label),
                (_, label) => label,
            };
            (vehicle, label)
        }
        None => {
            if let Some(vehicle) = request.vehicle {
                return Err(EngineError::InvalidVehicleSelection(vehicle));
            }
            (None, None)
        }
    };

    let candidate = Candidate {
        student: Some(request.student),
        instructor: request.instructor,
        vehicle,
        date: request.date,
        start_time: request.start_time,
        end_time: request.end_time,
        exclude: None,
    };
    let availability = check_availability(store, &candidate)?;
    if !availability.available {
        return Err(EngineError::ResourceConflict(availability.conflicts));
    }

    let draft = Session {
        id: SessionId(0),
        student: request.student,
        student_name: request.student_name,
        instructor: request.instructor,
        instructor_name: request.instructor_name,
        vehicle,
        vehicle_label,
        session_type: request.session_type,
        date: request.date,
        start_time: request.start_time,
        end_time: request.end_time,
        status: SessionStatus::Scheduled,
        notes: request.notes,
        cancellation_reason: None,
    };
    let saved = store.create(draft)?;
    tracing::info!(
        session = %saved.id,
        student = %saved.student,
        date = %saved.date,
        start = %saved.start_time,
        "session booked"
    );
    Ok(saved)
}

/// Move or resize a session after validating the new slot.
pub fn relocate_session<S: SessionStore + ?Sized>(
    store: &S,
    id: SessionId,
    new_date: NaiveDate,
    new_start: NaiveTime,
    new_end: NaiveTime,
    now: NaiveDateTime,
) -> Result<Session> {
    validate_relocation(store, id, new_date, new_start, new_end, now)?.into_result(id)?;

    let mut session = store.get(id)?;
    let (old_date, old_start) = (session.date, session.start_time);
    session.date = new_date;
    session.start_time = new_start;
    session.end_time = new_end;
    let saved = store.update(session)?;
    tracing::info!(
        session = %id,
        from = %old_date.and_time(old_start),
        to = %saved.starts_at(),
        "session relocated"
    );
    Ok(saved)
}

/// Remove a session outright. Unlike cancellation, no record is kept.
pub fn delete_session<S: SessionStore + ?Sized>(store: &S, id: SessionId) -> Result<()> {
    let session = store.get(id)?;
    store.delete(id)?;
    tracing::info!(
        session = %id,
        student = %session.student,
        date = %session.date,
        status = %session.status,
        "session deleted"
    );
    Ok(())
}
