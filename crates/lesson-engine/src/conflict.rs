//! Conflict detection across the three bookable resources.
//!
//! A candidate booking holds up to three resources: its student, its
//! instructor and its vehicle. Each one has its own [`ResourceTimeline`],
//! queried independently; a single overlapping session on any of them makes
//! the candidate unavailable.
//!
//! Overlap is half-open: a lesson ending at 10:00 and another starting at
//! 10:00 are NOT in conflict. Cancelled sessions never conflict.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::*;
use crate::range::TimeRange;
use crate::store::SessionStore;

/// A proposed session state, new or edited, not yet committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub student: Option<StudentId>,
    #[serde(default)]
    pub instructor: Option<InstructorId>,
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// The session being edited, excluded so an edit never collides with itself.
    #[serde(default)]
    pub exclude: Option<SessionId>,
}

impl Candidate {
    /// Candidate describing a stored session exactly as it is, excluding itself.
    pub fn for_session(session: &Session) -> Self {
        Self {
            student: Some(session.student),
            instructor: session.instructor,
            vehicle: session.vehicle,
            date: session.date,
            start_time: session.start_time,
            end_time: session.end_time,
            exclude: Some(session.id),
        }
    }

    pub fn range(&self) -> Result<TimeRange> {
        TimeRange::new(self.date, self.start_time, self.end_time)
    }

    /// The resource identity set: student, then instructor, then vehicle, each if present.
    pub fn resources(&self) -> Vec<ResourceRef> {
        let mut out = Vec::with_capacity(3);
        if let Some(id) = self.student {
            out.push(ResourceRef::Student(id));
        }
        if let Some(id) = self.instructor {
            out.push(ResourceRef::Instructor(id));
        }
        if let Some(id) = self.vehicle {
            out.push(ResourceRef::Vehicle(id));
        }
        out
    }
}

/// An existing session blocking the candidate, with enough context for the UI to explain why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictingSession {
    pub session_id: SessionId,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub session_type: SessionType,
    /// Set for instructor conflicts: whose lesson the instructor is already giving.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    /// Set for vehicle and student conflicts: who already has the car or the student.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
}

impl ConflictingSession {
    fn describe(resource: ResourceRef, session: &Session) -> Self {
        let (student_name, instructor_name) = match resource {
            ResourceRef::Instructor(_) => (Some(session.student_name.clone()), None),
            ResourceRef::Vehicle(_) | ResourceRef::Student(_) => {
                (None, session.instructor_name.clone())
            }
        };
        Self {
            session_id: session.id,
            start_time: session.start_time,
            end_time: session.end_time,
            session_type: session.session_type,
            student_name,
            instructor_name,
        }
    }
}

/// All collisions found on one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub resource: ResourceRef,
    pub message: String,
    pub sessions: Vec<ConflictingSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub conflicts: Vec<Conflict>,
}

impl AvailabilityResult {
    /// The conflict recorded for `resource`, if any.
    pub fn conflict_on(&self, resource: ResourceRef) -> Option<&Conflict> {
        self.conflicts.iter().find(|c| c.resource == resource)
    }
}

fn unavailable_message(resource: ResourceRef) -> String {
    match resource {
        ResourceRef::Student(_) => "The student is not available at this time",
        ResourceRef::Instructor(_) => "The instructor is not available at this time",
        ResourceRef::Vehicle(_) => "The vehicle is not available at this time",
    }
    .to_string()
}

/// One resource's bookings, as seen through the session store.
pub struct ResourceTimeline<'a, S: SessionStore + ?Sized> {
    store: &'a S,
    resource: ResourceRef,
    exclude: Option<SessionId>,
}

impl<'a, S: SessionStore + ?Sized> ResourceTimeline<'a, S> {
    pub fn new(store: &'a S, resource: ResourceRef, exclude: Option<SessionId>) -> Self {
        Self {
            store,
            resource,
            exclude,
        }
    }

    pub fn resource(&self) -> ResourceRef {
        self.resource
    }

    /// Non-cancelled sessions on this resource overlapping `range`, excluding the edited session.
    pub fn overlaps(&self, range: &TimeRange) -> Result<Vec<Session>> {
        let sessions = self
            .store
            .find_by_resource_and_date(self.resource, range.date)?;

        let mut hits = Vec::new();
        for session in sessions {
            if Some(session.id) == self.exclude || !session.status.occupies_resources() {
                continue;
            }
            // Stores may over-fetch.
            if !session.uses(self.resource) {
                continue;
            }
            let Some(existing) = session.range() else {
                tracing::warn!(
                    session = %session.id,
                    "stored session has start >= end; ignored for conflict detection"
                );
                continue;
            };
            if existing.overlaps(range) {
                hits.push(session);
            }
        }
        Ok(hits)
    }
}

/// Check whether `candidate` can be booked without double-booking any of its resources.
///
/// Pure query: nothing is written. A store failure propagates as
/// [`EngineError::StoreUnavailable`](crate::EngineError::StoreUnavailable); it
/// never degrades to "available".
///
/// # Errors
///
/// [`EngineError::InvalidRange`](crate::EngineError::InvalidRange) if
/// `start_time >= end_time`.
pub fn check_availability<S: SessionStore + ?Sized>(
    store: &S,
    candidate: &Candidate,
) -> Result<AvailabilityResult> {
    let range = candidate.range()?;

    let mut conflicts = Vec::new();
    for resource in candidate.resources() {
        let timeline = ResourceTimeline::new(store, resource, candidate.exclude);
        let hits = timeline.overlaps(&range)?;
        if hits.is_empty() {
            continue;
        }
        conflicts.push(Conflict {
            resource,
            message: unavailable_message(resource),
            sessions: hits
                .iter()
                .map(|s| ConflictingSession::describe(resource, s))
                .collect(),
        });
    }

    tracing::debug!(
        date = %range.date,
        start = %range.start,
        end = %range.end,
        conflicts = conflicts.len(),
        "availability checked"
    );

    Ok(AvailabilityResult {
        available: conflicts.is_empty(),
        conflicts,
    })
}

/// Two stored sessions holding the same resource at overlapping times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoubleBooking {
    pub resource: ResourceRef,
    pub first: SessionId,
    pub second: SessionId,
    pub overlap_minutes: i64,
}

/// Scan already-stored sessions for invariant violations, e.g. after importing legacy data.
///
/// Every pair of non-cancelled sessions sharing a resource is compared.
/// Each violating pair is reported once per shared resource, with
/// `first < second`.
pub fn find_double_bookings(sessions: &[Session]) -> Vec<DoubleBooking> {
    let active: Vec<(&Session, TimeRange)> = sessions
        .iter()
        .filter(|s| s.status.occupies_resources())
        .filter_map(|s| s.range().map(|r| (s, r)))
        .collect();

    let mut found = Vec::new();
    for (i, (a, range_a)) in active.iter().enumerate() {
        for (b, range_b) in &active[i + 1..] {
            if a.id == b.id || !range_a.overlaps(range_b) {
                continue;
            }
            let overlap_minutes = range_a.overlap_minutes(range_b);
            for resource in a.resources() {
                if b.uses(resource) {
                    let (first, second) = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
                    found.push(DoubleBooking {
                        resource,
                        first,
                        second,
                        overlap_minutes,
                    });
                }
            }
        }
    }
    found
}
