//! Persistence seams and the in-memory reference store.
//!
//! The engine never owns storage. It talks to a [`SessionStore`] for lessons,
//! an [`ExamSource`] for read-only exam records and a
//! [`VehicleDirectory`](crate::vehicle::VehicleDirectory) for the fleet.
//! [`InMemoryStore`] implements all three and is what the CLI, the WASM
//! bindings and the tests run against.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::conflict::{check_availability, Candidate};
use crate::error::StoreError;
use crate::model::*;
use crate::vehicle::VehicleDirectory;

/// Durable collection of sessions.
///
/// Implementations must re-validate the no-overlap invariant inside
/// [`create`](SessionStore::create) and [`update`](SessionStore::update): an
/// earlier availability check is advisory and may be stale by the time the
/// write lands.
pub trait SessionStore {
    /// All sessions (any status) on `date` that hold `resource`.
    fn find_by_resource_and_date(
        &self,
        resource: ResourceRef,
        date: NaiveDate,
    ) -> Result<Vec<Session>, StoreError>;

    fn get(&self, id: SessionId) -> Result<Session, StoreError>;

    /// Persist a new session. The store assigns the id; the draft's id is ignored.
    fn create(&self, draft: Session) -> Result<Session, StoreError>;

    fn update(&self, session: Session) -> Result<Session, StoreError>;

    fn delete(&self, id: SessionId) -> Result<(), StoreError>;
}

/// Read-only access to exam records.
pub trait ExamSource {
    /// Exams visible to `scope` whose start falls within `[from, to]` (inclusive dates).
    fn find_exams_for_viewer(
        &self,
        scope: ViewerScope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Exam>, StoreError>;
}

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

pub struct InMemoryStore {
    sessions: DashMap<SessionId, Session>,
    exams: DashMap<ExamId, Exam>,
    vehicles: DashMap<VehicleId, Vehicle>,
    next_id: AtomicU64,
    /// Serializes writes so the overlap re-check and the insert are atomic.
    write_gate: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            exams: DashMap::new(),
            vehicles: DashMap::new(),
            next_id: AtomicU64::new(1),
            write_gate: Mutex::new(()),
        }
    }

    /// Load a snapshot verbatim. Stored data is taken as-is; no overlap checks run.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        let mut max_id = 0;
        for session in snapshot.sessions {
            max_id = max_id.max(session.id.0);
            store.sessions.insert(session.id, session);
        }
        for exam in snapshot.exams {
            store.exams.insert(exam.id, exam);
        }
        for vehicle in snapshot.vehicles {
            store.vehicles.insert(vehicle.id, vehicle);
        }
        store.next_id.store(max_id.saturating_add(1), Ordering::SeqCst);
        store
    }

    /// Current contents, sessions ordered by date then start time.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut sessions: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by_key(|s| (s.date, s.start_time, s.id));
        let mut exams: Vec<Exam> = self.exams.iter().map(|e| e.value().clone()).collect();
        exams.sort_by_key(|e| (e.starts_at, e.id));
        let mut vehicles: Vec<Vehicle> = self.vehicles.iter().map(|e| e.value().clone()).collect();
        vehicles.sort_by_key(|v| v.id);
        StoreSnapshot {
            sessions,
            exams,
            vehicles,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn all_sessions(&self) -> Vec<Session> {
        self.snapshot().sessions
    }

    pub fn insert_exam(&self, exam: Exam) {
        self.exams.insert(exam.id, exam);
    }

    pub fn insert_vehicle(&self, vehicle: Vehicle) {
        self.vehicles.insert(vehicle.id, vehicle);
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_gate
            .lock()
            .map_err(|_| StoreError::Unavailable("write gate poisoned".to_string()))
    }

    /// Write-time overlap check against everything already stored.
    fn recheck_overlap(&self, session: &Session) -> Result<(), StoreError> {
        if !session.status.occupies_resources() {
            return Ok(());
        }
        let candidate = Candidate::for_session(session);
        let result = check_availability(self, &candidate)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if result.available {
            Ok(())
        } else {
            Err(StoreError::Overlap(result.conflicts))
        }
    }
}

/// Whether an update touches the time slot or resources a session holds.
///
/// Status-only and note-only updates skip the overlap re-check.
fn holdings_changed(old: &Session, new: &Session) -> bool {
    old.date != new.date
        || old.start_time != new.start_time
        || old.end_time != new.end_time
        || old.student != new.student
        || old.instructor != new.instructor
        || old.vehicle != new.vehicle
        || (!old.status.occupies_resources() && new.status.occupies_resources())
}

impl SessionStore for InMemoryStore {
    fn find_by_resource_and_date(
        &self,
        resource: ResourceRef,
        date: NaiveDate,
    ) -> Result<Vec<Session>, StoreError> {
        let mut found: Vec<Session> = self
            .sessions
            .iter()
            .filter(|e| e.date == date && e.uses(resource))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|s| (s.start_time, s.id));
        Ok(found)
    }

    fn get(&self, id: SessionId) -> Result<Session, StoreError> {
        self.sessions
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn create(&self, mut draft: Session) -> Result<Session, StoreError> {
        let _gate = self.lock_writes()?;
        draft.id = SessionId(self.next_id.load(Ordering::SeqCst));
        if self.sessions.contains_key(&draft.id) {
            return Err(StoreError::Unavailable("session id space exhausted".to_string()));
        }
        self.recheck_overlap(&draft)?;
        self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sessions.insert(draft.id, draft.clone());
        Ok(draft)
    }

    fn update(&self, session: Session) -> Result<Session, StoreError> {
        let _gate = self.lock_writes()?;
        let previous = self.get(session.id)?;
        if holdings_changed(&previous, &session) {
            self.recheck_overlap(&session)?;
        }
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        let _gate = self.lock_writes()?;
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

impl ExamSource for InMemoryStore {
    fn find_exams_for_viewer(
        &self,
        scope: ViewerScope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Exam>, StoreError> {
        let mut found: Vec<Exam> = self
            .exams
            .iter()
            .filter(|e| {
                let day = e.starts_at.date();
                from <= day && day <= to
            })
            .filter(|e| match scope {
                ViewerScope::Admin => true,
                ViewerScope::Student(id) => e.student == id,
                ViewerScope::Instructor(id) => e.instructor == Some(id),
            })
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|e| (e.starts_at, e.id));
        Ok(found)
    }
}

impl VehicleDirectory for InMemoryStore {
    fn find_vehicles_by_instructor(
        &self,
        instructor: InstructorId,
    ) -> Result<Vec<Vehicle>, StoreError> {
        let mut found: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|e| e.assigned_instructor == Some(instructor))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|v| v.id);
        Ok(found)
    }
}
