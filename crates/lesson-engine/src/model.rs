//! Core records: sessions, exams, vehicles, and the identifiers tying them together.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::range::TimeRange;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Opaque session identifier.
    SessionId
);
id_type!(StudentId);
id_type!(InstructorId);
id_type!(VehicleId);
id_type!(
    /// Identifier of an exam record owned by the exam subsystem.
    ExamId
);

/// Kind of lesson a session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Theory,
    Practical,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Theory => "theory",
            SessionType::Practical => "practical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Theory => "Theory",
            SessionType::Practical => "Practical",
        }
    }
}

/// Lifecycle state of a session. See [`crate::lifecycle`] for the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    /// `completed`, `cancelled` and `no_show` admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::NoShow
        )
    }

    /// Whether a session in this state holds its resources for conflict purposes.
    pub fn occupies_resources(&self) -> bool {
        !matches!(self, SessionStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "no_show" => Ok(SessionStatus::NoShow),
            other => Err(format!("unknown session status: '{}'", other)),
        }
    }
}

/// A scheduled lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub student: StudentId,
    pub student_name: String,
    #[serde(default)]
    pub instructor: Option<InstructorId>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub vehicle: Option<VehicleId>,
    #[serde(default)]
    pub vehicle_label: Option<String>,
    pub session_type: SessionType,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

impl Session {
    /// The session's time range, or `None` if the stored times are inverted.
    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::new(self.date, self.start_time, self.end_time).ok()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    /// Whether this session sits on the given resource's timeline.
    pub fn uses(&self, resource: ResourceRef) -> bool {
        match resource {
            ResourceRef::Student(id) => self.student == id,
            ResourceRef::Instructor(id) => self.instructor == Some(id),
            ResourceRef::Vehicle(id) => self.vehicle == Some(id),
        }
    }

    /// Every resource identity this session holds.
    pub fn resources(&self) -> Vec<ResourceRef> {
        let mut out = vec![ResourceRef::Student(self.student)];
        if let Some(id) = self.instructor {
            out.push(ResourceRef::Instructor(id));
        }
        if let Some(id) = self.vehicle {
            out.push(ResourceRef::Vehicle(id));
        }
        out
    }
}

/// One of the three independently bookable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceRef {
    Student(StudentId),
    Instructor(InstructorId),
    Vehicle(VehicleId),
}

impl ResourceRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceRef::Student(_) => "student",
            ResourceRef::Instructor(_) => "instructor",
            ResourceRef::Vehicle(_) => "vehicle",
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Student(id) => write!(f, "student {}", id),
            ResourceRef::Instructor(id) => write!(f, "instructor {}", id),
            ResourceRef::Vehicle(id) => write!(f, "vehicle {}", id),
        }
    }
}

/// Exam category as recorded by the exam subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    Theory,
    PracticalCircuit,
    PracticalPark,
}

impl ExamType {
    /// Calendar category, e.g. `exam_practical_circuit`.
    pub fn calendar_type(&self) -> &'static str {
        match self {
            ExamType::Theory => "exam_theory",
            ExamType::PracticalCircuit => "exam_practical_circuit",
            ExamType::PracticalPark => "exam_practical_park",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExamType::Theory => "Theory exam",
            ExamType::PracticalCircuit => "Circuit exam",
            ExamType::PracticalPark => "Parking exam",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamResult {
    #[default]
    Pending,
    Passed,
    Failed,
    Absent,
}

/// A read-only exam entry consumed from the exam subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub student: StudentId,
    pub student_name: String,
    #[serde(default)]
    pub instructor: Option<InstructorId>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    pub exam_type: ExamType,
    pub starts_at: NaiveDateTime,
    /// Absent for most records; the projector then applies the configured default duration.
    #[serde(default)]
    pub ends_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub result: ExamResult,
    #[serde(default)]
    pub location: Option<String>,
}

/// A vehicle from the fleet directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub label: String,
    #[serde(default)]
    pub assigned_instructor: Option<InstructorId>,
}

/// Identifier of a projected calendar event.
///
/// Sessions and exams live in separate id spaces, so the origin is part of the
/// identity: `schedule_7` and `exam_7` are distinct events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventId {
    Session(SessionId),
    Exam(ExamId),
}

impl EventId {
    pub fn is_exam(&self) -> bool {
        matches!(self, EventId::Exam(_))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Session(id) => write!(f, "schedule_{}", id),
            EventId::Exam(id) => write!(f, "exam_{}", id),
        }
    }
}

impl FromStr for EventId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |raw: &str| {
            raw.parse::<u64>()
                .map_err(|_| format!("invalid event id: '{}'", s))
        };
        if let Some(raw) = s.strip_prefix("schedule_") {
            Ok(EventId::Session(SessionId(parse(raw)?)))
        } else if let Some(raw) = s.strip_prefix("exam_") {
            Ok(EventId::Exam(ExamId(parse(raw)?)))
        } else {
            Err(format!("invalid event id: '{}'", s))
        }
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EventId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Whose calendar is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ViewerScope {
    Instructor(InstructorId),
    Student(StudentId),
    Admin,
}

impl FromStr for ViewerScope {
    type Err = String;

    /// Parses `admin`, `instructor:<id>` or `student:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "admin" {
            return Ok(ViewerScope::Admin);
        }
        let (kind, raw) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid scope: '{}'", s))?;
        let id: u64 = raw
            .parse()
            .map_err(|_| format!("invalid scope id: '{}'", raw))?;
        match kind {
            "instructor" => Ok(ViewerScope::Instructor(InstructorId(id))),
            "student" => Ok(ViewerScope::Student(StudentId(id))),
            other => Err(format!(
                "unknown scope '{}'. Expected admin, instructor:<id> or student:<id>",
                other
            )),
        }
    }
}
