//! Calendar projection: sessions and exams to viewer-scoped display events.
//!
//! The projector is a pure function of its inputs. It never mutates sessions,
//! and it owns no "hidden" state: callers pass the ids the user chose to hide.
//!
//! Pipeline, in order:
//!
//! 1. **Scope**: keep what the viewer may see.
//! 2. **Hidden**: drop ids the caller suppressed.
//! 3. **Validity**: drop records whose start is not before their end (logged).
//! 4. **Uniqueness**: keep the first event per id.
//!
//! No sorting is performed; calendar widgets order by start time themselves.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::*;

/// The stored record behind an event, handed back to action handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRecord {
    Schedule(Session),
    Exam(Exam),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// `theory`, `practical`, or an exam category such as `exam_theory`.
    pub category: String,
    /// Fill color.
    pub color: String,
    pub border_color: String,
    pub text_color: String,
    /// Drag and resize allowed.
    pub editable: bool,
    /// Click-through actions (status change, notes, delete) allowed.
    pub actionable: bool,
    pub extended_props: EventRecord,
}

/// Project sessions and exams into the calendar of `scope`.
pub fn project(
    scope: ViewerScope,
    sessions: &[Session],
    exams: &[Exam],
    hidden: &HashSet<EventId>,
    config: &EngineConfig,
) -> Vec<CalendarEvent> {
    let mut seen: HashSet<EventId> = HashSet::new();
    let mut events = Vec::with_capacity(sessions.len() + exams.len());

    let session_events = sessions
        .iter()
        .filter(|s| session_in_scope(scope, s))
        .filter(|s| !hidden.contains(&EventId::Session(s.id)))
        .filter_map(|s| session_event(scope, s, config));

    let exam_events = exams
        .iter()
        .filter(|e| exam_in_scope(scope, e))
        .filter(|e| !hidden.contains(&EventId::Exam(e.id)))
        .filter_map(|e| exam_event(scope, e, config));

    for event in session_events.chain(exam_events) {
        if !seen.insert(event.id) {
            tracing::warn!(event = %event.id, "duplicate event id dropped from projection");
            continue;
        }
        events.push(event);
    }

    tracing::debug!(?scope, events = events.len(), "calendar projected");
    events
}

fn session_in_scope(scope: ViewerScope, session: &Session) -> bool {
    match scope {
        ViewerScope::Admin => true,
        ViewerScope::Instructor(id) => session.instructor == Some(id),
        ViewerScope::Student(id) => session.student == id,
    }
}

fn exam_in_scope(scope: ViewerScope, exam: &Exam) -> bool {
    match scope {
        ViewerScope::Admin => true,
        ViewerScope::Instructor(id) => exam.instructor == Some(id),
        ViewerScope::Student(id) => exam.student == id,
    }
}

/// Students read their own calendar; staff scopes may act on sessions.
fn scope_may_mutate(scope: ViewerScope) -> bool {
    !matches!(scope, ViewerScope::Student(_))
}

fn session_title(scope: ViewerScope, session: &Session) -> String {
    let counterpart = match scope {
        ViewerScope::Student(_) => session
            .instructor_name
            .as_deref()
            .unwrap_or("No instructor"),
        ViewerScope::Instructor(_) | ViewerScope::Admin => session.student_name.as_str(),
    };
    format!("{} - {}", session.session_type.label(), counterpart)
}

fn session_event(
    scope: ViewerScope,
    session: &Session,
    config: &EngineConfig,
) -> Option<CalendarEvent> {
    let (start, end) = (session.starts_at(), session.ends_at());
    if start >= end {
        tracing::warn!(
            session = %session.id,
            %start,
            %end,
            "session with empty or inverted interval dropped from projection"
        );
        return None;
    }

    let mutable = scope_may_mutate(scope);
    let palette = &config.palette;
    Some(CalendarEvent {
        id: EventId::Session(session.id),
        title: session_title(scope, session),
        start,
        end,
        category: session.session_type.as_str().to_string(),
        color: palette.status_color(session.status).to_string(),
        border_color: palette.type_color(session.session_type).to_string(),
        text_color: palette.text.clone(),
        editable: mutable && !session.status.is_terminal(),
        actionable: mutable,
        extended_props: EventRecord::Schedule(session.clone()),
    })
}

fn exam_event(scope: ViewerScope, exam: &Exam, config: &EngineConfig) -> Option<CalendarEvent> {
    let start = exam.starts_at;
    let end = exam
        .ends_at
        .unwrap_or_else(|| start + Duration::minutes(i64::from(config.exam_duration_minutes)));
    if start >= end {
        tracing::warn!(
            exam = %exam.id,
            %start,
            %end,
            "exam with empty or inverted interval dropped from projection"
        );
        return None;
    }

    let title = match scope {
        ViewerScope::Student(_) => format!("EXAM - {}", exam.exam_type.label()),
        ViewerScope::Instructor(_) | ViewerScope::Admin => {
            format!("EXAM - {} - {}", exam.exam_type.label(), exam.student_name)
        }
    };

    let palette = &config.palette;
    Some(CalendarEvent {
        id: EventId::Exam(exam.id),
        title,
        start,
        end,
        category: exam.exam_type.calendar_type().to_string(),
        color: palette.exam_color(exam.exam_type).to_string(),
        border_color: palette.exam_color(exam.exam_type).to_string(),
        text_color: palette.text.clone(),
        editable: false,
        actionable: false,
        extended_props: EventRecord::Exam(exam.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn session(id: u64, status: SessionStatus) -> Session {
        Session {
            id: SessionId(id),
            student: StudentId(1),
            student_name: "Ana".to_string(),
            instructor: Some(InstructorId(2)),
            instructor_name: Some("Marc".to_string()),
            vehicle: None,
            vehicle_label: None,
            session_type: SessionType::Practical,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status,
            notes: None,
            cancellation_reason: None,
        }
    }

    #[test]
    fn title_names_the_counterpart_for_each_scope() {
        let s = session(1, SessionStatus::Scheduled);
        assert_eq!(
            session_title(ViewerScope::Student(StudentId(1)), &s),
            "Practical - Marc"
        );
        assert_eq!(
            session_title(ViewerScope::Instructor(InstructorId(2)), &s),
            "Practical - Ana"
        );
    }

    #[test]
    fn unassigned_session_title_for_student() {
        let mut s = session(1, SessionStatus::Scheduled);
        s.instructor = None;
        s.instructor_name = None;
        assert_eq!(
            session_title(ViewerScope::Student(StudentId(1)), &s),
            "Practical - No instructor"
        );
    }

    #[test]
    fn terminal_sessions_are_not_draggable() {
        let config = EngineConfig::default();
        let event = session_event(
            ViewerScope::Admin,
            &session(1, SessionStatus::Completed),
            &config,
        )
        .unwrap();
        assert!(!event.editable);
        assert!(event.actionable);
    }

    #[test]
    fn fill_follows_status_border_follows_type() {
        let config = EngineConfig::default();
        let event = session_event(
            ViewerScope::Admin,
            &session(1, SessionStatus::Cancelled),
            &config,
        )
        .unwrap();
        assert_eq!(event.color, config.palette.cancelled);
        assert_eq!(event.border_color, config.palette.practical);
    }
}
