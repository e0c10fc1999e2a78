//! Calendar projection: scope, suppression, identity, mutability.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lesson_engine::*;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    day().and_time(t(h, m))
}

fn session(id: u64, student: u64, instructor: Option<u64>, status: SessionStatus) -> Session {
    Session {
        id: SessionId(id),
        student: StudentId(student),
        student_name: format!("Student {}", student),
        instructor: instructor.map(InstructorId),
        instructor_name: instructor.map(|i| format!("Instructor {}", i)),
        vehicle: None,
        vehicle_label: None,
        session_type: SessionType::Theory,
        date: day(),
        start_time: t(9, 0),
        end_time: t(10, 0),
        status,
        notes: None,
        cancellation_reason: None,
    }
}

fn exam(id: u64, student: u64, instructor: Option<u64>) -> Exam {
    Exam {
        id: ExamId(id),
        student: StudentId(student),
        student_name: format!("Student {}", student),
        instructor: instructor.map(InstructorId),
        instructor_name: None,
        exam_type: ExamType::PracticalCircuit,
        starts_at: at(14, 0),
        ends_at: None,
        result: ExamResult::Pending,
        location: Some("Circuit A".to_string()),
    }
}

fn ids(events: &[CalendarEvent]) -> Vec<String> {
    events.iter().map(|e| e.id.to_string()).collect()
}

// ── Identity ───────────────────────────────────────────────────────────────

#[test]
fn session_and_exam_with_same_numeric_id_stay_distinct() {
    let events = project(
        ViewerScope::Admin,
        &[session(7, 1, Some(1), SessionStatus::Scheduled)],
        &[exam(7, 1, Some(1))],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    assert_eq!(ids(&events), vec!["schedule_7", "exam_7"]);
}

#[test]
fn duplicate_records_are_projected_once() {
    let s = session(3, 1, Some(1), SessionStatus::Scheduled);
    let events = project(
        ViewerScope::Admin,
        &[s.clone(), s],
        &[],
        &HashSet::new(),
        &EngineConfig::default(),
    );
    assert_eq!(events.len(), 1);
}

// ── Scope ──────────────────────────────────────────────────────────────────

#[test]
fn instructor_sees_own_sessions_and_supervised_exams() {
    let events = project(
        ViewerScope::Instructor(InstructorId(1)),
        &[
            session(1, 10, Some(1), SessionStatus::Scheduled),
            session(2, 11, Some(2), SessionStatus::Scheduled),
            session(3, 12, None, SessionStatus::Scheduled),
        ],
        &[exam(1, 10, Some(1)), exam(2, 11, Some(2))],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    assert_eq!(ids(&events), vec!["schedule_1", "exam_1"]);
}

#[test]
fn student_sees_own_calendar_read_only() {
    let events = project(
        ViewerScope::Student(StudentId(10)),
        &[
            session(1, 10, Some(1), SessionStatus::Scheduled),
            session(2, 11, Some(1), SessionStatus::Scheduled),
        ],
        &[exam(4, 10, None)],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    assert_eq!(ids(&events), vec!["schedule_1", "exam_4"]);
    assert!(events.iter().all(|e| !e.editable && !e.actionable));
    assert_eq!(events[0].title, "Theory - Instructor 1");
    assert_eq!(events[1].title, "EXAM - Circuit exam");
}

#[test]
fn admin_titles_name_the_student() {
    let events = project(
        ViewerScope::Admin,
        &[session(1, 10, Some(1), SessionStatus::Scheduled)],
        &[exam(2, 11, None)],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    assert_eq!(events[0].title, "Theory - Student 10");
    assert_eq!(events[1].title, "EXAM - Circuit exam - Student 11");
}

// ── Suppression and validity ───────────────────────────────────────────────

#[test]
fn hidden_ids_are_suppressed() {
    let hidden: HashSet<EventId> = [EventId::Session(SessionId(1)), EventId::Exam(ExamId(2))]
        .into_iter()
        .collect();

    let events = project(
        ViewerScope::Admin,
        &[
            session(1, 10, Some(1), SessionStatus::Scheduled),
            session(2, 11, Some(1), SessionStatus::Scheduled),
        ],
        &[exam(1, 10, None), exam(2, 11, None)],
        &hidden,
        &EngineConfig::default(),
    );

    assert_eq!(ids(&events), vec!["schedule_2", "exam_1"]);
}

#[test]
fn degenerate_intervals_are_dropped() {
    let mut inverted = session(1, 10, Some(1), SessionStatus::Scheduled);
    inverted.end_time = t(8, 0);
    let mut empty_exam = exam(2, 10, None);
    empty_exam.ends_at = Some(empty_exam.starts_at);

    let events = project(
        ViewerScope::Admin,
        &[inverted, session(3, 10, Some(1), SessionStatus::Scheduled)],
        &[empty_exam],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    assert_eq!(ids(&events), vec!["schedule_3"]);
}

// ── Exams ──────────────────────────────────────────────────────────────────

#[test]
fn exams_are_never_editable_and_use_default_duration() {
    let events = project(
        ViewerScope::Admin,
        &[],
        &[exam(1, 10, Some(1))],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    let e = &events[0];
    assert!(!e.editable);
    assert!(!e.actionable);
    assert_eq!(e.start, at(14, 0));
    assert_eq!(e.end, at(16, 0));
    assert_eq!(e.category, "exam_practical_circuit");
    assert_eq!(e.color, "#F39C12");
}

#[test]
fn configured_exam_duration_applies() {
    let config = EngineConfig {
        exam_duration_minutes: 45,
        ..EngineConfig::default()
    };
    let events = project(
        ViewerScope::Admin,
        &[],
        &[exam(1, 10, None)],
        &HashSet::new(),
        &config,
    );
    assert_eq!(events[0].end, at(14, 45));
}

#[test]
fn exam_categories_are_colored_apart() {
    let mut theory = exam(1, 10, None);
    theory.exam_type = ExamType::Theory;
    let circuit = exam(2, 10, None);
    let mut park = exam(3, 10, None);
    park.exam_type = ExamType::PracticalPark;

    let events = project(
        ViewerScope::Admin,
        &[],
        &[theory, circuit, park],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    let colors: Vec<&str> = events.iter().map(|e| e.color.as_str()).collect();
    assert_eq!(colors, vec!["#E74C3C", "#F39C12", "#9B59B6"]);
    assert_eq!(events[2].border_color, "#9B59B6");
}

// ── Serialization ──────────────────────────────────────────────────────────

#[test]
fn event_serializes_for_calendar_widgets() {
    let events = project(
        ViewerScope::Admin,
        &[session(5, 10, Some(1), SessionStatus::InProgress)],
        &[],
        &HashSet::new(),
        &EngineConfig::default(),
    );

    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["id"], "schedule_5");
    assert_eq!(json["color"], "#F59E0B");
    assert_eq!(json["borderColor"], "#3498DB");
    assert_eq!(json["textColor"], "#FFFFFF");
    assert_eq!(json["start"], "2025-03-10T09:00:00");
    assert_eq!(json["extendedProps"]["type"], "schedule");
    assert_eq!(json["extendedProps"]["status"], "in_progress");
}
