//! The booking write path, including the store's write-time re-check.

use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lesson_engine::*;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn now() -> NaiveDateTime {
    d(10).and_time(t(7, 0))
}

fn request(student: u64, instructor: Option<u64>, start: u32, end: u32) -> BookingRequest {
    BookingRequest {
        student: StudentId(student),
        student_name: format!("Student {}", student),
        instructor: instructor.map(InstructorId),
        instructor_name: instructor.map(|i| format!("Instructor {}", i)),
        vehicle: None,
        vehicle_label: None,
        session_type: SessionType::Practical,
        date: d(10),
        start_time: t(start, 0),
        end_time: t(end, 0),
        notes: None,
    }
}

/// Instructor 1 drives V1; instructor 3 has V3 and V4.
fn school() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert_vehicle(Vehicle {
        id: VehicleId(1),
        label: "V1".to_string(),
        assigned_instructor: Some(InstructorId(1)),
    });
    for id in [3, 4] {
        store.insert_vehicle(Vehicle {
            id: VehicleId(id),
            label: format!("V{}", id),
            assigned_instructor: Some(InstructorId(3)),
        });
    }
    store
}

// ── Create ─────────────────────────────────────────────────────────────────

#[test]
fn single_vehicle_is_filled_and_second_booking_conflicts() {
    let store = school();
    let config = EngineConfig::default();

    let first = book_session(&store, &store, request(10, Some(1), 9, 10), now(), &config).unwrap();
    assert_eq!(first.vehicle, Some(VehicleId(1)));
    assert_eq!(first.vehicle_label.as_deref(), Some("V1"));
    assert_eq!(first.status, SessionStatus::Scheduled);

    let err =
        book_session(&store, &store, request(11, Some(1), 9, 10), now(), &config).unwrap_err();
    match err {
        EngineError::ResourceConflict(conflicts) => {
            let instructor = conflicts
                .iter()
                .find(|c| c.resource == ResourceRef::Instructor(InstructorId(1)))
                .expect("instructor conflict");
            assert_eq!(instructor.sessions[0].session_id, first.id);
            assert_eq!(instructor.sessions[0].start_time, t(9, 0));
            assert_eq!(instructor.sessions[0].end_time, t(10, 0));
        }
        other => panic!("expected ResourceConflict, got {other:?}"),
    }
    assert_eq!(store.session_count(), 1);
}

#[test]
fn ambiguous_vehicle_blocks_booking_until_chosen() {
    let store = school();
    let config = EngineConfig::default();

    let err =
        book_session(&store, &store, request(10, Some(3), 9, 10), now(), &config).unwrap_err();
    assert!(matches!(err, EngineError::AmbiguousVehicle(_)));

    let mut picked = request(10, Some(3), 9, 10);
    picked.vehicle = Some(VehicleId(4));
    let saved = book_session(&store, &store, picked, now(), &config).unwrap();
    assert_eq!(saved.vehicle, Some(VehicleId(4)));
    assert_eq!(saved.vehicle_label.as_deref(), Some("V4"));
}

#[test]
fn instructor_without_vehicle_books_without_one() {
    let store = school();
    let saved = book_session(
        &store,
        &store,
        request(10, Some(2), 9, 10),
        now(),
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(saved.vehicle, None);
}

#[test]
fn vehicle_without_instructor_is_refused() {
    let store = school();
    let mut free = request(1, None, 9, 10);
    free.vehicle = Some(VehicleId(1));

    let err = book_session(&store, &store, free, now(), &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidVehicleSelection(VehicleId(1))));
    assert_eq!(store.session_count(), 0);

    // The car stays bookable for someone else in the same slot.
    book_session(
        &store,
        &store,
        request(2, None, 9, 10),
        now(),
        &EngineConfig::default(),
    )
    .unwrap();
    book_session(
        &store,
        &store,
        request(3, Some(1), 9, 10),
        now(),
        &EngineConfig::default(),
    )
    .unwrap();
}

#[test]
fn snapshot_with_largest_id_refuses_new_sessions() {
    let store = school();
    let mut last = book_session(
        &store,
        &store,
        request(10, Some(1), 9, 10),
        now(),
        &EngineConfig::default(),
    )
    .unwrap();
    store.delete(last.id).unwrap();
    last.id = SessionId(u64::MAX);

    let mut snapshot = store.snapshot();
    snapshot.sessions.push(last);
    let restored = InMemoryStore::from_snapshot(snapshot);

    let err = book_session(
        &restored,
        &restored,
        request(11, Some(1), 14, 15),
        now(),
        &EngineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::StoreUnavailable(_)));
    assert_eq!(restored.session_count(), 1);
}

#[test]
fn booking_in_the_past_is_rejected() {
    let store = school();
    let late = d(10).and_time(t(9, 30));

    let err = book_session(
        &store,
        &store,
        request(10, Some(1), 9, 10),
        late,
        &EngineConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::PastMoment { .. }));
}

#[test]
fn store_recheck_catches_a_write_that_skipped_the_precheck() {
    let store = school();
    let config = EngineConfig::default();
    let first = book_session(&store, &store, request(10, Some(1), 9, 10), now(), &config).unwrap();

    let mut sneaky = first.clone();
    sneaky.student = StudentId(11);
    sneaky.vehicle = None;
    let err = EngineError::from(store.create(sneaky).unwrap_err());

    assert!(matches!(err, EngineError::ResourceConflict(_)));
    assert_eq!(store.session_count(), 1);
}

#[test]
fn concurrent_bookings_for_one_slot_admit_exactly_one() {
    let store = Arc::new(school());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                book_session(
                    store.as_ref(),
                    store.as_ref(),
                    request(100 + i, Some(1), 9, 10),
                    now(),
                    &EngineConfig::default(),
                )
                .is_ok()
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(admitted, 1);
    assert_eq!(store.session_count(), 1);
}

// ── Relocate and delete ────────────────────────────────────────────────────

#[test]
fn relocation_persists_new_times() {
    let store = school();
    let config = EngineConfig::default();
    let booked = book_session(&store, &store, request(10, Some(1), 9, 10), now(), &config).unwrap();

    let moved = relocate_session(&store, booked.id, d(11), t(14, 0), t(15, 30), now()).unwrap();

    assert_eq!(moved.date, d(11));
    assert_eq!(moved.start_time, t(14, 0));
    assert_eq!(store.get(booked.id).unwrap().end_time, t(15, 30));
}

#[test]
fn rejected_relocation_leaves_session_untouched() {
    let store = school();
    let config = EngineConfig::default();
    let a = book_session(&store, &store, request(10, Some(1), 9, 10), now(), &config).unwrap();
    book_session(&store, &store, request(11, Some(1), 11, 12), now(), &config).unwrap();

    let err = relocate_session(&store, a.id, d(10), t(11, 0), t(12, 0), now()).unwrap_err();

    assert!(matches!(err, EngineError::ResourceConflict(_)));
    assert_eq!(store.get(a.id).unwrap().start_time, t(9, 0));
}

#[test]
fn delete_removes_the_session() {
    let store = school();
    let booked = book_session(
        &store,
        &store,
        request(10, Some(1), 9, 10),
        now(),
        &EngineConfig::default(),
    )
    .unwrap();

    delete_session(&store, booked.id).unwrap();

    assert_eq!(store.session_count(), 0);
    assert!(matches!(
        delete_session(&store, booked.id),
        Err(EngineError::SessionNotFound(_))
    ));
}

// ── Hours ──────────────────────────────────────────────────────────────────

#[test]
fn completed_hours_count_only_completed_sessions() {
    let store = school();
    let config = EngineConfig::default();
    let a = book_session(&store, &store, request(10, Some(1), 9, 10), now(), &config).unwrap();
    let mut theory = request(10, None, 11, 12);
    theory.session_type = SessionType::Theory;
    let b = book_session(&store, &store, theory, now(), &config).unwrap();
    book_session(&store, &store, request(10, Some(1), 13, 14), now(), &config).unwrap();

    let evening = d(10).and_time(t(18, 0));
    request_status_change(&store, a.id, SessionStatus::Completed, None, evening).unwrap();
    request_status_change(&store, b.id, SessionStatus::Completed, None, evening).unwrap();

    let hours = completed_hours(&store.all_sessions(), StudentId(10));
    assert_eq!(hours.practical_hours, 1.0);
    assert_eq!(hours.theory_hours, 1.0);
    assert_eq!(hours.total(), 2.0);
    assert_eq!(completed_hours(&store.all_sessions(), StudentId(99)), StudentHours::default());
}

#[test]
fn quarter_hour_sessions_round_to_even_half() {
    let store = school();
    let config = EngineConfig::default();
    let mut short = request(10, Some(1), 9, 10);
    short.end_time = t(9, 15);
    let mut long = request(10, Some(1), 11, 12);
    long.end_time = t(12, 15);
    let short = book_session(&store, &store, short, now(), &config).unwrap();
    let long = book_session(&store, &store, long, now(), &config).unwrap();

    let evening = d(10).and_time(t(18, 0));
    for id in [short.id, long.id] {
        request_status_change(&store, id, SessionStatus::Completed, None, evening).unwrap();
    }

    let hours = completed_hours(&store.all_sessions(), StudentId(10));
    assert_eq!(hours.practical_hours, 1.0);
}
