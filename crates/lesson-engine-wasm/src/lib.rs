//! WASM bindings for lesson-engine.
//!
//! Exposes availability checks, vehicle resolution, calendar projection,
//! relocation validation and status changes to the booking UI via
//! `wasm-bindgen`. All complex types cross the boundary as JSON strings. The
//! schedule itself is passed in as a snapshot
//! (`{"sessions": [...], "exams": [...], "vehicles": [...]}`); the bindings
//! hold no state between calls.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p lesson-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/lesson-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/lesson_engine_wasm.wasm
//! ```

use std::collections::HashSet;
use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lesson_engine::{
    check_availability, project, request_status_change, resolve_vehicle,
    validate_event_relocation, Candidate, EngineConfig, EventId, InMemoryStore, InstructorId,
    SessionId, SessionStatus, StoreSnapshot, ViewerScope,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Helpers: parsing inputs and serializing outputs
// ---------------------------------------------------------------------------

fn describe<E: Display>(context: &str) -> impl Fn(E) -> String + '_ {
    move |e| format!("{}: {}", context, e)
}

fn load_store(data_json: &str) -> Result<InMemoryStore, String> {
    let snapshot: StoreSnapshot =
        serde_json::from_str(data_json).map_err(describe("Invalid schedule JSON"))?;
    Ok(InMemoryStore::from_snapshot(snapshot))
}

fn load_config(config_json: Option<&str>) -> Result<EngineConfig, String> {
    match config_json {
        Some(json) => EngineConfig::from_json_str(json).map_err(|e| e.to_string()),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(describe(&format!("Invalid date '{}'", s)))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(describe(&format!("Invalid time '{}'", s)))
}

/// Local wall-clock datetime, e.g. "2025-03-10T08:00:00". Seconds are optional.
fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(describe(&format!("Invalid datetime '{}'", s)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(describe("Serialization error"))
}

// ---------------------------------------------------------------------------
// Implementations, kept free of `JsValue` so they run in native tests
// ---------------------------------------------------------------------------

fn check_availability_impl(data_json: &str, candidate_json: &str) -> Result<String, String> {
    let store = load_store(data_json)?;
    let candidate: Candidate =
        serde_json::from_str(candidate_json).map_err(describe("Invalid candidate JSON"))?;
    let result = check_availability(&store, &candidate).map_err(|e| e.to_string())?;
    to_json(&result)
}

fn resolve_vehicle_impl(data_json: &str, instructor: u32) -> Result<String, String> {
    let store = load_store(data_json)?;
    let resolution = resolve_vehicle(&store, InstructorId(u64::from(instructor)))
        .map_err(|e| e.to_string())?;
    to_json(&resolution)
}

fn project_calendar_impl(
    data_json: &str,
    scope: &str,
    hidden_json: Option<&str>,
    config_json: Option<&str>,
) -> Result<String, String> {
    let snapshot: StoreSnapshot =
        serde_json::from_str(data_json).map_err(describe("Invalid schedule JSON"))?;
    let scope: ViewerScope = scope.parse()?;
    let hidden: HashSet<EventId> = match hidden_json {
        Some(json) => serde_json::from_str(json).map_err(describe("Invalid hidden ids JSON"))?,
        None => HashSet::new(),
    };
    let config = load_config(config_json)?;
    let events = project(scope, &snapshot.sessions, &snapshot.exams, &hidden, &config);
    to_json(&events)
}

fn validate_relocation_impl(
    data_json: &str,
    event_id: &str,
    new_date: &str,
    new_start: &str,
    new_end: &str,
    now: &str,
) -> Result<String, String> {
    let store = load_store(data_json)?;
    let event: EventId = event_id.parse()?;
    let decision = validate_event_relocation(
        &store,
        event,
        parse_date(new_date)?,
        parse_time(new_start)?,
        parse_time(new_end)?,
        parse_datetime(now)?,
    )
    .map_err(|e| e.to_string())?;
    to_json(&decision)
}

fn request_status_change_impl(
    data_json: &str,
    session_id: u32,
    next: &str,
    reason: Option<&str>,
    now: &str,
) -> Result<String, String> {
    let store = load_store(data_json)?;
    let next: SessionStatus = next.parse()?;
    let session = request_status_change(
        &store,
        SessionId(u64::from(session_id)),
        next,
        reason,
        parse_datetime(now)?,
    )
    .map_err(|e| e.to_string())?;
    to_json(&session)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Check whether a candidate booking collides with existing sessions.
///
/// # Arguments
/// - `data_json` -- schedule snapshot
/// - `candidate_json` -- `{student?, instructor?, vehicle?, date, start_time, end_time, exclude?}`
///
/// Returns `{available, conflicts: [{resource, message, sessions}]}`.
#[wasm_bindgen(js_name = "checkAvailability")]
pub fn check_availability_js(data_json: &str, candidate_json: &str) -> Result<String, JsValue> {
    check_availability_impl(data_json, candidate_json).map_err(|e| JsValue::from_str(&e))
}

/// Resolve the vehicle for an instructor: `{"resolution": "none" | "single" | "ambiguous", "vehicles": ...}`.
#[wasm_bindgen(js_name = "resolveVehicle")]
pub fn resolve_vehicle_js(data_json: &str, instructor: u32) -> Result<String, JsValue> {
    resolve_vehicle_impl(data_json, instructor).map_err(|e| JsValue::from_str(&e))
}

/// Project the schedule into calendar events for a viewer.
///
/// # Arguments
/// - `scope` -- `admin`, `instructor:<id>` or `student:<id>`
/// - `hidden_json` -- optional JSON array of event ids to suppress, e.g. `["schedule_3"]`
/// - `config_json` -- optional engine configuration
#[wasm_bindgen(js_name = "projectCalendar")]
pub fn project_calendar_js(
    data_json: &str,
    scope: &str,
    hidden_json: Option<String>,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    project_calendar_impl(
        data_json,
        scope,
        hidden_json.as_deref(),
        config_json.as_deref(),
    )
    .map_err(|e| JsValue::from_str(&e))
}

/// Validate a drag or resize. Exam events fail outright.
///
/// Returns `{"decision": "ok"}` or `{"decision": "rejected", "reason": {...}}`.
#[wasm_bindgen(js_name = "validateRelocation")]
pub fn validate_relocation_js(
    data_json: &str,
    event_id: &str,
    new_date: &str,
    new_start: &str,
    new_end: &str,
    now: &str,
) -> Result<String, JsValue> {
    validate_relocation_impl(data_json, event_id, new_date, new_start, new_end, now)
        .map_err(|e| JsValue::from_str(&e))
}

/// Apply a status change and return the updated session. The caller persists it.
#[wasm_bindgen(js_name = "requestStatusChange")]
pub fn request_status_change_js(
    data_json: &str,
    session_id: u32,
    next: &str,
    reason: Option<String>,
    now: &str,
) -> Result<String, JsValue> {
    request_status_change_impl(data_json, session_id, next, reason.as_deref(), now)
        .map_err(|e| JsValue::from_str(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "sessions": [{
            "id": 1, "student": 10, "student_name": "Ana", "instructor": 1,
            "instructor_name": "Marc", "vehicle": 1, "session_type": "practical",
            "date": "2025-03-10", "start_time": "09:00:00", "end_time": "10:00:00"
        }],
        "exams": [{
            "id": 1, "student": 10, "student_name": "Ana", "exam_type": "theory",
            "starts_at": "2025-03-12T14:00:00"
        }],
        "vehicles": [{"id": 1, "label": "V1", "assigned_instructor": 1}]
    }"#;

    #[test]
    fn conflicting_candidate_reports_instructor() {
        let candidate = r#"{"student": 11, "instructor": 1, "date": "2025-03-10",
                            "start_time": "09:30:00", "end_time": "10:30:00"}"#;
        let out: serde_json::Value =
            serde_json::from_str(&check_availability_impl(DATA, candidate).unwrap()).unwrap();
        assert_eq!(out["available"], false);
        assert_eq!(out["conflicts"][0]["resource"]["kind"], "instructor");
    }

    #[test]
    fn single_vehicle_resolution() {
        let out = resolve_vehicle_impl(DATA, 1).unwrap();
        assert_eq!(out, r#"{"resolution":"single","vehicles":1}"#);
    }

    #[test]
    fn projection_honours_hidden_ids() {
        let out: serde_json::Value = serde_json::from_str(
            &project_calendar_impl(DATA, "admin", Some(r#"["schedule_1"]"#), None).unwrap(),
        )
        .unwrap();
        assert_eq!(out.as_array().unwrap().len(), 1);
        assert_eq!(out[0]["id"], "exam_1");
    }

    #[test]
    fn relocation_into_past_is_rejected() {
        let out: serde_json::Value = serde_json::from_str(
            &validate_relocation_impl(
                DATA,
                "schedule_1",
                "2025-03-09",
                "09:00",
                "10:00",
                "2025-03-10T08:00",
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(out["reason"]["reason"], "past_moment");
    }

    #[test]
    fn exam_relocation_is_an_error() {
        let err = validate_relocation_impl(
            DATA,
            "exam_1",
            "2025-03-13",
            "09:00",
            "10:00",
            "2025-03-10T08:00",
        )
        .unwrap_err();
        assert!(err.contains("immutable"));
    }

    #[test]
    fn premature_completion_is_an_error() {
        let err = request_status_change_impl(DATA, 1, "completed", None, "2025-03-10T09:30:00")
            .unwrap_err();
        assert!(err.contains("cannot be completed"));
    }

    #[test]
    fn bad_scope_is_reported() {
        assert!(project_calendar_impl(DATA, "driver:1", None, None).is_err());
    }
}
