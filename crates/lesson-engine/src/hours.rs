//! Completed-hours tally for a student's progress record.

use serde::{Deserialize, Serialize};

use crate::model::{Session, SessionStatus, SessionType, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentHours {
    pub theory_hours: f64,
    pub practical_hours: f64,
}

impl StudentHours {
    pub fn total(&self) -> f64 {
        self.theory_hours + self.practical_hours
    }
}

/// Sum the student's completed sessions by type.
///
/// Each session counts its duration rounded to the nearest half hour, so a
/// 50-minute lesson counts as 1.0 and a 40-minute one as 0.5.
pub fn completed_hours(sessions: &[Session], student: StudentId) -> StudentHours {
    let mut hours = StudentHours::default();
    for session in sessions
        .iter()
        .filter(|s| s.student == student && s.status == SessionStatus::Completed)
    {
        let Some(range) = session.range() else {
            tracing::warn!(session = %session.id, "completed session with inverted times skipped");
            continue;
        };
        let rounded = round_half_hour(range.duration_minutes());
        match session.session_type {
            SessionType::Theory => hours.theory_hours += rounded,
            SessionType::Practical => hours.practical_hours += rounded,
        }
    }
    hours
}

/// Exact quarter hours round to the even half, so 15 minutes is 0.0 and
/// 45 minutes is 1.0.
fn round_half_hour(minutes: i64) -> f64 {
    (minutes as f64 / 30.0).round_ties_even() / 2.0
}
