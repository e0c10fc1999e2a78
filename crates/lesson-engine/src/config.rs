//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (`{}`) is a valid
//! configuration. Unknown fields are rejected to catch typos early.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::{ExamType, SessionStatus, SessionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Length given to exam events that carry no explicit end.
    pub exam_duration_minutes: u32,
    /// Whether an auto-filled vehicle may be replaced by hand.
    pub allow_vehicle_override: bool,
    pub palette: CalendarPalette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exam_duration_minutes: 120,
            allow_vehicle_override: false,
            palette: CalendarPalette::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.exam_duration_minutes == 0 {
            return Err(EngineError::InvalidConfig(
                "exam_duration_minutes must be positive".to_string(),
            ));
        }
        for (name, color) in self.palette.entries() {
            if !is_hex_color(color) {
                return Err(EngineError::InvalidConfig(format!(
                    "palette.{} is not a #rrggbb color: '{}'",
                    name, color
                )));
            }
        }
        Ok(())
    }
}

/// Colors used by the calendar projector.
///
/// Fill follows the session status, border follows the session type. Exams
/// are colored by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarPalette {
    pub scheduled: String,
    pub in_progress: String,
    pub completed: String,
    pub cancelled: String,
    pub no_show: String,
    pub theory: String,
    pub practical: String,
    pub exam_theory: String,
    pub exam_practical_circuit: String,
    pub exam_practical_park: String,
    pub text: String,
}

impl Default for CalendarPalette {
    fn default() -> Self {
        Self {
            scheduled: "#3B82F6".to_string(),
            in_progress: "#F59E0B".to_string(),
            completed: "#10B981".to_string(),
            cancelled: "#EF4444".to_string(),
            no_show: "#F97316".to_string(),
            theory: "#3498DB".to_string(),
            practical: "#2ECC71".to_string(),
            exam_theory: "#E74C3C".to_string(),
            exam_practical_circuit: "#F39C12".to_string(),
            exam_practical_park: "#9B59B6".to_string(),
            text: "#FFFFFF".to_string(),
        }
    }
}

impl CalendarPalette {
    pub fn status_color(&self, status: SessionStatus) -> &str {
        match status {
            SessionStatus::Scheduled => &self.scheduled,
            SessionStatus::InProgress => &self.in_progress,
            SessionStatus::Completed => &self.completed,
            SessionStatus::Cancelled => &self.cancelled,
            SessionStatus::NoShow => &self.no_show,
        }
    }

    pub fn type_color(&self, session_type: SessionType) -> &str {
        match session_type {
            SessionType::Theory => &self.theory,
            SessionType::Practical => &self.practical,
        }
    }

    pub fn exam_color(&self, exam_type: ExamType) -> &str {
        match exam_type {
            ExamType::Theory => &self.exam_theory,
            ExamType::PracticalCircuit => &self.exam_practical_circuit,
            ExamType::PracticalPark => &self.exam_practical_park,
        }
    }

    fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("scheduled", self.scheduled.as_str()),
            ("in_progress", self.in_progress.as_str()),
            ("completed", self.completed.as_str()),
            ("cancelled", self.cancelled.as_str()),
            ("no_show", self.no_show.as_str()),
            ("theory", self.theory.as_str()),
            ("practical", self.practical.as_str()),
            ("exam_theory", self.exam_theory.as_str()),
            ("exam_practical_circuit", self.exam_practical_circuit.as_str()),
            ("exam_practical_park", self.exam_practical_park.as_str()),
            ("text", self.text.as_str()),
        ]
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}
