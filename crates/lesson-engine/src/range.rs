//! Wall-clock time ranges on a single calendar date.
//!
//! Ranges are half-open: `[start, end)`. Two ranges on the same date overlap
//! iff `a.start < b.end && b.start < a.end`, so a lesson ending at 10:00 and
//! another starting at 10:00 do not collide.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted intervals with [`EngineError::InvalidRange`].
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidRange { start, end });
        }
        Ok(Self { date, start, end })
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }

    /// Minutes shared with `other`; zero when they do not overlap.
    pub fn overlap_minutes(&self, other: &TimeRange) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        let overlap_start = self.start.max(other.start);
        let overlap_end = self.end.min(other.end);
        (overlap_end - overlap_start).num_minutes()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.end)
    }

    /// True once `now` has reached the end of the range.
    pub fn has_ended(&self, now: NaiveDateTime) -> bool {
        now >= self.end_datetime()
    }

    /// True when the range begins strictly before `now`.
    pub fn starts_before(&self, now: NaiveDateTime) -> bool {
        self.start_datetime() < now
    }
}
