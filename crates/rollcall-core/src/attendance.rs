//! Attendance status resolution for a single date.
//!
//! Every function here is pure: the reference "today" is always passed in
//! by the caller, so results are deterministic and safe to call from any
//! thread.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceByDate, AttendanceMark, AttendanceRecord, AttendanceStatus};

/// Number of days back from today in which a marked day may still be edited
pub const EDIT_WINDOW_DAYS: i64 = 7;

/// Classify a stored record. Cohort summaries carry no mark and are
/// classified by whether anyone attended.
pub fn status_of_record(record: &AttendanceRecord) -> AttendanceStatus {
    match record.mark {
        Some(AttendanceMark::Present) => AttendanceStatus::Present,
        Some(AttendanceMark::Absent) => AttendanceStatus::Absent,
        None if record.present_count > 0 => AttendanceStatus::Present,
        None => AttendanceStatus::Absent,
    }
}

/// Resolve the attendance status of `target`.
///
/// Dates after `today` are always `FutureDate`, even when a record exists.
/// A missing record is `NotMarked`.
pub fn resolve_status(target: NaiveDate, records: &AttendanceByDate, today: NaiveDate) -> AttendanceStatus {
    if target > today {
        return AttendanceStatus::FutureDate;
    }
    records
        .get(&target)
        .map(status_of_record)
        .unwrap_or(AttendanceStatus::NotMarked)
}

/// Percentage to render for `target`, if the day has been marked
pub fn display_percentage(target: NaiveDate, records: &AttendanceByDate, today: NaiveDate) -> Option<f64> {
    if target > today {
        return None;
    }
    records.get(&target).map(|r| r.present_percentage)
}

/// Whether attendance for `target` may still be marked or changed
pub fn can_modify(status: AttendanceStatus, target: NaiveDate, today: NaiveDate) -> bool {
    can_modify_within(status, target, today, EDIT_WINDOW_DAYS)
}

/// Same as [`can_modify`] with a custom window.
/// The oldest editable day is `today - window_days`, inclusive.
pub fn can_modify_within(
    status: AttendanceStatus,
    target: NaiveDate,
    today: NaiveDate,
    window_days: i64,
) -> bool {
    if status == AttendanceStatus::FutureDate || target > today {
        return false;
    }
    target >= today - Duration::days(window_days.max(0))
}

/// What the edit control for a day offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub enum EditAction {
    /// Not yet marked, marking allowed
    Mark,
    /// Already marked, changes allowed
    Modify,
    /// Future date, or outside the edit window
    Locked,
}

impl EditAction {
    pub fn label(&self) -> &'static str {
        match self {
            EditAction::Mark => "Mark",
            EditAction::Modify => "Modify",
            EditAction::Locked => "Locked",
        }
    }
}

/// Button shown for a day under the default edit window.
pub fn edit_action(status: AttendanceStatus, target: NaiveDate, today: NaiveDate) -> EditAction {
    edit_action_within(status, target, today, EDIT_WINDOW_DAYS)
}

/// Button shown for a day under a custom edit window.
pub fn edit_action_within(
    status: AttendanceStatus,
    target: NaiveDate,
    today: NaiveDate,
    window_days: i64,
) -> EditAction {
    if !can_modify_within(status, target, today, window_days) {
        EditAction::Locked
    } else if status == AttendanceStatus::NotMarked {
        EditAction::Mark
    } else {
        EditAction::Modify
    }
}

// ============================================================================
// Colour bands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub enum AttendanceBand {
    Low,
    Medium,
    High,
}

/// Thresholds and colours used to present an attendance percentage.
/// These are styling parameters, loaded from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorBands {
    /// Percentages below this are `Low`
    pub low_below: f64,
    /// Percentages at or above this are `High`
    pub high_from: f64,
    pub low_color: String,
    pub medium_color: String,
    pub high_color: String,
    /// Used when there is no percentage to show
    pub neutral_color: String,
}

impl Default for ColorBands {
    fn default() -> Self {
        Self {
            low_below: 50.0,
            high_from: 80.0,
            low_color: "#BA1A1A".to_string(),
            medium_color: "#987100".to_string(),
            high_color: "#1A8825".to_string(),
            neutral_color: "#4D4639".to_string(),
        }
    }
}

impl ColorBands {
    /// Swap inverted thresholds so that every percentage lands in exactly one band
    pub fn normalized(mut self) -> Self {
        if self.low_below > self.high_from {
            std::mem::swap(&mut self.low_below, &mut self.high_from);
        }
        self
    }

    pub fn band(&self, percentage: f64) -> AttendanceBand {
        if percentage < self.low_below {
            AttendanceBand::Low
        } else if percentage >= self.high_from {
            AttendanceBand::High
        } else {
            AttendanceBand::Medium
        }
    }

    pub fn band_color(&self, band: AttendanceBand) -> &str {
        match band {
            AttendanceBand::Low => &self.low_color,
            AttendanceBand::Medium => &self.medium_color,
            AttendanceBand::High => &self.high_color,
        }
    }

    /// Path colour for an optional percentage
    pub fn color(&self, percentage: Option<f64>) -> &str {
        match percentage {
            Some(pct) => self.band_color(self.band(pct)),
            None => &self.neutral_color,
        }
    }
}

// ============================================================================
// Day summary
// ============================================================================

/// Everything a day row needs to display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub percentage: Option<f64>,
    pub present_count: Option<u32>,
    pub total_count: Option<u32>,
    pub band: Option<AttendanceBand>,
    pub color: String,
    pub action: EditAction,
}

pub fn resolve_day(
    target: NaiveDate,
    records: &AttendanceByDate,
    today: NaiveDate,
    bands: &ColorBands,
    window_days: i64,
) -> DaySummary {
    let status = resolve_status(target, records, today);
    let percentage = display_percentage(target, records, today);
    let record = records.get(&target).filter(|_| status.is_marked());

    DaySummary {
        date: target,
        status,
        percentage,
        present_count: record.map(|r| r.present_count),
        total_count: record.map(|r| r.total_count),
        band: percentage.map(|p| bands.band(p)),
        color: bands.color(percentage).to_string(),
        action: edit_action_within(status, target, today, window_days),
    }
}
