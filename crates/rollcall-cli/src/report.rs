//! Plain-text rendering of roster and attendance views.

use std::fmt::Write;

use rollcall_core::aggregate::{format_percentage, ComparisonRow};
use rollcall_core::attendance::DaySummary;
use rollcall_core::models::{CohortType, RosterEntry, SortCriterion};
use rollcall_core::utils::{format_day_month, truncate};

/// Width of the name column
const NAME_WIDTH: usize = 28;

pub fn roster_table(entries: &[RosterEntry], criterion: SortCriterion) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Sorted by {}", criterion.label());

    if entries.is_empty() {
        let _ = writeln!(output, "No data found");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<width$} {:<14} {:>8} {:>7} {:>8}",
        "Name",
        "Enrollment",
        "Today",
        "Att %",
        "Missed",
        width = NAME_WIDTH
    );
    for entry in entries {
        let learner = &entry.learner;
        let mut name = truncate(&learner.name, NAME_WIDTH);
        if learner.is_dropout {
            name = truncate(&format!("{} (dropout)", learner.name), NAME_WIDTH);
        }
        let _ = writeln!(
            output,
            "{:<width$} {:<14} {:>8} {:>7} {:>8}",
            name,
            truncate(learner.enrollment_display(), 14),
            entry.attendance.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
            entry
                .attendance_percentage
                .map(|p| format!("{:.0}%", p))
                .unwrap_or_else(|| "-".to_string()),
            entry
                .classes_missed
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            width = NAME_WIDTH
        );
    }
    output
}

pub fn status_table(days: &[DaySummary]) -> String {
    let mut output = String::new();
    for day in days {
        let detail = match (day.percentage, day.present_count, day.total_count) {
            (Some(pct), Some(present), Some(total)) => {
                format!("{:.0}% attendance ({}/{} present)", pct, present, total)
            }
            (Some(pct), _, _) => format!("{:.0}% attendance", pct),
            _ => day.status.label().to_string(),
        };
        let _ = writeln!(
            output,
            "{:<7} {:<12} {:<36} {:<8} {}",
            format_day_month(day.date),
            day.status.label(),
            detail,
            day.action.label(),
            day.color
        );
    }
    output
}

pub fn comparison_table(center_type: CohortType, average: f64, rows: &[ComparisonRow]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Attendance comparison ({} centres)", center_type);
    let _ = writeln!(output, "Block average attendance: {}%", format_percentage(average));

    if rows.is_empty() {
        let _ = writeln!(output, "No centres of this type.");
        return output;
    }
    for row in rows {
        let _ = writeln!(
            output,
            "- {:<width$} {}%",
            truncate(&row.name, NAME_WIDTH),
            row.attendance,
            width = NAME_WIDTH
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rollcall_core::attendance::{resolve_day, ColorBands, EDIT_WINDOW_DAYS};
    use rollcall_core::models::{AttendanceByDate, AttendanceMark, AttendanceRecord, Learner, SortDirection};

    #[test]
    fn test_roster_table_empty() {
        let out = roster_table(&[], SortCriterion::default());
        assert!(out.contains("Names: A to Z"));
        assert!(out.contains("No data found"));
    }

    #[test]
    fn test_roster_table_rows() {
        let mut dropout = Learner::new("2", "Anita");
        dropout.is_dropout = true;
        let entries = vec![
            RosterEntry::new(Learner::new("1", "Rahul Kumar"))
                .with_attendance(AttendanceMark::Present)
                .with_percentage(75.0)
                .with_classes_missed(1),
            RosterEntry::new(dropout),
        ];
        let out = roster_table(&entries, SortCriterion::ClassesMissed(SortDirection::Descending));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("Rahul Kumar"));
        assert!(lines[2].contains("Present"));
        assert!(lines[2].contains("75%"));
        assert!(lines[3].contains("Anita (dropout)"));
    }

    #[test]
    fn test_status_table() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let marked = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
        let mut records = AttendanceByDate::new();
        records.insert(marked, AttendanceRecord::from_counts(marked, 9, 10));

        let bands = ColorBands::default();
        let days = vec![
            resolve_day(marked, &records, today, &bands, EDIT_WINDOW_DAYS),
            resolve_day(today, &records, today, &bands, EDIT_WINDOW_DAYS),
        ];
        let out = status_table(&days);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("90% attendance (9/10 present)"));
        assert!(lines[0].contains("Modify"));
        assert!(lines[1].contains("Not marked"));
        assert!(lines[1].contains("Mark"));
    }

    #[test]
    fn test_comparison_table() {
        let rows = vec![ComparisonRow {
            cohort_id: "c1".to_string(),
            name: "Khapari".to_string(),
            attendance: 72.5,
        }];
        let out = comparison_table(CohortType::Regular, 70.0, &rows);
        assert!(out.contains("Regular centres"));
        assert!(out.contains("Block average attendance: 70.00%"));
        assert!(out.contains("72.5%"));
    }
}
