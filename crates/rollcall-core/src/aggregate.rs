//! Cross-cohort attendance aggregation for the dashboard comparison.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::models::{Cohort, CohortType};

/// Parse a percentage as returned by the overall-attendance facet.
/// Missing or unreadable values count as zero.
pub fn parse_percentage(raw: &str) -> f64 {
    match raw.trim().trim_end_matches('%').parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            warn!(value = %raw, "Unreadable attendance percentage, counting as 0");
            0.0
        }
    }
}

/// Block average: the sum of cohort percentages divided by the number of
/// cohorts requested. Cohorts whose fetch failed contribute zero.
pub fn average_attendance(percentages: &HashMap<String, String>, cohort_count: usize) -> f64 {
    if cohort_count == 0 {
        return 0.0;
    }
    let total: f64 = percentages.values().map(|p| parse_percentage(p)).sum();
    total / cohort_count as f64
}

/// Two-decimal display, e.g. `70.00`
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}", value)
}

/// One bar of the centre comparison chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub cohort_id: String,
    pub name: String,
    pub attendance: f64,
}

/// Rows for cohorts of one centre type, in cohort order
pub fn comparison_rows(
    cohorts: &[Cohort],
    percentages: &HashMap<String, String>,
    cohort_type: CohortType,
) -> Vec<ComparisonRow> {
    cohorts
        .iter()
        .filter(|c| c.cohort_type == cohort_type)
        .map(|c| ComparisonRow {
            cohort_id: c.id.clone(),
            name: c.name.clone(),
            attendance: percentages
                .get(&c.id)
                .map(|p| parse_percentage(p))
                .unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_average_attendance() {
        let data = pct(&[("A", "80"), ("B", "60")]);
        assert_eq!(format_percentage(average_attendance(&data, 2)), "70.00");
    }

    #[test]
    fn test_average_divides_by_requested_cohorts() {
        // Third cohort failed to load
        let data = pct(&[("A", "80"), ("B", "60")]);
        assert_eq!(format_percentage(average_attendance(&data, 3)), "46.67");
    }

    #[test]
    fn test_average_handles_empty_and_bad_values() {
        assert_eq!(average_attendance(&HashMap::new(), 0), 0.0);
        let data = pct(&[("A", "abc"), ("B", "50%")]);
        assert_eq!(average_attendance(&data, 2), 25.0);
    }

    #[test]
    fn test_comparison_rows() {
        let cohorts = vec![
            Cohort::new("c1", CohortType::Regular, "Khapari"),
            Cohort::new("c2", CohortType::Remote, "Bhor"),
            Cohort::new("c3", CohortType::Regular, "Wadi"),
        ];
        let data = pct(&[("c1", "72.5"), ("c2", "40")]);

        let regular = comparison_rows(&cohorts, &data, CohortType::Regular);
        assert_eq!(regular.len(), 2);
        assert_eq!(regular[0].name, "Khapari");
        assert_eq!(regular[0].attendance, 72.5);
        assert_eq!(regular[1].name, "Wadi");
        assert_eq!(regular[1].attendance, 0.0);

        let remote = comparison_rows(&cohorts, &data, CohortType::Remote);
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].attendance, 40.0);
    }

    #[test]
    fn test_comparison_rows_match_average() {
        let cohorts = vec![Cohort::new("A", CohortType::Regular, "Khapari")];
        let data = pct(&[("A", "50%")]);

        let rows = comparison_rows(&cohorts, &data, CohortType::Regular);
        assert_eq!(rows[0].attendance, 50.0);
        assert_eq!(rows[0].attendance, average_attendance(&data, 1));
    }
}
