//! Roster ordering and filtering.
//!
//! `sort_roster` applies exactly one `SortCriterion`. All sorts are stable,
//! so entries that compare equal keep their input order.

use std::cmp::Ordering;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AttendanceByDate, AttendanceMark, Learner, RosterEntry, RosterView, SortCriterion,
    SortDirection,
};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("Unknown sort criterion: {0}")]
    UnknownCriterion(String),

    #[error("Sort criterion {criterion} is not offered on the {view:?} view")]
    CriterionNotOffered {
        criterion: SortCriterion,
        view: RosterView,
    },
}

/// Missing values compare as the lowest value
fn cmp_metric(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn directed(cmp: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => cmp,
        SortDirection::Descending => cmp.reverse(),
    }
}

/// Order a roster by one criterion
pub fn sort_roster(entries: &[RosterEntry], criterion: SortCriterion) -> Vec<RosterEntry> {
    let mut sorted = entries.to_vec();

    match criterion {
        SortCriterion::Name(direction) => {
            sorted.sort_by(|a, b| directed(cmp_ignore_case(&a.learner.name, &b.learner.name), direction));
        }
        SortCriterion::Attendance(category) => {
            // Stable partition: the leading group first, everyone else after
            let leading = category.leading_mark();
            sorted.sort_by_key(|e| e.attendance != Some(leading));
        }
        SortCriterion::ClassesMissed(direction) => {
            sorted.sort_by(|a, b| {
                directed(
                    cmp_metric(a.classes_missed.map(f64::from), b.classes_missed.map(f64::from)),
                    direction,
                )
            });
        }
        SortCriterion::AttendanceNumber(direction) => {
            sorted.sort_by(|a, b| {
                directed(cmp_metric(a.attendance_percentage, b.attendance_percentage), direction)
            });
        }
    }

    sorted
}

/// Search and visibility options for a roster
#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    pub query: String,
    pub hide_dropouts: bool,
}

impl RosterFilter {
    fn matches(&self, learner: &Learner, query: &str) -> bool {
        if self.hide_dropouts && learner.is_dropout {
            return false;
        }
        query.is_empty()
            || contains_ignore_case(&learner.name, query)
            || contains_ignore_case(&learner.enrollment_id, query)
    }
}

/// Keep entries matching the search query (name or enrollment id)
pub fn filter_roster(entries: &[RosterEntry], filter: &RosterFilter) -> Vec<RosterEntry> {
    let query = filter.query.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| filter.matches(&e.learner, &query))
        .cloned()
        .collect()
}

/// State of the sort dialog: one criterion for one view.
/// Selecting a criterion replaces the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSelection {
    view: RosterView,
    criterion: SortCriterion,
}

impl SortSelection {
    pub fn new(view: RosterView) -> Self {
        Self {
            view,
            criterion: SortCriterion::default(),
        }
    }

    pub fn view(&self) -> RosterView {
        self.view
    }

    pub fn criterion(&self) -> SortCriterion {
        self.criterion
    }

    pub fn select(&mut self, criterion: SortCriterion) -> Result<(), RosterError> {
        if !self.view.offers(criterion) {
            return Err(RosterError::CriterionNotOffered {
                criterion,
                view: self.view,
            });
        }
        self.criterion = criterion;
        Ok(())
    }

    pub fn apply(&self, entries: &[RosterEntry]) -> Vec<RosterEntry> {
        sort_roster(entries, self.criterion)
    }
}

/// Derive a learner's roster metrics from their own attendance history.
///
/// The mark comes from `selected` (if recorded); percentage and classes
/// missed count only marked days up to and including `today`.
pub fn entry_from_attendance(
    learner: Learner,
    history: &AttendanceByDate,
    selected: NaiveDate,
    today: NaiveDate,
) -> RosterEntry {
    let mut entry = RosterEntry::new(learner);
    entry.attendance = history.get(&selected).and_then(|r| r.mark);

    let marked: Vec<AttendanceMark> = history
        .range(..=today)
        .filter_map(|(_, r)| r.mark)
        .collect();
    if !marked.is_empty() {
        let present = marked.iter().filter(|m| **m == AttendanceMark::Present).count();
        let absent = marked.len() - present;
        entry.attendance_percentage = Some(present as f64 * 100.0 / marked.len() as f64);
        entry.classes_missed = Some(absent as u32);
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceCategory, AttendanceRecord};

    fn entry(id: &str, name: &str) -> RosterEntry {
        RosterEntry::new(Learner::new(id, name))
    }

    fn ids(entries: &[RosterEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.learner.id.as_str()).collect()
    }

    fn names(entries: &[RosterEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.learner.name.as_str()).collect()
    }

    #[test]
    fn test_sort_by_name_case_insensitive() {
        let roster = vec![entry("1", "Bob"), entry("2", "alice"), entry("3", "Carol")];

        let asc = sort_roster(&roster, SortCriterion::Name(SortDirection::Ascending));
        assert_eq!(names(&asc), vec!["alice", "Bob", "Carol"]);

        let desc = sort_roster(&roster, SortCriterion::Name(SortDirection::Descending));
        assert_eq!(names(&desc), vec!["Carol", "Bob", "alice"]);
    }

    #[test]
    fn test_sort_by_attendance_number_is_stable() {
        let roster = vec![
            entry("1", "A").with_percentage(80.0),
            entry("2", "B").with_percentage(50.0),
            entry("3", "C").with_percentage(50.0),
        ];

        let low = sort_roster(&roster, SortCriterion::AttendanceNumber(SortDirection::Ascending));
        assert_eq!(ids(&low), vec!["2", "3", "1"]);

        let high = sort_roster(&roster, SortCriterion::AttendanceNumber(SortDirection::Descending));
        assert_eq!(ids(&high), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_missing_metrics_sort_lowest() {
        let roster = vec![
            entry("1", "A").with_classes_missed(2),
            entry("2", "B"),
            entry("3", "C").with_classes_missed(0),
        ];

        let low = sort_roster(&roster, SortCriterion::ClassesMissed(SortDirection::Ascending));
        assert_eq!(ids(&low), vec!["2", "3", "1"]);

        let high = sort_roster(&roster, SortCriterion::ClassesMissed(SortDirection::Descending));
        assert_eq!(ids(&high), vec!["1", "3", "2"]);
    }

    #[test]
    fn test_attendance_category_is_stable_partition() {
        let roster = vec![
            entry("1", "A").with_attendance(AttendanceMark::Absent),
            entry("2", "B").with_attendance(AttendanceMark::Present),
            entry("3", "C"),
            entry("4", "D").with_attendance(AttendanceMark::Present),
            entry("5", "E").with_attendance(AttendanceMark::Absent),
        ];

        let present = sort_roster(&roster, SortCriterion::Attendance(AttendanceCategory::PresentFirst));
        assert_eq!(ids(&present), vec!["2", "4", "1", "3", "5"]);

        let absent = sort_roster(&roster, SortCriterion::Attendance(AttendanceCategory::AbsentFirst));
        assert_eq!(ids(&absent), vec!["1", "5", "2", "3", "4"]);
    }

    #[test]
    fn test_empty_roster() {
        for criterion in SortCriterion::ALL {
            assert!(sort_roster(&[], criterion).is_empty());
        }
    }

    #[test]
    fn test_filter_roster() {
        let mut dropout = Learner::new("3", "Meera Patil");
        dropout.is_dropout = true;
        let mut enrolled = Learner::new("2", "Sunil Rao");
        enrolled.enrollment_id = "ENR-77".to_string();
        let roster = vec![
            entry("1", "Rahul Kumar"),
            RosterEntry::new(enrolled),
            RosterEntry::new(dropout),
        ];

        let all = filter_roster(&roster, &RosterFilter::default());
        assert_eq!(all.len(), 3);

        let by_name = filter_roster(&roster, &RosterFilter { query: "KUMAR".into(), hide_dropouts: false });
        assert_eq!(ids(&by_name), vec!["1"]);

        let by_enrollment = filter_roster(&roster, &RosterFilter { query: "enr-7".into(), hide_dropouts: false });
        assert_eq!(ids(&by_enrollment), vec!["2"]);

        let active = filter_roster(&roster, &RosterFilter { query: String::new(), hide_dropouts: true });
        assert_eq!(ids(&active), vec!["1", "2"]);
    }

    #[test]
    fn test_sort_selection_replaces_criterion() {
        let mut selection = SortSelection::new(RosterView::AttendanceOverview);
        assert_eq!(selection.criterion(), SortCriterion::Name(SortDirection::Ascending));

        selection
            .select(SortCriterion::ClassesMissed(SortDirection::Descending))
            .unwrap();
        selection
            .select(SortCriterion::AttendanceNumber(SortDirection::Ascending))
            .unwrap();
        assert_eq!(selection.criterion(), SortCriterion::AttendanceNumber(SortDirection::Ascending));

        let err = selection
            .select(SortCriterion::Attendance(AttendanceCategory::PresentFirst))
            .unwrap_err();
        assert!(matches!(err, RosterError::CriterionNotOffered { .. }));
        assert_eq!(selection.criterion(), SortCriterion::AttendanceNumber(SortDirection::Ascending));
    }

    #[test]
    fn test_entry_from_attendance() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut history = AttendanceByDate::new();
        for (day, mark) in [
            (6, AttendanceMark::Present),
            (7, AttendanceMark::Absent),
            (8, AttendanceMark::Present),
            (9, AttendanceMark::Present),
            (11, AttendanceMark::Absent),
        ] {
            let date = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
            history.insert(date, AttendanceRecord::for_learner(date, mark));
        }

        let selected = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let e = entry_from_attendance(Learner::new("1", "A"), &history, selected, today);
        assert_eq!(e.attendance, Some(AttendanceMark::Absent));
        assert_eq!(e.attendance_percentage, Some(75.0));
        assert_eq!(e.classes_missed, Some(1));

        let blank = entry_from_attendance(Learner::new("2", "B"), &AttendanceByDate::new(), selected, today);
        assert_eq!(blank.attendance, None);
        assert_eq!(blank.attendance_percentage, None);
        assert_eq!(blank.classes_missed, None);
    }
}
