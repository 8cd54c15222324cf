use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::attendance::AttendanceMark;
use crate::utils::{capitalize_each_word, to_pascal_case};

/// Custom field label holding a learner's enrollment number
const ENROLLMENT_FIELD_LABEL: &str = "Enrollment Number";

/// Member status marking a learner who left the cohort
const DROPOUT_STATUS: &str = "dropout";

// API Response wrappers
#[derive(Debug, Clone, Deserialize)]
pub struct CohortMemberListResponse {
    #[serde(default)]
    pub result: Option<CohortMemberResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohortMemberResult {
    #[serde(default)]
    pub results: Option<CohortMemberResults>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohortMemberResults {
    #[serde(rename = "userDetails", default)]
    pub user_details: Vec<UserDetail>,
}

impl CohortMemberListResponse {
    pub fn into_learners(self) -> Vec<Learner> {
        self.result
            .and_then(|r| r.results)
            .map(|r| r.user_details.iter().map(UserDetail::to_learner).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "memberStatus", default)]
    pub member_status: Option<String>,
    #[serde(rename = "cohortMembershipId", default)]
    pub cohort_membership_id: Option<String>,
    #[serde(rename = "customField", default)]
    pub custom_field: Vec<CustomField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl UserDetail {
    fn field_value(&self, label: &str) -> Option<&str> {
        self.custom_field
            .iter()
            .find(|f| f.label == label)
            .and_then(|f| f.value.as_deref())
    }

    /// Convert to the immutable roster snapshot
    pub fn to_learner(&self) -> Learner {
        Learner {
            id: self.user_id.clone(),
            name: to_pascal_case(&self.name),
            enrollment_id: capitalize_each_word(self.field_value(ENROLLMENT_FIELD_LABEL).unwrap_or("")),
            is_dropout: self.member_status.as_deref() == Some(DROPOUT_STATUS),
            member_status: self.member_status.clone(),
            cohort_membership_id: self.cohort_membership_id.clone(),
        }
    }
}

/// A cohort member as shown in roster views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Learner {
    pub id: String,
    pub name: String,
    #[serde(rename = "enrollmentId")]
    pub enrollment_id: String,
    #[serde(rename = "isDropout")]
    pub is_dropout: bool,
    #[serde(rename = "memberStatus", default)]
    pub member_status: Option<String>,
    #[serde(rename = "cohortMembershipId", default)]
    pub cohort_membership_id: Option<String>,
}

impl Learner {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enrollment_id: String::new(),
            is_dropout: false,
            member_status: None,
            cohort_membership_id: None,
        }
    }

    pub fn enrollment_display(&self) -> &str {
        if self.enrollment_id.is_empty() {
            "-"
        } else {
            &self.enrollment_id
        }
    }
}

/// A learner together with the metrics a roster can be sorted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RosterEntry {
    pub learner: Learner,
    /// Mark for the currently selected date
    #[serde(default)]
    pub attendance: Option<AttendanceMark>,
    #[serde(rename = "attendancePercentage", default)]
    pub attendance_percentage: Option<f64>,
    #[serde(rename = "classesMissed", default)]
    pub classes_missed: Option<u32>,
}

impl RosterEntry {
    pub fn new(learner: Learner) -> Self {
        Self {
            learner,
            attendance: None,
            attendance_percentage: None,
            classes_missed: None,
        }
    }

    pub fn with_attendance(mut self, mark: AttendanceMark) -> Self {
        self.attendance = Some(mark);
        self
    }

    pub fn with_percentage(mut self, pct: f64) -> Self {
        self.attendance_percentage = Some(pct);
        self
    }

    pub fn with_classes_missed(mut self, missed: u32) -> Self {
        self.classes_missed = Some(missed);
        self
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    /// A to Z, or low to high
    Ascending,
    /// Z to A, or high to low
    Descending,
}

/// Which group comes first in the present/absent partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub enum AttendanceCategory {
    PresentFirst,
    AbsentFirst,
}

impl AttendanceCategory {
    pub fn leading_mark(&self) -> AttendanceMark {
        match self {
            AttendanceCategory::PresentFirst => AttendanceMark::Present,
            AttendanceCategory::AbsentFirst => AttendanceMark::Absent,
        }
    }
}

/// The single active ordering rule of a roster view.
/// Holding one value makes two simultaneous criteria unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "by", content = "order", rename_all = "camelCase")]
pub enum SortCriterion {
    Name(SortDirection),
    Attendance(AttendanceCategory),
    ClassesMissed(SortDirection),
    AttendanceNumber(SortDirection),
}

impl Default for SortCriterion {
    fn default() -> Self {
        SortCriterion::Name(SortDirection::Ascending)
    }
}

impl SortCriterion {
    /// Every criterion, in the order the sort dialog lists them
    pub const ALL: [SortCriterion; 8] = [
        SortCriterion::AttendanceNumber(SortDirection::Descending),
        SortCriterion::AttendanceNumber(SortDirection::Ascending),
        SortCriterion::ClassesMissed(SortDirection::Descending),
        SortCriterion::ClassesMissed(SortDirection::Ascending),
        SortCriterion::Attendance(AttendanceCategory::PresentFirst),
        SortCriterion::Attendance(AttendanceCategory::AbsentFirst),
        SortCriterion::Name(SortDirection::Ascending),
        SortCriterion::Name(SortDirection::Descending),
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SortCriterion::Name(SortDirection::Ascending) => "name-asc",
            SortCriterion::Name(SortDirection::Descending) => "name-desc",
            SortCriterion::Attendance(AttendanceCategory::PresentFirst) => "attendance-present",
            SortCriterion::Attendance(AttendanceCategory::AbsentFirst) => "attendance-absent",
            SortCriterion::ClassesMissed(SortDirection::Descending) => "classes-missed-high",
            SortCriterion::ClassesMissed(SortDirection::Ascending) => "classes-missed-low",
            SortCriterion::AttendanceNumber(SortDirection::Descending) => "attendance-number-high",
            SortCriterion::AttendanceNumber(SortDirection::Ascending) => "attendance-number-low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortCriterion::Name(SortDirection::Ascending) => "Names: A to Z",
            SortCriterion::Name(SortDirection::Descending) => "Names: Z to A",
            SortCriterion::Attendance(AttendanceCategory::PresentFirst) => "Attendance: Present",
            SortCriterion::Attendance(AttendanceCategory::AbsentFirst) => "Attendance: Absent",
            SortCriterion::ClassesMissed(SortDirection::Descending) => "Classes missed: High to low",
            SortCriterion::ClassesMissed(SortDirection::Ascending) => "Classes missed: Low to high",
            SortCriterion::AttendanceNumber(SortDirection::Descending) => "Attendance: High to low",
            SortCriterion::AttendanceNumber(SortDirection::Ascending) => "Attendance: Low to high",
        }
    }
}

impl std::fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SortCriterion {
    type Err = crate::roster::RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SortCriterion::ALL
            .iter()
            .copied()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| crate::roster::RosterError::UnknownCriterion(s.to_string()))
    }
}

/// Which roster screen the sort dialog belongs to.
/// The overview screen sorts on metrics; the class roster on the day's marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub enum RosterView {
    AttendanceOverview,
    ClassRoster,
}

impl RosterView {
    pub fn offers(&self, criterion: SortCriterion) -> bool {
        match criterion {
            SortCriterion::Name(_) => true,
            SortCriterion::Attendance(_) => *self == RosterView::ClassRoster,
            SortCriterion::ClassesMissed(_) | SortCriterion::AttendanceNumber(_) => {
                *self == RosterView::AttendanceOverview
            }
        }
    }

    pub fn criteria(&self) -> Vec<SortCriterion> {
        SortCriterion::ALL
            .iter()
            .copied()
            .filter(|c| self.offers(*c))
            .collect()
    }
}
