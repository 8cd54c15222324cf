//! Data models for attendance and roster entities.
//!
//! This module contains the data structures shared by the resolver,
//! the sort engine and the API client:
//!
//! - `AttendanceRecord`, `AttendanceMark`, `AttendanceStatus`: per-date attendance
//! - `Learner`, `RosterEntry`: cohort members and their sortable metrics
//! - `SortCriterion`, `RosterView`: the single active roster ordering
//! - `Cohort`, `CohortType`: class/centre grouping

pub mod attendance;
pub mod cohort;
pub mod learner;

pub use attendance::{
    learner_attendance_by_date, AttendanceByDate, AttendanceEntry, AttendanceFacets,
    AttendanceListResponse, AttendanceMark, AttendanceRecord, AttendanceStatus, FacetCounts,
};
pub use cohort::{Cohort, CohortListResponse, CohortType};
pub use learner::{
    AttendanceCategory, CohortMemberListResponse, Learner, RosterEntry, RosterView,
    SortCriterion, SortDirection, UserDetail,
};
