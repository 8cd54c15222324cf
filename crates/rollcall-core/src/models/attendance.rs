use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Attendance records keyed by calendar date.
/// Serializes with ISO `YYYY-MM-DD` keys, the same shape the services return.
pub type AttendanceByDate = BTreeMap<NaiveDate, AttendanceRecord>;

/// Categorical flag carried by a learner's own attendance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AttendanceMark {
    Present,
    Absent,
}

impl AttendanceMark {
    /// Parse the service's attendance string ("present", "Absent", ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "present" => Some(AttendanceMark::Present),
            "absent" => Some(AttendanceMark::Absent),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceMark::Present => write!(f, "Present"),
            AttendanceMark::Absent => write!(f, "Absent"),
        }
    }
}

/// Resolved attendance state of a single date. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    NotMarked,
    FutureDate,
}

impl AttendanceStatus {
    pub fn is_marked(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Absent)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::NotMarked => "Not marked",
            AttendanceStatus::FutureDate => "Future date, can't mark",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-date attendance summary for a cohort or a single learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceRecord {
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub date: NaiveDate,
    #[serde(rename = "presentPercentage")]
    pub present_percentage: f64,
    #[serde(rename = "presentCount")]
    pub present_count: u32,
    #[serde(rename = "totalCount")]
    pub total_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<AttendanceMark>,
}

impl AttendanceRecord {
    /// Build a summary record. Keeps `present_count <= total_count` and the
    /// percentage inside [0, 100].
    pub fn new(date: NaiveDate, present_percentage: f64, present_count: u32, total_count: u32) -> Self {
        let present_percentage = if present_percentage.is_finite() {
            present_percentage.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            date,
            present_percentage,
            present_count: present_count.min(total_count),
            total_count,
            mark: None,
        }
    }

    /// Build a summary record from counts alone
    pub fn from_counts(date: NaiveDate, present_count: u32, total_count: u32) -> Self {
        let pct = if total_count == 0 {
            0.0
        } else {
            f64::from(present_count.min(total_count)) * 100.0 / f64::from(total_count)
        };
        Self::new(date, pct, present_count, total_count)
    }

    /// Build a single learner's record for one day
    pub fn for_learner(date: NaiveDate, mark: AttendanceMark) -> Self {
        let present = u32::from(mark == AttendanceMark::Present);
        let mut record = Self::from_counts(date, present, 1);
        record.mark = Some(mark);
        record
    }
}

// ============================================================================
// API response wrappers
// ============================================================================

/// Envelope returned by the attendance list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceListResponse {
    #[serde(rename = "statusCode", alias = "responseCode", default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<AttendanceListData>,
}

impl AttendanceListResponse {
    /// A missing status code is treated as success; the facet body decides.
    pub fn is_ok(&self) -> bool {
        self.status_code.map(|c| c == 200).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceListData {
    #[serde(default)]
    pub result: Option<AttendanceFacets>,
    #[serde(rename = "attendanceList", default)]
    pub attendance_list: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceFacets {
    #[serde(rename = "attendanceDate", default)]
    pub attendance_date: HashMap<String, FacetCounts>,
    #[serde(rename = "contextId", default)]
    pub context_id: HashMap<String, FacetCounts>,
}

/// Counts for one facet bucket. Percentages arrive as strings or numbers
/// depending on the facet, so they are kept raw.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacetCounts {
    #[serde(default)]
    pub present_percentage: Option<serde_json::Value>,
    #[serde(default)]
    pub absent_percentage: Option<serde_json::Value>,
    #[serde(default)]
    pub present: Option<u32>,
    #[serde(default)]
    pub absent: Option<u32>,
    #[serde(default)]
    pub present_students: Option<u32>,
    #[serde(default)]
    pub total_students: Option<u32>,
    #[serde(default)]
    pub totalcount: Option<u32>,
}

impl FacetCounts {
    /// Present percentage as text, "0" when absent
    pub fn present_percentage_text(&self) -> String {
        match &self.present_percentage {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "0".to_string(),
        }
    }

    pub fn present_percentage_value(&self) -> Option<f64> {
        match &self.present_percentage {
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    fn present_count(&self) -> u32 {
        self.present_students.or(self.present).unwrap_or(0)
    }

    fn total_count(&self) -> u32 {
        self.total_students
            .or(self.totalcount)
            .unwrap_or_else(|| self.present.unwrap_or(0) + self.absent.unwrap_or(0))
    }

    pub fn to_record(&self, date: NaiveDate) -> AttendanceRecord {
        let present = self.present_count();
        let total = self.total_count();
        match self.present_percentage_value() {
            Some(pct) => AttendanceRecord::new(date, pct, present, total),
            None => AttendanceRecord::from_counts(date, present, total),
        }
    }
}

impl AttendanceFacets {
    /// Convert the per-date facet into records, skipping keys that are not dates
    pub fn to_attendance_by_date(&self) -> AttendanceByDate {
        let mut map = AttendanceByDate::new();
        for (key, counts) in &self.attendance_date {
            match parse_date_key(key) {
                Some(date) => {
                    map.insert(date, counts.to_record(date));
                }
                None => debug!(key = %key, "Skipping attendance facet with invalid date"),
            }
        }
        map
    }

    /// Present percentage text per cohort id
    pub fn percentages_by_context(&self) -> HashMap<String, String> {
        self.context_id
            .iter()
            .map(|(id, counts)| (id.clone(), counts.present_percentage_text()))
            .collect()
    }
}

/// One marked attendance row for a learner
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceEntry {
    #[serde(rename = "attendanceDate")]
    pub attendance_date: String,
    pub attendance: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// Collect a learner's attendance rows into per-date records.
/// Rows with unknown dates or marks are dropped.
pub fn learner_attendance_by_date(entries: &[AttendanceEntry]) -> AttendanceByDate {
    let mut map = AttendanceByDate::new();
    for entry in entries {
        let date = parse_date_key(&entry.attendance_date);
        let mark = AttendanceMark::parse(&entry.attendance);
        match (date, mark) {
            (Some(date), Some(mark)) => {
                map.insert(date, AttendanceRecord::for_learner(date, mark));
            }
            _ => debug!(
                date = %entry.attendance_date,
                attendance = %entry.attendance,
                "Skipping unrecognized attendance entry"
            ),
        }
    }
    map
}

/// Accept both `2024-05-03` and full timestamps like `2024-05-03T00:00:00Z`
fn parse_date_key(key: &str) -> Option<NaiveDate> {
    let head = key.get(..10).unwrap_or(key);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_record_clamps_counts_and_percentage() {
        let record = AttendanceRecord::new(day(1), 140.0, 12, 10);
        assert_eq!(record.present_percentage, 100.0);
        assert_eq!(record.present_count, 10);

        let record = AttendanceRecord::new(day(1), f64::NAN, 0, 0);
        assert_eq!(record.present_percentage, 0.0);
    }

    #[test]
    fn test_record_from_counts() {
        let record = AttendanceRecord::from_counts(day(2), 3, 4);
        assert_eq!(record.present_percentage, 75.0);
        assert_eq!(AttendanceRecord::from_counts(day(2), 0, 0).present_percentage, 0.0);
    }

    #[test]
    fn test_mark_parse() {
        assert_eq!(AttendanceMark::parse("present"), Some(AttendanceMark::Present));
        assert_eq!(AttendanceMark::parse(" Absent "), Some(AttendanceMark::Absent));
        assert_eq!(AttendanceMark::parse("halfday"), None);
    }

    #[test]
    fn test_parse_date_facet_response() {
        let json = r#"{"statusCode":200,"message":"Ok","data":{"result":{"attendanceDate":{
            "2024-05-01":{"present_percentage":"80.00","present_students":8,"total_students":10},
            "2024-05-02":{"present":3,"absent":1},
            "not-a-date":{"present":1}
        }}}}"#;
        let resp: AttendanceListResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_ok());

        let map = resp.data.unwrap().result.unwrap().to_attendance_by_date();
        assert_eq!(map.len(), 2);

        let first = &map[&day(1)];
        assert_eq!(first.present_percentage, 80.0);
        assert_eq!(first.present_count, 8);
        assert_eq!(first.total_count, 10);

        let second = &map[&day(2)];
        assert_eq!(second.present_percentage, 75.0);
        assert_eq!(second.total_count, 4);
    }

    #[test]
    fn test_parse_context_facet_percentages() {
        let json = r#"{"statusCode":200,"data":{"result":{"contextId":{
            "c1":{"present_percentage":"80"},
            "c2":{"present_percentage":61.5},
            "c3":{}
        }}}}"#;
        let resp: AttendanceListResponse = serde_json::from_str(json).unwrap();
        let pct = resp.data.unwrap().result.unwrap().percentages_by_context();
        assert_eq!(pct["c1"], "80");
        assert_eq!(pct["c2"], "61.5");
        assert_eq!(pct["c3"], "0");
    }

    #[test]
    fn test_learner_attendance_by_date() {
        let json = r#"[
            {"attendanceDate":"2024-05-01","attendance":"present","userId":"u1"},
            {"attendanceDate":"2024-05-02T00:00:00.000Z","attendance":"absent"},
            {"attendanceDate":"2024-05-03","attendance":"late"}
        ]"#;
        let entries: Vec<AttendanceEntry> = serde_json::from_str(json).unwrap();
        let map = learner_attendance_by_date(&entries);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&day(1)].mark, Some(AttendanceMark::Present));
        assert_eq!(map[&day(2)].mark, Some(AttendanceMark::Absent));
        assert_eq!(map[&day(2)].present_percentage, 0.0);
    }

    #[test]
    fn test_attendance_map_serializes_with_iso_keys() {
        let mut map = AttendanceByDate::new();
        map.insert(day(3), AttendanceRecord::from_counts(day(3), 1, 2));
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.starts_with(r#"{"2024-05-03":"#));
        let back: AttendanceByDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
