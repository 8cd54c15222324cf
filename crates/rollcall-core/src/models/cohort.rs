use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Centre type of a cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum CohortType {
    #[serde(alias = "regular", alias = "Regular")]
    Regular,
    #[serde(alias = "remote", alias = "Remote")]
    Remote,
}

impl std::fmt::Display for CohortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CohortType::Regular => write!(f, "Regular"),
            CohortType::Remote => write!(f, "Remote"),
        }
    }
}

impl FromStr for CohortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Ok(CohortType::Regular),
            "remote" => Ok(CohortType::Remote),
            other => Err(format!("unknown center type: {}", other)),
        }
    }
}

/// A named group of learners (class or centre)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Cohort {
    #[serde(rename = "cohortId")]
    pub id: String,
    #[serde(rename = "cohortType", alias = "type")]
    pub cohort_type: CohortType,
    pub name: String,
}

impl Cohort {
    pub fn new(id: impl Into<String>, cohort_type: CohortType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cohort_type,
            name: name.into(),
        }
    }
}

// Response from the my-cohorts endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CohortListResponse {
    #[serde(default)]
    pub result: Vec<Cohort>,
}
