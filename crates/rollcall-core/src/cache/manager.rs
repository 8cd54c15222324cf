use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{AttendanceByDate, Cohort, Learner};

/// Consider cache stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// Snapshot contents, or the default when absent or unreadable
fn data_or_default<T: Default>(name: &str, loaded: Result<Option<CachedData<T>>>) -> T {
    match loaded {
        Ok(Some(cached)) => {
            debug!(cache = name, age = %cached.age_display(), "Using cached data");
            cached.data
        }
        Ok(None) => T::default(),
        Err(e) => {
            warn!(cache = name, error = %e, "Failed to read cache");
            T::default()
        }
    }
}

fn log_save_error(name: &str, saved: Result<()>) {
    if let Err(e) = saved {
        warn!(cache = name, error = %e, "Failed to write cache");
    }
}

/// JSON snapshot store for offline roster and attendance views
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    /// Cache file for `name`. Ids from the service are sanitized so they
    /// cannot escape the cache directory.
    fn cache_path(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", safe))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let path = self.cache_path(name);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        debug!(cache = name, "Cache saved");
        Ok(())
    }

    // ===== Cohorts =====

    pub fn load_cohorts(&self) -> Result<Option<CachedData<Vec<Cohort>>>> {
        self.load("cohorts")
    }

    pub fn save_cohorts(&self, cohorts: &[Cohort]) -> Result<()> {
        self.save("cohorts", &cohorts)
    }

    // ===== Members =====

    pub fn load_members(&self, cohort_id: &str) -> Result<Option<CachedData<Vec<Learner>>>> {
        self.load(&format!("members_{}", cohort_id))
    }

    pub fn save_members(&self, cohort_id: &str, members: &[Learner]) -> Result<()> {
        self.save(&format!("members_{}", cohort_id), &members)
    }

    /// Cached roster of a cohort, empty when never fetched
    pub fn members(&self, cohort_id: &str) -> Vec<Learner> {
        data_or_default("members", self.load_members(cohort_id))
    }

    // ===== Cohort Attendance =====

    pub fn load_attendance(&self, cohort_id: &str) -> Result<Option<CachedData<AttendanceByDate>>> {
        self.load(&format!("attendance_{}", cohort_id))
    }

    pub fn save_attendance(&self, cohort_id: &str, attendance: &AttendanceByDate) -> Result<()> {
        self.save(&format!("attendance_{}", cohort_id), attendance)
    }

    // ===== Overall Attendance =====

    pub fn load_overall_attendance(&self) -> Result<Option<CachedData<HashMap<String, String>>>> {
        self.load("overall_attendance")
    }

    pub fn save_overall_attendance(&self, percentages: &HashMap<String, String>) -> Result<()> {
        self.save("overall_attendance", percentages)
    }

    // ===== Learner Histories =====

    pub fn load_learner_histories(
        &self,
        cohort_id: &str,
    ) -> Result<Option<CachedData<HashMap<String, AttendanceByDate>>>> {
        self.load(&format!("learner_attendance_{}", cohort_id))
    }

    pub fn save_learner_histories(
        &self,
        cohort_id: &str,
        histories: &HashMap<String, AttendanceByDate>,
    ) -> Result<()> {
        self.save(&format!("learner_attendance_{}", cohort_id), histories)
    }

    /// Cached learner histories of a cohort keyed by learner id
    pub fn learner_histories(&self, cohort_id: &str) -> HashMap<String, AttendanceByDate> {
        data_or_default("learner histories", self.load_learner_histories(cohort_id))
    }

    // ===== Fetch Fallbacks =====
    //
    // A failed fetch never overwrites a snapshot.

    /// Store fetched members, or serve the cached roster if the fetch failed
    pub fn members_or_cached(&self, cohort_id: &str, fetched: Result<Vec<Learner>>) -> Vec<Learner> {
        match fetched {
            Ok(members) => {
                log_save_error("members", self.save_members(cohort_id, &members));
                members
            }
            Err(e) => {
                warn!(cohort = cohort_id, error = %e, "Member fetch failed, using cache");
                data_or_default("members", self.load_members(cohort_id))
            }
        }
    }

    /// Store fetched cohort attendance, or serve the cached mapping if the fetch failed
    pub fn attendance_or_cached(&self, cohort_id: &str, fetched: Result<AttendanceByDate>) -> AttendanceByDate {
        match fetched {
            Ok(attendance) => {
                log_save_error("attendance", self.save_attendance(cohort_id, &attendance));
                attendance
            }
            Err(e) => {
                warn!(cohort = cohort_id, error = %e, "Attendance fetch failed, using cache");
                data_or_default("attendance", self.load_attendance(cohort_id))
            }
        }
    }

    /// Store merged overall percentages. An empty merge means every cohort
    /// failed, so the cached percentages are served instead.
    pub fn overall_attendance_or_cached(&self, merged: HashMap<String, String>) -> HashMap<String, String> {
        if merged.is_empty() {
            return data_or_default("overall attendance", self.load_overall_attendance());
        }
        log_save_error("overall attendance", self.save_overall_attendance(&merged));
        merged
    }

    /// Merge per-learner fetch results over the cached histories. A failed
    /// learner keeps its cached history. The snapshot is rewritten only when
    /// at least one fetch succeeded.
    pub fn learner_histories_or_cached(
        &self,
        cohort_id: &str,
        fetched: Vec<(String, Result<AttendanceByDate>)>,
    ) -> HashMap<String, AttendanceByDate> {
        let mut histories = self.learner_histories(cohort_id);
        let mut refreshed = false;
        for (user_id, result) in fetched {
            match result {
                Ok(history) => {
                    histories.insert(user_id, history);
                    refreshed = true;
                }
                Err(e) => {
                    warn!(cohort = cohort_id, user = %user_id, error = %e, "Learner attendance fetch failed, using cache");
                }
            }
        }
        if refreshed {
            log_save_error("learner histories", self.save_learner_histories(cohort_id, &histories));
        }
        histories
    }

    /// Age text of a cohort's member snapshot, "never" when absent or unreadable
    pub fn members_age(&self, cohort_id: &str) -> String {
        match self.load_members(cohort_id) {
            Ok(Some(cached)) => cached.age_display(),
            Ok(None) => "never".to_string(),
            Err(e) => {
                debug!(cohort = cohort_id, error = %e, "Failed to load cache for age display");
                "never".to_string()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
