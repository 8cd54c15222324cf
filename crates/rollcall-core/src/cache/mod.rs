//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving
//! roster and attendance snapshots locally. Data is cached in JSON format
//! and considered stale after 60 minutes.
//!
//! Cached data types include:
//! - Cohorts
//! - Cohort members
//! - Per-date cohort attendance
//! - Overall attendance percentages

pub mod manager;

pub use manager::{CacheManager, CachedData};
