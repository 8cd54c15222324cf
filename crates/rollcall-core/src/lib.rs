//! Rollcall core library.
//!
//! Attendance status resolution, roster sorting and cross-cohort
//! aggregation for an education-management client, plus the API client,
//! snapshot cache and configuration shared by front ends.

pub mod aggregate;
pub mod api;
pub mod attendance;
pub mod cache;
pub mod config;
pub mod models;
pub mod roster;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use cache::CacheManager;
pub use config::Config;
