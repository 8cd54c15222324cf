//! REST API client module for the cohort and attendance services.
//!
//! This module provides the `ApiClient` for fetching cohort lists,
//! member rosters and attendance summaries. Requests carry an optional
//! bearer token and tenant header taken from the configuration.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
