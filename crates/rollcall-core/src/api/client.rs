//! API client for the cohort and attendance services.
//!
//! This module provides the `ApiClient` struct for fetching cohort lists,
//! member rosters and attendance summaries.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    learner_attendance_by_date, AttendanceByDate, AttendanceListResponse, Cohort,
    CohortListResponse, CohortMemberListResponse, Learner,
};
use crate::utils::short_date;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum concurrent per-cohort attendance requests.
const MAX_CONCURRENT_REQUESTS: usize = 10;

/// Attendance scope for learner attendance (as opposed to facilitator self-attendance)
const STUDENT_SCOPE: &str = "student";

/// Header carrying the tenant id
const TENANT_HEADER: &str = "tenantid";

/// API client for the cohort and attendance services.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    tenant_id: Option<String>,
}

impl ApiClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            tenant_id: None,
        })
    }

    /// Create a client from configuration (base URL, token, tenant)
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut api = Self::new(&config.api_base_url)?;
        api.token = config.token.clone();
        api.tenant_id = config.tenant_id.clone();
        Ok(api)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        if let Some(ref tenant) = self.tenant_id {
            headers.insert(TENANT_HEADER, header::HeaderValue::from_str(tenant)?);
        }
        Ok(headers)
    }

    /// Check if response is successful.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    /// `build` is called once per attempt since a sent request is consumed.
    async fn send_json<T, F>(&self, url: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()?
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send_json(url, || Ok(self.client.get(url).headers(self.auth_headers()?)))
            .await
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, body: &serde_json::Value) -> Result<T> {
        self.send_json(url, || {
            Ok(self.client.post(url).headers(self.auth_headers()?).json(body))
        })
        .await
    }

    // ===== Data Fetching Methods =====

    /// Fetch the cohorts assigned to a user
    pub async fn fetch_cohorts(&self, user_id: &str) -> Result<Vec<Cohort>> {
        let url = self.url(&format!("cohort/mycohorts/{}", user_id));
        let response: CohortListResponse = self.get(&url).await?;
        debug!(count = response.result.len(), "Cohorts fetched");
        Ok(response.result)
    }

    /// Fetch one page of a cohort's members
    pub async fn fetch_cohort_members(&self, cohort_id: &str, page: u32, limit: u32) -> Result<Vec<Learner>> {
        let url = self.url("cohortmember/list");
        let body = member_list_body(cohort_id, page, limit);
        let response: CohortMemberListResponse = self
            .post(&url, &body)
            .await
            .context("Failed to fetch cohort members")?;
        let learners = response.into_learners();
        debug!(cohort = cohort_id, count = learners.len(), "Cohort members fetched");
        Ok(learners)
    }

    /// Fetch per-date attendance summaries for a cohort in `[from, to]`
    pub async fn fetch_attendance_by_cohort(
        &self,
        cohort_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AttendanceByDate> {
        let url = self.url("attendance/list");
        let body = cohort_attendance_body(cohort_id, from, to);
        let response: AttendanceListResponse = self
            .post(&url, &body)
            .await
            .context("Failed to fetch cohort attendance")?;
        Ok(response
            .data
            .and_then(|d| d.result)
            .map(|r| r.to_attendance_by_date())
            .unwrap_or_default())
    }

    /// Fetch a single learner's marks in `[from, to]`
    pub async fn fetch_learner_attendance(
        &self,
        cohort_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AttendanceByDate> {
        let url = self.url("attendance/list");
        let body = learner_attendance_body(cohort_id, user_id, from, to);
        let response: AttendanceListResponse = self
            .post(&url, &body)
            .await
            .context("Failed to fetch learner attendance")?;
        Ok(response
            .data
            .map(|d| learner_attendance_by_date(&d.attendance_list))
            .unwrap_or_default())
    }

    /// Fetch the overall present percentage of one cohort, keyed by cohort id
    pub async fn fetch_cohort_percentage(&self, cohort_id: &str) -> Result<HashMap<String, String>> {
        let url = self.url("attendance/list");
        let body = overall_attendance_body(cohort_id);
        let response: AttendanceListResponse = self.post(&url, &body).await?;
        if !response.is_ok() {
            return Err(ApiError::InvalidResponse(format!(
                "status {:?}: {}",
                response.status_code,
                response.message.unwrap_or_default()
            ))
            .into());
        }
        Ok(response
            .data
            .and_then(|d| d.result)
            .map(|r| r.percentages_by_context())
            .unwrap_or_default())
    }

    /// Fetch overall percentages for many cohorts concurrently.
    /// A failed cohort is logged and left out; the rest are still merged.
    pub async fn fetch_overall_attendance(&self, cohort_ids: &[String]) -> HashMap<String, String> {
        let results: Vec<(String, Result<HashMap<String, String>>)> = stream::iter(cohort_ids.iter().cloned())
            .map(|id| {
                let api = self.clone();
                async move {
                    let result = api.fetch_cohort_percentage(&id).await;
                    (id, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await;

        let mut merged = HashMap::new();
        for (id, result) in results {
            match result {
                Ok(map) => merged.extend(map),
                Err(e) => warn!(cohort = %id, error = %e, "Cohort attendance fetch failed"),
            }
        }
        merged
    }

    // ===== Failure-tolerant wrappers =====

    /// Members of a cohort, or an empty roster if the fetch fails
    pub async fn members_or_empty(&self, cohort_id: &str, page: u32, limit: u32) -> Vec<Learner> {
        self.fetch_cohort_members(cohort_id, page, limit)
            .await
            .unwrap_or_else(|e| {
                warn!(cohort = cohort_id, error = %e, "Member fetch failed, showing no data");
                Vec::new()
            })
    }

    /// Cohort attendance, or an empty mapping if the fetch fails
    pub async fn attendance_or_empty(&self, cohort_id: &str, from: NaiveDate, to: NaiveDate) -> AttendanceByDate {
        self.fetch_attendance_by_cohort(cohort_id, from, to)
            .await
            .unwrap_or_else(|e| {
                warn!(cohort = cohort_id, error = %e, "Attendance fetch failed, showing no data");
                AttendanceByDate::new()
            })
    }

    /// Learner attendance, or an empty mapping if the fetch fails
    pub async fn learner_attendance_or_empty(
        &self,
        cohort_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AttendanceByDate {
        self.fetch_learner_attendance(cohort_id, user_id, from, to)
            .await
            .unwrap_or_else(|e| {
                warn!(cohort = cohort_id, user = user_id, error = %e, "Learner attendance fetch failed");
                AttendanceByDate::new()
            })
    }
}

// ============================================================================
// Request bodies
// ============================================================================

fn member_list_body(cohort_id: &str, page: u32, limit: u32) -> serde_json::Value {
    json!({
        "limit": limit,
        "page": page,
        "filters": { "cohortId": cohort_id },
    })
}

fn cohort_attendance_body(cohort_id: &str, from: NaiveDate, to: NaiveDate) -> serde_json::Value {
    json!({
        "limit": 0,
        "page": 0,
        "filters": {
            "contextId": cohort_id,
            "fromDate": short_date(from),
            "toDate": short_date(to),
            "scope": STUDENT_SCOPE,
        },
        "facets": ["attendanceDate"],
    })
}

fn learner_attendance_body(cohort_id: &str, user_id: &str, from: NaiveDate, to: NaiveDate) -> serde_json::Value {
    json!({
        "limit": 0,
        "page": 0,
        "filters": {
            "contextId": cohort_id,
            "userId": user_id,
            "fromDate": short_date(from),
            "toDate": short_date(to),
            "scope": STUDENT_SCOPE,
        },
    })
}

fn overall_attendance_body(cohort_id: &str) -> serde_json::Value {
    json!({
        "limit": 0,
        "page": 0,
        "filters": { "contextId": cohort_id, "scope": STUDENT_SCOPE },
        "facets": ["contextId"],
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = ApiClient::new("https://example.org/api/v1/").unwrap();
        assert_eq!(api.url("attendance/list"), "https://example.org/api/v1/attendance/list");
        assert_eq!(api.url("/cohort/mycohorts/u1"), "https://example.org/api/v1/cohort/mycohorts/u1");
    }

    #[test]
    fn test_auth_headers() {
        let mut config = Config::default();
        config.tenant_id = Some("tenant-1".to_string());
        let api = ApiClient::from_config(&config).unwrap();

        let headers = api.auth_headers().unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert_eq!(headers.get(TENANT_HEADER).unwrap(), "tenant-1");

        config.token = Some("abc".to_string());
        let authed = ApiClient::from_config(&config).unwrap();
        let headers = authed.auth_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.get(TENANT_HEADER).unwrap(), "tenant-1");
    }

    #[test]
    fn test_request_bodies() {
        let body = member_list_body("c1", 0, 300);
        assert_eq!(body["filters"]["cohortId"], "c1");
        assert_eq!(body["limit"], 300);

        let body = cohort_attendance_body("c1", date(1), date(31));
        assert_eq!(body["filters"]["fromDate"], "2024-05-01");
        assert_eq!(body["filters"]["toDate"], "2024-05-31");
        assert_eq!(body["facets"][0], "attendanceDate");

        let body = learner_attendance_body("c1", "u9", date(1), date(2));
        assert_eq!(body["filters"]["userId"], "u9");
        assert!(body.get("facets").is_none());

        let body = overall_attendance_body("c7");
        assert_eq!(body["filters"]["contextId"], "c7");
        assert_eq!(body["facets"][0], "contextId");
    }

    /// Nothing listens on the discard port, so every request fails to connect
    fn unreachable_client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9/api/v1").unwrap()
    }

    #[tokio::test]
    async fn test_failed_fetches_become_empty_data() {
        let api = unreachable_client();

        assert!(api.fetch_cohort_members("c1", 0, 300).await.is_err());
        assert!(api.members_or_empty("c1", 0, 300).await.is_empty());
        assert!(api.attendance_or_empty("c1", date(1), date(7)).await.is_empty());
        assert!(api
            .learner_attendance_or_empty("c1", "u1", date(1), date(7))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_overall_attendance_tolerates_failures() {
        let api = unreachable_client();
        let ids = vec!["c1".to_string(), "c2".to_string()];

        assert!(api.fetch_cohort_percentage("c1").await.is_err());
        assert!(api.fetch_overall_attendance(&ids).await.is_empty());
        assert!(api.fetch_overall_attendance(&[]).await.is_empty());
    }

    #[test]
    fn test_failed_envelope_is_not_ok() {
        let resp: AttendanceListResponse =
            serde_json::from_str(r#"{"statusCode":500,"message":"boom"}"#).unwrap();
        assert!(!resp.is_ok());
        let resp: AttendanceListResponse = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(resp.is_ok());
    }
}
