//! HTTP client for the quiz backend.
//!
//! Fetches health and per-source metrics, and carries the shared reqwest
//! client used by the admin commands.

use std::collections::HashMap;
use std::time::Duration;

use quizmon_core::{HealthSnapshot, SourceCounters};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by the backend on rejected requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the backend REST API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "http://localhost:3001")
    /// * `timeout` - per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` with `segment` appended as one percent-encoded path segment.
    pub(crate) fn segment_url(&self, path: &str, segment: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ApiError::HttpClient(format!("Invalid backend URL: {e}")))?;
        let url_display = url.to_string();
        url.path_segments_mut()
            .map_err(|()| ApiError::HttpClient(format!("Backend URL cannot take a path: {url_display}")))?
            .push(segment);
        Ok(url)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Fetch `GET /health`.
    pub async fn fetch_health(&self) -> ApiResult<HealthSnapshot> {
        let response = self.client.get(self.url("/health")).send().await?;
        let response = ensure_success(response).await?;
        let snapshot: HealthSnapshot = response.json().await?;
        debug!(status = %snapshot.status, ws_clients = snapshot.ws_clients, "Health fetched");
        Ok(snapshot)
    }

    /// Fetch `GET /metrics` as a source-id → counters mapping.
    pub async fn fetch_metrics(&self) -> ApiResult<HashMap<String, SourceCounters>> {
        let response = self.client.get(self.url("/metrics")).send().await?;
        let response = ensure_success(response).await?;
        let counters: HashMap<String, SourceCounters> = response.json().await?;
        debug!(sources = counters.len(), "Metrics fetched");
        Ok(counters)
    }
}

/// Pass 2xx responses through; turn anything else into `ApiError::Status`,
/// keeping the server's `{"error": ...}` message when the body has one.
pub(crate) async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty());

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
