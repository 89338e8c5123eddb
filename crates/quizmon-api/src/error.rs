//! Backend client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}")]
    Status {
        status: u16,
        /// Server-provided `{"error": ...}` message, if any.
        message: Option<String>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Transport-level failure (no HTTP response, or an unreadable one).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Decode(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
