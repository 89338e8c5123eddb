//! Event stream error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from event stream")]
    Status { status: u16 },

    #[error("Stream read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

pub type StreamResult<T> = Result<T, StreamError>;

impl StreamError {
    /// Short label for the reconnect counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::Read(_) => "read",
            Self::ConnectionFailed(_) => "connection_failed",
        }
    }
}
