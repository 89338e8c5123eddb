//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event stream error: {0}")]
    Stream(#[from] quizmon_stream::StreamError),

    #[error("Backend API error: {0}")]
    Api(#[from] quizmon_api::ApiError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] quizmon_telemetry::TelemetryError),

    #[error("Dashboard error: {0}")]
    Dashboard(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
