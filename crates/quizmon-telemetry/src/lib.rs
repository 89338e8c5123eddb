//! Prometheus metrics and structured logging for quizmon.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for the event stream, pollers and admin commands
//! - Text exposition for the dashboard's `/metrics` route

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
