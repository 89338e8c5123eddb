//! Application configuration.

use crate::error::{AppError, AppResult};
use quizmon_api::PollerConfig;
use quizmon_dashboard::DashboardConfig;
use quizmon_stream::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "QUIZMON_CONFIG";

/// Environment variable overriding `api_url`.
pub const API_URL_ENV: &str = "QUIZMON_API_URL";

/// Event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Path of the SSE endpoint below `api_url`.
    #[serde(default = "default_events_path")]
    pub events_path: String,
    /// First reconnect delay (ms), doubled per failed attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Upper bound for the reconnect delay (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Consecutive failed attempts before giving up. 0 = retry forever.
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// TCP connect timeout for the stream request (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_events_path() -> String {
    "/events".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            events_path: default_events_path(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            max_reconnect_attempts: 0,
            connect_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Backend polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Health poll interval (ms). Default: 5,000.
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    /// Metrics poll interval (ms). Default: 10,000.
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,
    /// Timeout for polls and admin commands (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_health_interval_ms() -> u64 {
    5000
}

fn default_metrics_interval_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            health_interval_ms: default_health_interval_ms(),
            metrics_interval_ms: default_metrics_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Interval of the status summary log line (seconds).
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_status_interval_secs() -> u64 {
    60
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The file was missing; built-in defaults are in use.
    Defaults,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_api_url() -> String {
    "http://localhost:3001".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            stream: StreamConfig::default(),
            polling: PollingConfig::default(),
            dashboard: DashboardConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the config path: CLI argument > `QUIZMON_CONFIG` > default.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load the configuration at `path`, apply environment overrides and validate.
    ///
    /// A missing file yields the defaults; the caller logs that once logging is up.
    pub fn load(path: &str) -> AppResult<(Self, ConfigSource)> {
        let (mut config, source) = if Path::new(path).exists() {
            (Self::from_file(path)?, ConfigSource::File)
        } else {
            (Self::default(), ConfigSource::Defaults)
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_url = url;
        }

        config.validate()?;
        Ok((config, source))
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if !self.stream.events_path.starts_with('/') {
            return Err(AppError::Config(format!(
                "stream.events_path must start with '/', got {:?}",
                self.stream.events_path
            )));
        }

        let intervals = [
            ("stream.reconnect_base_delay_ms", self.stream.reconnect_base_delay_ms),
            ("stream.connect_timeout_ms", self.stream.connect_timeout_ms),
            ("polling.health_interval_ms", self.polling.health_interval_ms),
            ("polling.metrics_interval_ms", self.polling.metrics_interval_ms),
            ("polling.request_timeout_ms", self.polling.request_timeout_ms),
            ("dashboard.update_interval_ms", self.dashboard.update_interval_ms),
            ("telemetry.status_interval_secs", self.telemetry.status_interval_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::Config(format!("{name} must be greater than 0")));
        }

        if self.stream.reconnect_max_delay_ms < self.stream.reconnect_base_delay_ms {
            return Err(AppError::Config(
                "stream.reconnect_max_delay_ms must not be below reconnect_base_delay_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of the event stream.
    pub fn events_url(&self) -> String {
        format!(
            "{}{}",
            self.api_url.trim_end_matches('/'),
            self.stream.events_path
        )
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.events_url(),
            max_reconnect_attempts: self.stream.max_reconnect_attempts,
            reconnect_base_delay_ms: self.stream.reconnect_base_delay_ms,
            reconnect_max_delay_ms: self.stream.reconnect_max_delay_ms,
            connect_timeout_ms: self.stream.connect_timeout_ms,
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            health_interval_ms: self.polling.health_interval_ms,
            metrics_interval_ms: self.polling.metrics_interval_ms,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.polling.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.events_url(), "http://localhost:3001/events");
        assert_eq!(config.polling.health_interval_ms, 5000);
        assert_eq!(config.polling.metrics_interval_ms, 10_000);
        assert_eq!(config.stream.max_reconnect_attempts, 0);
        assert!(config.dashboard.enabled);
        assert_eq!(config.dashboard.port, 8080);
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            api_url = "https://quiz.example.com/"

            [polling]
            health_interval_ms = 2000

            [dashboard]
            port = 9090
            "#,
        )
        .unwrap();

        assert_eq!(config.events_url(), "https://quiz.example.com/events");
        assert_eq!(config.polling.health_interval_ms, 2000);
        assert_eq!(config.polling.metrics_interval_ms, 10_000);
        assert_eq!(config.dashboard.port, 9090);
        assert_eq!(config.dashboard.update_interval_ms, 1000);
        assert_eq!(config.telemetry.log_level, "info");

        let transport = config.transport_config();
        assert_eq!(transport.url, "https://quiz.example.com/events");
        assert_eq!(transport.reconnect_base_delay_ms, 1000);
        assert_eq!(config.poller_config().health_interval_ms, 2000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("api_url = [").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.polling.metrics_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("polling.metrics_interval_ms"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = AppConfig::default();
        config.api_url = "ws://localhost:3001".to_string();
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = AppConfig::default();
        config.stream.reconnect_base_delay_ms = 5000;
        config.stream.reconnect_max_delay_ms = 1000;
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let (config, source) = AppConfig::load("/nonexistent/quizmon.toml").unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.polling.health_interval_ms, 5000);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("api_url"));
        assert!(toml_str.contains("[polling]"));
        assert!(toml_str.contains("[dashboard]"));
    }
}
