//! Display formatting helpers shared by the dashboard and the CLI.

use chrono::{DateTime, Local};

/// Marker shown when a timestamp is absent or unreadable.
pub const UNAVAILABLE: &str = "N/A";

/// Number of id characters shown before the ellipsis.
const SHORT_ID_LEN: usize = 8;

/// Format an uptime in seconds as `"{h}h {m}m {s}s"`.
///
/// Fractional seconds are floored. Negative or non-finite input renders as zero.
pub fn format_uptime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}h {minutes}m {secs}s")
}

/// First eight characters of an id followed by `...`.
pub fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(SHORT_ID_LEN).collect();
    format!("{prefix}...")
}

/// Render an RFC 3339 timestamp as local wall-clock time (`HH:MM:SS`).
pub fn format_timestamp(raw: Option<&str>) -> String {
    parse_timestamp(raw)
        .map(|ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Render an RFC 3339 timestamp as local date and time.
pub fn format_datetime(raw: Option<&str>) -> String {
    parse_timestamp(raw)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc3339(raw?.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(3725.0), "1h 2m 5s");
        assert_eq!(format_uptime(0.0), "0h 0m 0s");
        assert_eq!(format_uptime(59.9), "0h 0m 59s");
        assert_eq!(format_uptime(90061.0), "25h 1m 1s");
    }

    #[test]
    fn test_format_uptime_invalid_input() {
        assert_eq!(format_uptime(-5.0), "0h 0m 0s");
        assert_eq!(format_uptime(f64::NAN), "0h 0m 0s");
        assert_eq!(format_uptime(f64::INFINITY), "0h 0m 0s");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567...");
        assert_eq!(short_id("abc"), "abc...");
        assert_eq!(short_id(""), "...");
    }

    #[test]
    fn test_short_id_multibyte() {
        assert_eq!(short_id("ééééééééé"), "éééééééé...");
    }

    #[test]
    fn test_format_timestamp() {
        let rendered = format_timestamp(Some("2024-03-01T12:34:56.789Z"));
        assert_eq!(rendered.len(), 8);
        assert_eq!(rendered.matches(':').count(), 2);
    }

    #[test]
    fn test_format_timestamp_unavailable() {
        assert_eq!(format_timestamp(None), UNAVAILABLE);
        assert_eq!(format_timestamp(Some("")), UNAVAILABLE);
        assert_eq!(format_timestamp(Some("yesterday")), UNAVAILABLE);
    }

    #[test]
    fn test_format_datetime() {
        let rendered = format_datetime(Some("2024-03-01T12:34:56+00:00"));
        assert_eq!(rendered.len(), 19);
        assert_eq!(format_datetime(None), UNAVAILABLE);
    }
}
