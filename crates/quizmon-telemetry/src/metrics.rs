//! Prometheus metrics for quizmon.
//!
//! Covers:
//! - Event stream connection state and reconnects
//! - Decoded and dropped stream events
//! - Health/metrics poll outcomes
//! - Admin command outcomes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_int_counter, register_int_gauge_vec,
    CounterVec, Encoder, GaugeVec, IntCounter, IntGaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Every state label exported by `quizmon_stream_state`.
const STREAM_STATES: [&str; 3] = ["connecting", "open", "errored"];

/// Event stream connection (1 = open, 0 = otherwise).
/// Labels: endpoint (events URL)
pub static STREAM_CONNECTED: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quizmon_stream_connected",
        "Event stream connection state (1=open)",
        &["endpoint"]
    )
    .unwrap()
});

/// Event stream state machine current state.
/// Labels: endpoint (events URL), state (connecting/open/errored)
pub static STREAM_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "quizmon_stream_state",
        "Event stream current state (1=active, 0=inactive)",
        &["endpoint", "state"]
    )
    .unwrap()
});

/// Total event stream reconnection attempts.
pub static STREAM_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quizmon_stream_reconnect_total",
        "Total event stream reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Stream events decoded and added to the log.
pub static STREAM_EVENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "quizmon_stream_events_total",
        "Total stream events decoded and retained"
    )
    .unwrap()
});

/// Stream payloads dropped because they failed to decode.
pub static STREAM_DECODE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "quizmon_stream_decode_failures_total",
        "Total stream payloads dropped on decode failure"
    )
    .unwrap()
});

/// Current event log length.
/// Labels: endpoint (events URL)
pub static EVENT_LOG_LEN: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "quizmon_event_log_len",
        "Events currently retained in the log",
        &["endpoint"]
    )
    .unwrap()
});

/// Poll outcomes.
/// Labels: endpoint (health/metrics), outcome (ok/error)
pub static POLL_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quizmon_poll_total",
        "Total backend polls by endpoint and outcome",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Admin command outcomes.
/// Labels: command, outcome (ok/error)
pub static ADMIN_COMMAND_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quizmon_admin_command_total",
        "Total admin commands by command and outcome",
        &["command", "outcome"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the stream state of one endpoint. Only the active state is 1, all others 0.
    pub fn stream_state_set(endpoint: &str, state: &str) {
        for s in STREAM_STATES {
            STREAM_STATE.with_label_values(&[endpoint, s]).set(0.0);
        }
        STREAM_STATE.with_label_values(&[endpoint, state]).set(1.0);
        STREAM_CONNECTED
            .with_label_values(&[endpoint])
            .set(if state == "open" { 1.0 } else { 0.0 });
    }

    /// Record an event stream reconnection.
    pub fn stream_reconnect(reason: &str) {
        STREAM_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a decoded stream event and the resulting log length.
    pub fn stream_event(endpoint: &str, log_len: usize) {
        STREAM_EVENTS_TOTAL.inc();
        EVENT_LOG_LEN
            .with_label_values(&[endpoint])
            .set(log_len as i64);
    }

    /// Record a dropped stream payload.
    pub fn stream_decode_failure() {
        STREAM_DECODE_FAILURES_TOTAL.inc();
    }

    /// Record the log being cleared by the operator.
    pub fn event_log_cleared(endpoint: &str) {
        EVENT_LOG_LEN.with_label_values(&[endpoint]).set(0);
    }

    /// Record a poll outcome.
    pub fn poll(endpoint: &str, ok: bool) {
        POLL_TOTAL
            .with_label_values(&[endpoint, outcome(ok)])
            .inc();
    }

    /// Record an admin command outcome.
    pub fn admin_command(command: &str, ok: bool) {
        ADMIN_COMMAND_TOTAL
            .with_label_values(&[command, outcome(ok)])
            .inc();
    }

    /// Encode the default registry in Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}
