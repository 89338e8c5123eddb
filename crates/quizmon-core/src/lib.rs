//! Core domain types for the quiz admin monitor.
//!
//! This crate provides the pieces that carry no I/O:
//! - `StreamEvent`: one decoded unit from the live event feed
//! - `EventLog`: bounded, most-recent-first retention of stream events
//! - `SourceCounters` / `aggregate`: per-source message counters and their totals
//! - `HealthSnapshot`: point-in-time backend health
//! - `format`: display helpers (uptime, id truncation, timestamps)

pub mod aggregate;
pub mod error;
pub mod event;
pub mod event_log;
pub mod format;
pub mod health;

pub use aggregate::{
    aggregate, rate, AggregateTotals, MetricsReport, SourceCounters, SourceRow, SuccessTier,
};
pub use error::{CoreError, Result};
pub use event::StreamEvent;
pub use event_log::{EventLog, SharedEventLog, DEFAULT_CAPACITY};
pub use health::HealthSnapshot;
