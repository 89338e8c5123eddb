//! Backend HTTP clients for the quiz admin monitor.
//!
//! - `BackendClient`: shared reqwest client for the backend API
//! - `HealthPoller` / `MetricsPoller`: periodic fetches feeding shared state
//! - `AdminClient`: quiz control and ban management commands
//! - `NotificationSlot`: transient outcome messages shown after a command

pub mod admin;
pub mod client;
pub mod error;
pub mod notify;
pub mod poller;

pub use admin::{filter_bans, parse_stream_ids, AdminClient, AdminCommand, BannedUser};
pub use client::BackendClient;
pub use error::{ApiError, ApiResult};
pub use notify::{Notification, NotificationKind, NotificationSlot, NOTIFICATION_TTL};
pub use poller::{
    HealthPoller, HealthState, HealthStatus, MetricsPoller, MetricsState, PollerConfig,
    RefreshHandle,
};
