//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use quizmon_api::{BannedUser, HealthStatus, Notification, NotificationKind};
use quizmon_core::format::format_datetime;
use quizmon_core::{MetricsReport, StreamEvent};
use serde::{Deserialize, Serialize};

use crate::modes::ModeSettings;

/// Full dashboard state snapshot (sent on initial connection and via REST).
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    pub stream: StreamSnapshot,
    pub health: HealthView,
    pub metrics: MetricsReport,
    pub notifications: NotificationsView,
    pub modes: ModesView,
}

/// Live feed state.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSnapshot {
    /// "connecting", "open" or "errored".
    pub state: String,
    pub connected: bool,
    /// Events received since start or the last clear.
    pub events_received: u64,
    pub capacity: usize,
    /// Retained events, newest first.
    pub events: Vec<EventView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: String,
    pub short_id: String,
    pub event_type: String,
    pub is_answer: bool,
    pub author: Option<String>,
    pub answer: Option<String>,
    /// Local `HH:MM:SS` or "N/A".
    pub received_at: String,
}

impl From<&StreamEvent> for EventView {
    fn from(event: &StreamEvent) -> Self {
        Self {
            id: event.id.clone(),
            short_id: event.short_id(),
            event_type: event.event_type.clone(),
            is_answer: event.is_answer(),
            author: event.author.clone(),
            answer: event.answer.clone(),
            received_at: event.received_at_display(),
        }
    }
}

/// Backend health as shown in the header and the health tab.
#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub reachable: bool,
    /// Local time of the last successful poll.
    pub last_update: Option<String>,
    /// Absent while the backend is unreachable.
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub status: String,
    pub status_label: String,
    pub ok: bool,
    pub ws_clients: u64,
    pub mongo: bool,
    pub mongo_label: String,
    pub uptime: f64,
    pub uptime_label: String,
}

impl From<&HealthStatus> for HealthView {
    fn from(status: &HealthStatus) -> Self {
        Self {
            reachable: status.reachable,
            last_update: status.last_update.map(|ts| {
                ts.with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string()
            }),
            details: status.snapshot.as_ref().map(|s| HealthDetails {
                status: s.status.clone(),
                status_label: s.status_label(),
                ok: s.is_ok(),
                ws_clients: s.ws_clients,
                mongo: s.mongo,
                mongo_label: s.mongo_label().to_string(),
                uptime: s.uptime,
                uptime_label: s.uptime_label(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub kind: NotificationKind,
    pub message: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            kind: n.kind,
            message: n.message.clone(),
        }
    }
}

/// Visible notification per panel.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationsView {
    pub quiz: Option<NotificationView>,
    pub bans: Option<NotificationView>,
    pub modes: Option<NotificationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModesView {
    #[serde(flatten)]
    pub settings: ModeSettings,
    pub env: Vec<String>,
}

impl From<ModeSettings> for ModesView {
    fn from(settings: ModeSettings) -> Self {
        Self {
            env: settings.env_lines(),
            settings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BannedUserView {
    pub id: String,
    pub author: String,
    /// Local date and time, or "N/A".
    pub banned_at: String,
}

impl From<&BannedUser> for BannedUserView {
    fn from(user: &BannedUser) -> Self {
        Self {
            id: user.id.clone(),
            author: user.author.clone(),
            banned_at: format_datetime(user.banned_at.as_deref()),
        }
    }
}

/// `GET /api/bans` response.
#[derive(Debug, Clone, Serialize)]
pub struct BansResponse {
    /// Total banned users before filtering.
    pub total: usize,
    pub users: Vec<BannedUserView>,
}

/// Outcome of a dashboard action.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub ok: bool,
    pub notification: Option<NotificationView>,
}

/// `POST /api/quiz/start` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartQuizRequest {
    /// Comma-separated stream ids; empty means server defaults.
    #[serde(default, rename = "streamIds")]
    pub stream_ids: String,
}

/// `POST /api/bans` body.
#[derive(Debug, Clone, Deserialize)]
pub struct BanRequest {
    #[serde(default)]
    pub author: String,
}

/// Query parameters for `GET /api/bans`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BanSearch {
    #[serde(default)]
    pub search: String,
}

/// Query parameters for `DELETE /api/bans/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnbanQuery {
    /// Author name for the notification; defaults to the id.
    pub author: Option<String>,
}

/// WebSocket message types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(DashboardSnapshot),
    /// Periodic update.
    Update {
        timestamp_ms: i64,
        stream: StreamSnapshot,
        health: HealthView,
        metrics: MetricsReport,
        notifications: NotificationsView,
    },
    /// Event stream connection state changed since the last update.
    ConnectionChanged {
        timestamp_ms: i64,
        state: String,
    },
}
