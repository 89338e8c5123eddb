//! Dashboard state management.
//!
//! DashboardState aggregates the monitor's shared state (event log, connection
//! tracker, poll results) and runs the operator actions behind the admin
//! routes, keeping one notification slot per panel.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use quizmon_api::{
    filter_bans, parse_stream_ids, AdminClient, AdminCommand, ApiError, ApiResult, HealthState,
    MetricsState, Notification, NotificationSlot, RefreshHandle,
};
use quizmon_core::SharedEventLog;
use quizmon_stream::{ConnectionState, ConnectionTracker};
use quizmon_telemetry::Metrics;
use tracing::info;

use crate::modes::{ModeSettings, ModeUpdate};
use crate::types::{
    BannedUserView, BansResponse, DashboardSnapshot, EventView, HealthView, NotificationView,
    NotificationsView, StreamSnapshot,
};

/// Outcome of an operator action, ready for the HTTP layer.
#[derive(Debug, Clone)]
pub struct ActionOutcome<T> {
    pub result: Result<T, ActionError>,
    pub notification: Option<NotificationView>,
}

/// Why an action failed, as far as the HTTP status is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// Rejected before reaching the backend.
    InvalidInput,
    /// The backend refused or could not be reached.
    Backend,
}

impl From<&ApiError> for ActionError {
    fn from(e: &ApiError) -> Self {
        match e {
            ApiError::InvalidInput(_) => Self::InvalidInput,
            _ => Self::Backend,
        }
    }
}

/// Dashboard state that aggregates data from the monitor components.
#[derive(Clone)]
pub struct DashboardState {
    events: SharedEventLog,
    tracker: ConnectionTracker,
    health: HealthState,
    metrics: MetricsState,
    admin: AdminClient,
    refresh: RefreshHandle,
    quiz_notice: NotificationSlot,
    ban_notice: NotificationSlot,
    mode_notice: NotificationSlot,
    modes: Arc<RwLock<ModeSettings>>,
}

impl DashboardState {
    pub fn new(
        events: SharedEventLog,
        tracker: ConnectionTracker,
        health: HealthState,
        metrics: MetricsState,
        admin: AdminClient,
        refresh: RefreshHandle,
    ) -> Self {
        Self {
            events,
            tracker,
            health,
            metrics,
            admin,
            refresh,
            quiz_notice: NotificationSlot::new(),
            ban_notice: NotificationSlot::new(),
            mode_notice: NotificationSlot::new(),
            modes: Arc::new(RwLock::new(ModeSettings::default())),
        }
    }

    /// Collect a full snapshot of the current state.
    pub fn collect_snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            stream: self.collect_stream(),
            health: self.collect_health(),
            metrics: self.metrics.report(),
            notifications: self.collect_notifications(),
            modes: self.modes().into(),
        }
    }

    pub fn collect_stream(&self) -> StreamSnapshot {
        let state = self.tracker.state();
        let events = self.events.snapshot();
        StreamSnapshot {
            state: state.as_str().to_string(),
            connected: state.is_open(),
            events_received: self.events.total_received(),
            capacity: self.events.capacity(),
            events: events.iter().map(EventView::from).collect(),
        }
    }

    pub fn collect_health(&self) -> HealthView {
        HealthView::from(&self.health.current())
    }

    pub fn collect_notifications(&self) -> NotificationsView {
        NotificationsView {
            quiz: self.quiz_notice.current().as_ref().map(NotificationView::from),
            bans: self.ban_notice.current().as_ref().map(NotificationView::from),
            modes: self.mode_notice.current().as_ref().map(NotificationView::from),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.tracker.state()
    }

    pub fn modes(&self) -> ModeSettings {
        *self.modes.read()
    }

    /// Empty the live feed. The connection is left alone.
    pub fn clear_events(&self) {
        self.events.clear();
        if let Some(endpoint) = self.tracker.endpoint() {
            Metrics::event_log_cleared(endpoint);
        }
        info!("Event log cleared from dashboard");
    }

    /// Ask both pollers for an immediate fetch.
    pub fn refresh(&self) {
        self.refresh.trigger();
        info!("Manual refresh requested");
    }

    pub fn update_modes(&self, update: &ModeUpdate) -> (ModeSettings, Option<NotificationView>) {
        let (settings, messages) = {
            let mut modes = self.modes.write();
            let messages = modes.apply(update);
            (*modes, messages)
        };

        // Single slot: the last change wins.
        let notification = messages.into_iter().last().map(Notification::success);
        let view = notification.as_ref().map(NotificationView::from);
        if let Some(notification) = notification {
            info!(message = %notification.message, "Mode changed");
            self.mode_notice.set(notification);
        }
        (settings, view)
    }

    pub async fn start_quiz(&self, stream_ids: &str) -> ActionOutcome<()> {
        let ids = parse_stream_ids(stream_ids);
        let result = self.admin.start_quiz(&ids).await;
        self.finish(AdminCommand::StartQuiz, &self.quiz_notice, result)
    }

    pub async fn next_question(&self) -> ActionOutcome<()> {
        let result = self.admin.next_question().await;
        self.finish(AdminCommand::NextQuestion, &self.quiz_notice, result)
    }

    pub async fn list_bans(&self, search: &str) -> ActionOutcome<BansResponse> {
        let outcome = self
            .finish(AdminCommand::ListBans, &self.ban_notice, self.admin.list_bans().await);
        ActionOutcome {
            result: outcome.result.map(|users| BansResponse {
                total: users.len(),
                users: filter_bans(&users, search)
                    .into_iter()
                    .map(BannedUserView::from)
                    .collect(),
            }),
            notification: outcome.notification,
        }
    }

    pub async fn ban_user(&self, author: &str) -> ActionOutcome<()> {
        let result = self.admin.ban_user(author).await;
        let command = AdminCommand::Ban {
            author: author.to_string(),
        };
        self.finish(command, &self.ban_notice, result)
    }

    pub async fn unban_user(&self, id: &str, author: &str) -> ActionOutcome<()> {
        let result = self.admin.unban_user(id).await;
        let command = AdminCommand::Unban {
            author: author.to_string(),
        };
        self.finish(command, &self.ban_notice, result)
    }

    fn finish<T>(
        &self,
        command: AdminCommand,
        slot: &NotificationSlot,
        result: ApiResult<T>,
    ) -> ActionOutcome<T> {
        let notification = command.outcome(&result);
        let view = notification.as_ref().map(NotificationView::from);
        if let Some(notification) = notification {
            slot.set(notification);
        }
        ActionOutcome {
            result: result.map_err(|e| ActionError::from(&e)),
            notification: view,
        }
    }
}

impl std::fmt::Debug for DashboardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardState")
            .field("connection_state", &self.tracker.state())
            .field("events", &self.events.len())
            .field("health_reachable", &self.health.is_reachable())
            .finish()
    }
}
