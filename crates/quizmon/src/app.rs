//! Main application orchestration.
//!
//! Coordinates all components:
//! - Event stream subscription (live feed, connection state)
//! - Health and metrics pollers
//! - Dashboard server
//! - Periodic status summary

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use quizmon_api::{
    AdminClient, BackendClient, HealthPoller, HealthState, MetricsPoller, MetricsState,
    RefreshHandle,
};
use quizmon_core::SharedEventLog;
use quizmon_dashboard::DashboardState;
use quizmon_stream::{ConnectionTracker, EventMonitor};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    shutdown: CancellationToken,
    events: SharedEventLog,
    tracker: ConnectionTracker,
    health: HealthState,
    metrics: MetricsState,
    refresh: RefreshHandle,
}

impl Application {
    /// Create a new application. Nothing is spawned until [`run`](Self::run).
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            tracker: ConnectionTracker::with_endpoint(config.events_url()),
            config,
            shutdown: CancellationToken::new(),
            events: SharedEventLog::new(),
            health: HealthState::new(),
            metrics: MetricsState::new(),
            refresh: RefreshHandle::new(),
        })
    }

    /// Root token; cancelling it stops [`run`](Self::run).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn event_log(&self) -> &SharedEventLog {
        &self.events
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn metrics(&self) -> &MetricsState {
        &self.metrics
    }

    /// Run until Ctrl-C or until the shutdown token is cancelled.
    pub async fn run(&mut self) -> AppResult<()> {
        info!(api_url = %self.config.api_url, "Starting quiz monitor");

        let backend =
            BackendClient::new(self.config.api_url.clone(), self.config.request_timeout())?;

        // A taken dashboard port is fatal at startup.
        let listener = if self.config.dashboard.enabled {
            Some(
                quizmon_dashboard::bind(&self.config.dashboard)
                    .await
                    .map_err(|e| AppError::Dashboard(format!("Failed to bind dashboard: {e}")))?,
            )
        } else {
            info!("Dashboard disabled");
            None
        };

        let mut monitor = EventMonitor::spawn_with_tracker(
            self.config.transport_config(),
            self.events.clone(),
            self.tracker.clone(),
            self.shutdown.clone(),
        )?;

        let pollers = self.config.poller_config();
        let health_task = tokio::spawn(
            HealthPoller::new(
                backend.clone(),
                self.health.clone(),
                Duration::from_millis(pollers.health_interval_ms),
                self.refresh.clone(),
            )
            .run(self.shutdown.child_token()),
        );
        let metrics_task = tokio::spawn(
            MetricsPoller::new(
                backend.clone(),
                self.metrics.clone(),
                Duration::from_millis(pollers.metrics_interval_ms),
                self.refresh.clone(),
            )
            .run(self.shutdown.child_token()),
        );

        let dashboard_task = listener.map(|listener| self.spawn_dashboard(listener, backend));

        let status_period = Duration::from_secs(self.config.telemetry.status_interval_secs);
        let mut status_interval = tokio::time::interval(status_period);
        // The first tick completes immediately.
        status_interval.tick().await;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        info!("Entering main loop");
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Shutdown signal received");
                    break;
                }
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = status_interval.tick() => self.log_status(),
            }
        }

        self.shutdown.cancel();
        if let Err(e) = monitor.shutdown().await {
            warn!(error = %e, "Event monitor ended with error");
        }
        for (name, task) in [("health", health_task), ("metrics", metrics_task)] {
            if let Err(e) = task.await {
                warn!(poller = name, error = %e, "Poller task failed to join");
            }
        }
        if let Some(task) = dashboard_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Dashboard task failed to join");
            }
        }

        self.log_status();
        info!("Quiz monitor stopped");
        Ok(())
    }

    fn spawn_dashboard(
        &self,
        listener: tokio::net::TcpListener,
        backend: BackendClient,
    ) -> JoinHandle<()> {
        let state = DashboardState::new(
            self.events.clone(),
            self.tracker.clone(),
            self.health.clone(),
            self.metrics.clone(),
            AdminClient::new(backend),
            self.refresh.clone(),
        );
        let config = self.config.dashboard.clone();
        let shutdown = self.shutdown.child_token();

        tokio::spawn(async move {
            if let Err(e) = quizmon_dashboard::serve(listener, state, config, shutdown).await {
                error!(error = %e, "Dashboard server failed");
            }
        })
    }

    fn log_status(&self) {
        let health = self.health.current();
        let report = self.metrics.report();
        info!(
            stream = %self.tracker.state(),
            events_retained = self.events.len(),
            events_received = self.events.total_received(),
            backend_reachable = health.reachable,
            sources = report.sources.len(),
            messages_received = report.totals.received,
            persisted_rate = report.persisted_rate,
            "Status summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.polling.health_interval_ms = 0;
        assert!(matches!(Application::new(config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_new_starts_empty() {
        let app = Application::new(AppConfig::default()).unwrap();
        assert!(app.event_log().is_empty());
        assert!(!app.health().is_reachable());
        assert!(app.metrics().report().is_empty());
        assert!(!app.shutdown_token().is_cancelled());
    }
}
