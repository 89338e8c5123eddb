//! Periodic health and metrics polling.
//!
//! Each poller fetches once immediately, then on a fixed interval with no
//! backoff. A failed poll never stops the loop; it resets the shared state to
//! its safe empty value instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quizmon_core::{HealthSnapshot, MetricsReport, SourceCounters};
use quizmon_telemetry::Metrics;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::BackendClient;
use crate::error::ApiError;

/// Poll intervals.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub health_interval_ms: u64,
    pub metrics_interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            health_interval_ms: 5000,
            metrics_interval_ms: 10000,
        }
    }
}

/// Latest health poll outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthStatus {
    /// Last successful snapshot; cleared when a poll fails.
    pub snapshot: Option<HealthSnapshot>,
    pub reachable: bool,
    /// Time of the last successful poll.
    pub last_update: Option<DateTime<Utc>>,
}

/// Shared health poll state.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    inner: Arc<RwLock<HealthStatus>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> HealthStatus {
        self.inner.read().clone()
    }

    pub fn is_reachable(&self) -> bool {
        self.inner.read().reachable
    }

    pub fn record_success(&self, snapshot: HealthSnapshot) {
        let mut status = self.inner.write();
        status.snapshot = Some(snapshot);
        status.reachable = true;
        status.last_update = Some(Utc::now());
    }

    /// Unreachable. `last_update` keeps the time of the last success.
    pub fn record_failure(&self) {
        let mut status = self.inner.write();
        status.snapshot = None;
        status.reachable = false;
    }
}

/// Shared per-source counters from the last metrics poll.
#[derive(Debug, Clone, Default)]
pub struct MetricsState {
    inner: Arc<RwLock<HashMap<String, SourceCounters>>>,
}

impl MetricsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> HashMap<String, SourceCounters> {
        self.inner.read().clone()
    }

    pub fn replace(&self, counters: HashMap<String, SourceCounters>) {
        *self.inner.write() = counters;
    }

    /// Totals, rates, and per-source rows, recomputed from the current counters.
    pub fn report(&self) -> MetricsReport {
        MetricsReport::from_counters(&self.inner.read())
    }
}

/// Wakes pollers for an immediate out-of-band fetch.
#[derive(Debug, Clone, Default)]
pub struct RefreshHandle {
    notify: Arc<Notify>,
}

impl RefreshHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake every poller currently waiting for its next tick.
    pub fn trigger(&self) {
        self.notify.notify_waiters();
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Polls `GET /health`.
pub struct HealthPoller {
    client: BackendClient,
    state: HealthState,
    interval: Duration,
    refresh: RefreshHandle,
}

impl HealthPoller {
    pub fn new(
        client: BackendClient,
        state: HealthState,
        interval: Duration,
        refresh: RefreshHandle,
    ) -> Self {
        Self {
            client,
            state,
            interval,
            refresh,
        }
    }

    /// Fetch once and update the shared state. Returns whether the backend answered.
    pub async fn poll_once(&self) -> bool {
        match self.client.fetch_health().await {
            Ok(snapshot) => {
                self.state.record_success(snapshot);
                Metrics::poll("health", true);
                true
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                self.state.record_failure();
                Metrics::poll("health", false);
                false
            }
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let this = &self;
        poll_loop("health", self.interval, &self.refresh, &shutdown, move || async move {
            this.poll_once().await;
        })
        .await;
    }
}

/// Polls `GET /metrics`.
pub struct MetricsPoller {
    client: BackendClient,
    state: MetricsState,
    interval: Duration,
    refresh: RefreshHandle,
}

impl MetricsPoller {
    pub fn new(
        client: BackendClient,
        state: MetricsState,
        interval: Duration,
        refresh: RefreshHandle,
    ) -> Self {
        Self {
            client,
            state,
            interval,
            refresh,
        }
    }

    /// Fetch once. Any failure leaves an empty mapping.
    pub async fn poll_once(&self) -> bool {
        match self.client.fetch_metrics().await {
            Ok(counters) => {
                self.state.replace(counters);
                Metrics::poll("metrics", true);
                true
            }
            Err(ApiError::Status { status, .. }) => {
                warn!(status, "Metrics endpoint returned non-success status");
                self.state.replace(HashMap::new());
                Metrics::poll("metrics", false);
                false
            }
            Err(e) => {
                error!(error = %e, "Metrics fetch failed");
                self.state.replace(HashMap::new());
                Metrics::poll("metrics", false);
                false
            }
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let this = &self;
        poll_loop("metrics", self.interval, &self.refresh, &shutdown, move || async move {
            this.poll_once().await;
        })
        .await;
    }
}

/// Tick immediately, then every `period` or on refresh, until shutdown.
async fn poll_loop<F, Fut>(
    endpoint: &'static str,
    period: Duration,
    refresh: &RefreshHandle,
    shutdown: &CancellationToken,
    mut poll: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(endpoint, interval_ms = period.as_millis() as u64, "Poller started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
            () = refresh.notified() => debug!(endpoint, "Refresh requested"),
        }

        tokio::select! {
            () = shutdown.cancelled() => break,
            () = poll() => {}
        }
    }

    info!(endpoint, "Poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> HealthSnapshot {
        HealthSnapshot {
            status: "ok".to_string(),
            ws_clients: 3,
            mongo: true,
            uptime: 42.0,
        }
    }

    #[test]
    fn test_health_success_then_failure() {
        let state = HealthState::new();
        assert!(!state.is_reachable());

        state.record_success(snapshot());
        let status = state.current();
        assert!(status.reachable);
        assert_eq!(status.snapshot, Some(snapshot()));
        let last_update = status.last_update;
        assert!(last_update.is_some());

        state.record_failure();
        let status = state.current();
        assert!(!status.reachable);
        assert!(status.snapshot.is_none());
        assert_eq!(status.last_update, last_update);
    }

    #[test]
    fn test_metrics_report_tracks_replacement() {
        let state = MetricsState::new();
        assert!(state.report().is_empty());

        state.replace(HashMap::from([(
            "s1".to_string(),
            SourceCounters::new(10, 1, 9, 0),
        )]));
        let report = state.report();
        assert_eq!(report.totals.received, 10);
        assert_eq!(report.persisted_rate, 90.0);

        state.replace(HashMap::new());
        assert!(state.report().is_empty());
    }

    #[tokio::test]
    async fn test_poll_loop_ticks_immediately_and_stops() {
        let shutdown = CancellationToken::new();
        let refresh = RefreshHandle::new();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = count.clone();
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            poll_loop("test", Duration::from_secs(3600), &refresh, &token, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_wakes_loop() {
        let shutdown = CancellationToken::new();
        let refresh = RefreshHandle::new();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = count.clone();
        let token = shutdown.clone();
        let loop_refresh = refresh.clone();
        let task = tokio::spawn(async move {
            poll_loop("test", Duration::from_secs(3600), &loop_refresh, &token, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        refresh.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);

        shutdown.cancel();
        task.await.unwrap();
    }
}
