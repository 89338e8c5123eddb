//! Health and metrics polling against the mock backend.

mod integration;
use integration::common::mock_backend::MockBackend;

use quizmon_api::{
    BackendClient, HealthPoller, HealthState, MetricsPoller, MetricsState, RefreshHandle,
};
use quizmon_core::SuccessTier;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn client(server: &MockBackend) -> BackendClient {
    BackendClient::new(server.url(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_health_poll_success_then_failure() {
    let server = MockBackend::start().await;
    let state = HealthState::new();
    let poller = HealthPoller::new(
        client(&server),
        state.clone(),
        Duration::from_secs(5),
        RefreshHandle::new(),
    );

    assert!(poller.poll_once().await);
    let status = state.current();
    assert!(status.reachable);
    let snapshot = status.snapshot.unwrap();
    assert!(snapshot.is_ok());
    assert_eq!(snapshot.uptime_label(), "1h 2m 5s");
    assert_eq!(snapshot.mongo_label(), "CONNECTED");
    let first_update = status.last_update;
    assert!(first_update.is_some());

    server.set_healthy(false);
    assert!(!poller.poll_once().await);
    let status = state.current();
    assert!(!status.reachable);
    assert!(status.snapshot.is_none());
    assert_eq!(status.last_update, first_update);

    server.shutdown();
}

#[tokio::test]
async fn test_metrics_poll_aggregates_sources() {
    let server = MockBackend::start().await;
    let state = MetricsState::new();
    let poller = MetricsPoller::new(
        client(&server),
        state.clone(),
        Duration::from_secs(10),
        RefreshHandle::new(),
    );

    assert!(poller.poll_once().await);
    let report = state.report();
    assert_eq!(report.totals.received, 150);
    assert_eq!(report.totals.deduped, 10);
    assert_eq!(report.totals.persisted, 125);
    assert_eq!(report.totals.rejected, 15);
    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.sources[0].source_id, "s1");
    assert_eq!(report.sources[0].success_rate, 85.0);
    assert_eq!(report.sources[1].success_rate, 80.0);
    assert_eq!(report.sources[1].tier, SuccessTier::Healthy);

    server.set_metrics_available(false);
    assert!(!poller.poll_once().await);
    assert!(state.counters().is_empty());
    assert!(state.report().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn test_unreachable_backend_leaves_safe_values() {
    let backend = BackendClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let health = HealthState::new();
    let metrics = MetricsState::new();

    let health_poller = HealthPoller::new(
        backend.clone(),
        health.clone(),
        Duration::from_secs(5),
        RefreshHandle::new(),
    );
    let metrics_poller = MetricsPoller::new(
        backend,
        metrics.clone(),
        Duration::from_secs(10),
        RefreshHandle::new(),
    );

    assert!(!health_poller.poll_once().await);
    assert!(!metrics_poller.poll_once().await);
    assert!(!health.is_reachable());
    assert!(health.current().last_update.is_none());
    assert!(metrics.report().is_empty());
}

#[tokio::test]
async fn test_refresh_triggers_out_of_band_poll() {
    let server = MockBackend::start().await;
    let refresh = RefreshHandle::new();
    let shutdown = CancellationToken::new();
    let poller = HealthPoller::new(
        client(&server),
        HealthState::new(),
        Duration::from_secs(60),
        refresh.clone(),
    );
    let task = tokio::spawn(poller.run(shutdown.clone()));

    // First tick fires immediately.
    timeout(Duration::from_secs(5), async {
        while server.health_hits() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("initial poll");

    // A trigger that lands mid-fetch is dropped, so keep nudging.
    timeout(Duration::from_secs(5), async {
        while server.health_hits() < 2 {
            refresh.trigger();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("refresh poll");

    shutdown.cancel();
    timeout(Duration::from_secs(5), task)
        .await
        .expect("poller should stop")
        .unwrap();
    server.shutdown();
}
