//! WebSocket broadcast functionality.
//!
//! The broadcaster collects state updates at a fixed interval and broadcasts
//! them to all connected WebSocket clients.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::DashboardMessage;

/// Run the broadcaster task until `shutdown` fires.
///
/// A `connection_changed` message precedes the regular update whenever the
/// stream state differs from the previous tick.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    let mut last_state = state.connection_state();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("Broadcaster stopped");
                return;
            }
            _ = interval.tick() => {}
        }

        let current_state = state.connection_state();
        if current_state != last_state {
            send(
                &tx,
                &DashboardMessage::ConnectionChanged {
                    timestamp_ms: Utc::now().timestamp_millis(),
                    state: current_state.as_str().to_string(),
                },
            );
            last_state = current_state;
        }

        let snapshot = state.collect_snapshot();
        send(
            &tx,
            &DashboardMessage::Update {
                timestamp_ms: snapshot.timestamp_ms,
                stream: snapshot.stream,
                health: snapshot.health,
                metrics: snapshot.metrics,
                notifications: snapshot.notifications,
            },
        );
    }
}

fn send(tx: &broadcast::Sender<String>, msg: &DashboardMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => match tx.send(json) {
            Ok(n) => trace!(receivers = n, "Broadcast update sent"),
            // No receivers - this is normal when no clients connected
            Err(_) => trace!("No WebSocket receivers connected"),
        },
        Err(e) => debug!(error = %e, "Failed to serialize dashboard update"),
    }
}
