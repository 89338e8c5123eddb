//! Connection state tracking for the event stream subscription.
//!
//! The tracker holds the latest state only. Transitions are crate-private and
//! driven by the monitor's transport callbacks; everything outside this crate
//! can read or subscribe but never force a transition.
//!
//! State gauges are labelled with the endpoint the tracker is bound to, so
//! several monitors in one process report side by side.

use std::sync::{Arc, OnceLock};

use quizmon_telemetry::Metrics;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Event stream connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Subscription requested, not yet open.
    #[default]
    Connecting,
    /// Transport reported the stream open.
    Open,
    /// Transport reported an error; it may reconnect on its own.
    Errored,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Errored => "errored",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest-value connection state holder.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    tx: Arc<watch::Sender<ConnectionState>>,
    endpoint: Arc<OnceLock<String>>,
}

impl ConnectionTracker {
    /// Unbound tracker. Gauges are published once a monitor binds it.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Connecting);
        Self {
            tx: Arc::new(tx),
            endpoint: Arc::new(OnceLock::new()),
        }
    }

    /// Tracker bound to `endpoint` from the start.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let tracker = Self::new();
        tracker.bind_endpoint(&endpoint.into());
        tracker
    }

    /// Endpoint label used for this tracker's gauges.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.get().map(String::as_str)
    }

    /// Bind the gauge label and publish the current state under it.
    ///
    /// The first binding wins; later ones are ignored.
    pub(crate) fn bind_endpoint(&self, endpoint: &str) {
        if self.endpoint.set(endpoint.to_string()).is_err() {
            debug!(bound = ?self.endpoint(), endpoint, "Tracker already bound");
            return;
        }
        self.publish(self.state());
    }

    fn publish(&self, state: ConnectionState) {
        if let Some(endpoint) = self.endpoint() {
            Metrics::stream_state_set(endpoint, state.as_str());
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Receiver that observes every later transition.
    ///
    /// Like any watch receiver it coalesces: a slow observer sees the latest
    /// state, not every intermediate one.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Apply a transition. Returns `true` if the state changed.
    pub(crate) fn set(&self, next: ConnectionState) -> bool {
        let previous = self.tx.send_replace(next);
        if previous == next {
            return false;
        }

        match next {
            ConnectionState::Open => info!(from = %previous, "Event stream open"),
            ConnectionState::Errored => warn!(from = %previous, "Event stream errored"),
            ConnectionState::Connecting => info!(from = %previous, "Event stream connecting"),
        }
        self.publish(next);
        true
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
