//! Event stream monitor.
//!
//! Runs the SSE transport in a background task and turns its callbacks into
//! connection state transitions and event log entries.

use quizmon_core::{SharedEventLog, StreamEvent};
use quizmon_telemetry::Metrics;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::StreamResult;
use crate::tracker::{ConnectionState, ConnectionTracker};
use crate::transport::{SseTransport, TransportConfig, TransportEvent};

/// Buffer between the transport and the consumer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State touched by transport callbacks.
#[derive(Debug, Clone)]
struct MonitorCore {
    log: SharedEventLog,
    tracker: ConnectionTracker,
}

impl MonitorCore {
    fn apply(&self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                self.tracker.set(ConnectionState::Open);
            }
            TransportEvent::Error(message) => {
                debug!(%message, "Transport reported error");
                self.tracker.set(ConnectionState::Errored);
            }
            TransportEvent::Message(payload) => self.handle_message(&payload),
        }
    }

    /// Decode one payload. Failures are dropped; the connection state is untouched.
    fn handle_message(&self, payload: &str) {
        match StreamEvent::decode(payload) {
            Ok(event) => {
                debug!(id = %event.id, event_type = %event.event_type, "Stream event");
                self.log.push(event);
                if let Some(endpoint) = self.tracker.endpoint() {
                    Metrics::stream_event(endpoint, self.log.len());
                }
            }
            Err(e) => {
                warn!(error = %e, payload_len = payload.len(), "Dropping undecodable stream payload");
                Metrics::stream_decode_failure();
            }
        }
    }

    async fn consume(self, mut rx: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
    }
}

/// Live feed subscription.
///
/// Dropping the monitor cancels the subscription.
pub struct EventMonitor {
    core: MonitorCore,
    shutdown: CancellationToken,
    task: Option<JoinHandle<StreamResult<()>>>,
}

impl EventMonitor {
    /// Subscribe to the events endpoint and start filling `log`.
    ///
    /// The state is `Connecting` until the transport reports open.
    pub fn spawn(
        config: TransportConfig,
        log: SharedEventLog,
        shutdown: CancellationToken,
    ) -> StreamResult<Self> {
        Self::spawn_with_tracker(config, log, ConnectionTracker::new(), shutdown)
    }

    /// Like [`spawn`](Self::spawn), reporting into an existing tracker.
    ///
    /// Receivers taken from `tracker` beforehand observe every transition.
    pub fn spawn_with_tracker(
        config: TransportConfig,
        log: SharedEventLog,
        tracker: ConnectionTracker,
        shutdown: CancellationToken,
    ) -> StreamResult<Self> {
        let transport = SseTransport::new(config)?;
        tracker.bind_endpoint(&transport.config().url);
        tracker.set(ConnectionState::Connecting);

        let core = MonitorCore { log, tracker };
        let shutdown = shutdown.child_token();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let consumer = core.clone();
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            info!(url = %transport.config().url, "Event monitor started");
            let (result, ()) = tokio::join!(transport.run(tx, token), consumer.consume(rx));
            if let Err(e) = &result {
                error!(error = %e, "Event monitor stopped");
            }
            result
        });

        Ok(Self {
            core,
            shutdown,
            task: Some(task),
        })
    }

    /// Shared event log being filled.
    pub fn log(&self) -> &SharedEventLog {
        &self.core.log
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.core.tracker
    }

    pub fn state(&self) -> ConnectionState {
        self.core.tracker.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.core.tracker.subscribe()
    }

    /// Empty the event log. Connection state is not affected.
    pub fn clear(&self) {
        self.core.log.clear();
        if let Some(endpoint) = self.core.tracker.endpoint() {
            Metrics::event_log_cleared(endpoint);
        }
        info!("Event log cleared");
    }

    /// Whether the background task has finished (shutdown or gave up).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Cancel the subscription and wait for the task to finish.
    pub async fn shutdown(&mut self) -> StreamResult<()> {
        self.shutdown.cancel();
        match self.task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Event monitor task failed to join");
                    Ok(())
                }
            },
            None => Ok(()),
        }
    }
}

impl Drop for EventMonitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
