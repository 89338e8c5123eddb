//! Event stream transport.
//!
//! Owns the HTTP subscription to the events endpoint and its reconnection
//! policy. Consumers see only `TransportEvent`s: open, message payload, error.
//! After an error the transport backs off (exponential with jitter) and
//! reconnects on its own until shutdown or the attempt limit.

use std::time::Duration;

use futures_util::StreamExt;
use quizmon_telemetry::Metrics;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{StreamError, StreamResult};
use crate::sse::{self, SseItem};

/// Upper bound on reconnect jitter.
const MAX_JITTER_MS: u64 = 1000;

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Full URL of the events endpoint.
    pub url: String,
    /// Maximum consecutive failed connection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// TCP connect timeout. The stream itself has no read timeout.
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30000,
            connect_timeout_ms: 10000,
        }
    }
}

/// Callback surface of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The server accepted the subscription.
    Opened,
    /// Raw payload of one default-type message.
    Message(String),
    /// The subscription failed or ended. A reconnect may follow.
    Error(String),
}

/// How a single subscription ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    ReceiverGone,
    Closed,
}

/// SSE transport with automatic reconnection.
pub struct SseTransport {
    config: TransportConfig,
    client: reqwest::Client,
}

impl SseTransport {
    pub fn new(config: TransportConfig) -> StreamResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Subscribe and keep the subscription alive.
    ///
    /// Returns `Ok(())` on shutdown or when `events` is closed, and an error
    /// only once `max_reconnect_attempts` consecutive attempts have failed.
    pub async fn run(
        &self,
        events: mpsc::Sender<TransportEvent>,
        shutdown: CancellationToken,
    ) -> StreamResult<()> {
        let mut attempt = 0u32;

        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested, exiting event stream loop");
                return Ok(());
            }

            let mut opened = false;
            let (reason, message) = match self.stream_once(&events, &shutdown, &mut opened).await
            {
                Ok(SessionEnd::Shutdown) => {
                    info!("Shutdown requested, closing event stream");
                    return Ok(());
                }
                Ok(SessionEnd::ReceiverGone) => {
                    debug!("Event consumer dropped, stopping transport");
                    return Ok(());
                }
                Ok(SessionEnd::Closed) => {
                    info!("Event stream closed by server");
                    ("closed", "stream closed by server".to_string())
                }
                Err(e) => {
                    error!(error = %e, "Event stream error");
                    (e.reason(), e.to_string())
                }
            };

            if events.send(TransportEvent::Error(message)).await.is_err() {
                return Ok(());
            }

            if opened {
                attempt = 0;
            }
            attempt += 1;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                return Err(StreamError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            Metrics::stream_reconnect(reason);
            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting event stream");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    async fn stream_once(
        &self,
        events: &mpsc::Sender<TransportEvent>,
        shutdown: &CancellationToken,
        opened: &mut bool,
    ) -> StreamResult<SessionEnd> {
        info!(url = %self.config.url, "Connecting to event stream");

        let request = self
            .client
            .get(&self.config.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send();

        let response = tokio::select! {
            result = request => result?,
            () = shutdown.cancelled() => return Ok(SessionEnd::Shutdown),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }

        *opened = true;
        if events.send(TransportEvent::Opened).await.is_err() {
            return Ok(SessionEnd::ReceiverGone);
        }

        let mut frames = std::pin::pin!(sse::response_frames(response));
        loop {
            let item = tokio::select! {
                item = frames.next() => item,
                () = shutdown.cancelled() => return Ok(SessionEnd::Shutdown),
            };

            match item {
                None => return Ok(SessionEnd::Closed),
                Some(Err(e)) => return Err(e),
                Some(Ok(SseItem::KeepAlive)) => debug!("Event stream keep-alive"),
                Some(Ok(SseItem::Frame(frame))) => {
                    if !frame.is_message() {
                        debug!(event = ?frame.event, "Ignoring named event");
                        continue;
                    }
                    if events.send(TransportEvent::Message(frame.data)).await.is_err() {
                        return Ok(SessionEnd::ReceiverGone);
                    }
                }
            }
        }
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let delay = backoff_delay_ms(&self.config, attempt);
        // Short base delays keep short jitter so tests and local runs stay fast.
        let jitter = rand_jitter(self.config.reconnect_base_delay_ms.min(MAX_JITTER_MS));
        Duration::from_millis(delay + jitter)
    }
}

/// Exponential backoff without jitter: base * 2^(attempt-1), capped at max.
fn backoff_delay_ms(config: &TransportConfig, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(10);
    config
        .reconnect_base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.reconnect_max_delay_ms)
}

/// Generate random jitter in `0..bound` ms.
fn rand_jitter(bound: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if bound == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    nanos as u64 % bound
}
