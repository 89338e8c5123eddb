//! Live event stream client for the quiz admin monitor.
//!
//! Provides:
//! - SSE frame parsing over an HTTP byte stream
//! - A transport that owns the subscription and its reconnection policy
//!   (exponential backoff with jitter)
//! - Connection state tracking (Connecting / Open / Errored)
//! - `EventMonitor`, which decodes payloads into the bounded event log

pub mod error;
pub mod monitor;
pub mod sse;
pub mod tracker;
pub mod transport;

pub use error::{StreamError, StreamResult};
pub use monitor::EventMonitor;
pub use sse::{SseFrame, SseItem};
pub use tracker::{ConnectionState, ConnectionTracker};
pub use transport::{SseTransport, TransportConfig, TransportEvent};
