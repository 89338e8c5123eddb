//! Bounded, most-recent-first event retention.
//!
//! The log keeps at most `capacity` events. New events go to the front and the
//! least-recently-inserted event is evicted from the back. Insertion order is
//! the only ordering; event timestamps are never consulted.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::StreamEvent;

/// Number of events retained by the live feed.
pub const DEFAULT_CAPACITY: usize = 50;

/// Fixed-capacity most-recent-first event log.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<StreamEvent>,
    capacity: usize,
    /// Events accepted since creation or the last `clear()`.
    /// Keeps counting after eviction.
    total_received: u64,
}

impl EventLog {
    /// Create a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a log with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity + 1),
            capacity,
            total_received: 0,
        }
    }

    /// Insert an event at the front, evicting the oldest entries over capacity.
    pub fn push(&mut self, event: StreamEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
        self.total_received = self.total_received.saturating_add(1);
    }

    /// Remove all events and reset the received counter.
    pub fn clear(&mut self) {
        self.events.clear();
        self.total_received = 0;
    }

    /// Copy of the retained events, most recent first.
    pub fn snapshot(&self) -> Vec<StreamEvent> {
        self.events.iter().cloned().collect()
    }

    /// Iterate retained events, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &StreamEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_received(&self) -> u64 {
        self.total_received
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to an event log.
///
/// The stream monitor writes through this handle while the dashboard reads
/// snapshots. Readers always get an owned copy, so a push that lands during
/// rendering never affects a snapshot already taken.
#[derive(Debug, Clone, Default)]
pub struct SharedEventLog {
    inner: Arc<RwLock<EventLog>>,
}

impl SharedEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(EventLog::with_capacity(capacity))),
        }
    }

    /// Push an event and return the new total-received count.
    pub fn push(&self, event: StreamEvent) -> u64 {
        let mut log = self.inner.write();
        log.push(event);
        log.total_received()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn snapshot(&self) -> Vec<StreamEvent> {
        self.inner.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn total_received(&self) -> u64 {
        self.inner.read().total_received()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }
}
