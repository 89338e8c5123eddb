//! Transient command outcome notifications.
//!
//! Each panel has one slot. Showing a notification replaces whatever was
//! there; a notification stops being visible `NOTIFICATION_TTL` after it was
//! created.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created_at: Instant::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < NOTIFICATION_TTL
    }
}

/// Single-slot notification holder shared between a command handler and the
/// view that renders it.
#[derive(Debug, Clone, Default)]
pub struct NotificationSlot {
    inner: Arc<RwLock<Option<Notification>>>,
}

impl NotificationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current notification.
    pub fn show(&self, kind: NotificationKind, message: impl Into<String>) {
        self.set(Notification::new(kind, message));
    }

    pub fn set(&self, notification: Notification) {
        *self.inner.write() = Some(notification);
    }

    /// The notification, if still visible.
    pub fn current(&self) -> Option<Notification> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<Notification> {
        self.inner
            .read()
            .as_ref()
            .filter(|n| n.is_visible_at(now))
            .cloned()
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_within_ttl() {
        let slot = NotificationSlot::new();
        slot.show(NotificationKind::Success, "Quiz started successfully!");

        let shown = slot.current().unwrap();
        assert!(shown.is_success());
        assert_eq!(shown.message, "Quiz started successfully!");
    }

    #[test]
    fn test_expires_after_ttl() {
        let slot = NotificationSlot::new();
        let notification = Notification::error("Failed to start quiz");
        let created = notification.created_at;
        slot.set(notification);

        assert!(slot.current_at(created + Duration::from_millis(2999)).is_some());
        assert!(slot.current_at(created + NOTIFICATION_TTL).is_none());
    }

    #[test]
    fn test_newer_replaces_older() {
        let slot = NotificationSlot::new();
        slot.show(NotificationKind::Error, "first");
        slot.show(NotificationKind::Success, "second");

        let shown = slot.current().unwrap();
        assert_eq!(shown.message, "second");
        assert_eq!(shown.kind, NotificationKind::Success);
    }

    #[test]
    fn test_clones_share_slot() {
        let slot = NotificationSlot::new();
        let view = slot.clone();
        slot.show(NotificationKind::Success, "Moving to next question!");
        assert!(view.current().is_some());

        view.clear();
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_empty_slot() {
        assert!(NotificationSlot::new().current().is_none());
    }
}
