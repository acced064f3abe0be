//! Transient, non-blocking notifications.
//!
//! Recovered errors and successful mutations surface as [`Notice`] values on
//! a broadcast channel. The UI layer subscribes and renders them as toasts;
//! nothing in the core ever blocks on a notice being observed.

use tokio::sync::broadcast;

/// Channel capacity. Notices are fire-and-forget; lagging receivers drop the
/// oldest entries, which is acceptable for toasts.
const CHANNEL_CAPACITY: usize = 32;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Cloneable handle for publishing and subscribing to notices.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Notices {
    /// Create a new notice channel.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to notices published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a success notice. Never blocks; a closed channel is ignored.
    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    /// Publish an error notice. Never blocks; a closed channel is ignored.
    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        tracing::debug!(?level, %message, "notice");
        let _ = self.tx.send(Notice { level, message });
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_notices_in_order() {
        let notices = Notices::new();
        let mut rx = notices.subscribe();

        notices.success("Logged in successfully");
        notices.error("Network error: request timed out");

        let first = rx.try_recv().expect("first notice");
        assert_eq!(first.level, NoticeLevel::Success);
        assert_eq!(first.message, "Logged in successfully");

        let second = rx.try_recv().expect("second notice");
        assert_eq!(second.level, NoticeLevel::Error);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let notices = Notices::new();
        notices.success("nobody is listening");
    }
}
