use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

pub const STATUS_UPDATE_FAILED: &str = "Failed to update status.";
pub const CREATE_FAILED: &str = "Failed to create issue.";
pub const UPDATE_FAILED: &str = "Failed to update issue.";
pub const DELETE_FAILED: &str = "Failed to delete issue.";
pub const DELETED: &str = "Issue deleted successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// A short, non-blocking message for the user (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Fan-out of user notifications to whoever renders them.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Returns silently even if nobody is listening.
    pub fn notify(&self, notification: Notification) {
        debug!(level = ?notification.level, message = %notification.message, "notify");
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
