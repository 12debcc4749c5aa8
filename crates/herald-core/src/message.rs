//! The message type carried by every Herald backend.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// A timestamped text message published on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message text.
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Message {
    /// Create a new message stamped with the current time.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            created_at: now_millis(),
        }
    }

    /// Override the creation timestamp.
    ///
    /// Used when rebuilding a message received from a backend, so the
    /// publisher's timestamp survives the wire.
    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Age of the message relative to `now`, in milliseconds.
    ///
    /// Negative if `now` is before the creation time (clock skew between
    /// publisher and subscriber hosts).
    #[must_use]
    pub fn age_millis(&self, now: i64) -> i64 {
        now - self.created_at
    }
}
