//! The consumer-facing feed.
//!
//! A capacity-bounded window over delivered messages. The delivery
//! bridge pushes into it; a display layer reads `snapshot`. Retention
//! here is presentation policy: the feed forgetting a message says
//! nothing about whether the backend delivered it, which is what
//! `total_delivered` tracks.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use herald_core::Message;

/// Delivered messages the feed keeps by default.
pub const DEFAULT_FEED_RETENTION: usize = 20;

/// Bounded window of delivered messages plus a running total.
pub struct Feed {
    inner: Mutex<FeedInner>,
    retain: usize,
}

struct FeedInner {
    window: VecDeque<Arc<Message>>,
    total: u64,
}

impl Feed {
    /// Create a feed retaining the last `retain` messages.
    #[must_use]
    pub fn new(retain: usize) -> Self {
        Self {
            inner: Mutex::new(FeedInner {
                window: VecDeque::with_capacity(retain),
                total: 0,
            }),
            retain,
        }
    }

    /// Append a delivered message, evicting the oldest once the window
    /// is full.
    pub fn push(&self, message: Arc<Message>) {
        let mut inner = self.inner.lock().unwrap();
        inner.total += 1;
        if self.retain == 0 {
            return;
        }
        if inner.window.len() == self.retain {
            inner.window.pop_front();
        }
        inner.window.push_back(message);
    }

    /// The retained window, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        let inner = self.inner.lock().unwrap();
        inner.window.iter().cloned().collect()
    }

    /// Number of messages currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.window.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages delivered over the feed's lifetime, including evicted
    /// ones.
    #[must_use]
    pub fn total_delivered(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.total
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Arc<Message> {
        Arc::new(Message::new(content))
    }

    #[test]
    fn test_feed_keeps_last_n() {
        let feed = Feed::new(3);
        for i in 1..=5 {
            feed.push(msg(&format!("Hello World #{i}")));
        }

        let window = feed.snapshot();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "Hello World #3");
        assert_eq!(window[2].content, "Hello World #5");
    }

    #[test]
    fn test_feed_counts_evicted_messages() {
        let feed = Feed::new(2);
        for i in 0..10 {
            feed.push(msg(&format!("msg {i}")));
        }

        assert_eq!(feed.len(), 2);
        assert_eq!(feed.total_delivered(), 10);
    }

    #[test]
    fn test_feed_snapshot_is_oldest_first() {
        let feed = Feed::default();
        feed.push(msg("first"));
        feed.push(msg("second"));

        let window = feed.snapshot();
        assert_eq!(window[0].content, "first");
        assert_eq!(window[1].content, "second");
    }

    #[test]
    fn test_zero_retention_still_counts() {
        let feed = Feed::new(0);
        feed.push(msg("ephemeral"));

        assert!(feed.is_empty());
        assert_eq!(feed.total_delivered(), 1);
    }
}
