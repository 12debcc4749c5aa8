//! In-process mock backend.
//!
//! Used when the native middleware cannot be reached. A [`MockHub`]
//! owns one topic's fan-out log and mints publishers and subscribers
//! over it; construction cannot fail, which is what makes the hub a
//! safe fallback target.
//!
//! Unlike a broadcast channel, the log-with-cursors shape decouples
//! the publisher from the number of subscribers and gives each
//! subscriber its own pace. The flip side is deliberate: a subscriber
//! created after messages were appended starts at the tail and never
//! sees them. That mirrors a volatile middleware reader joining late
//! and is part of the mock's contract, not a defect.

use std::sync::Arc;
use std::time::Duration;

use herald_core::{log::DEFAULT_LOG_CAPACITY, LogCursor, Message, TopicLog};
use tracing::{debug, trace};

use crate::endpoint::BackendError;

/// Shared per-topic state of the mock backend.
pub struct MockHub {
    topic: String,
    log: Arc<TopicLog>,
}

impl MockHub {
    /// Create a hub retaining up to [`DEFAULT_LOG_CAPACITY`] messages.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_capacity(topic, DEFAULT_LOG_CAPACITY)
    }

    /// Create a hub retaining up to `capacity` messages.
    ///
    /// The cap bounds memory under a slow or absent subscriber; a
    /// cursor that falls behind it is told how much it missed rather
    /// than silently skipped ahead.
    #[must_use]
    pub fn with_capacity(topic: impl Into<String>, capacity: usize) -> Self {
        let topic = topic.into();
        debug!(topic = %topic, capacity, "Creating mock hub");
        Self {
            topic,
            log: Arc::new(TopicLog::with_capacity(capacity)),
        }
    }

    /// The topic this hub serves.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Mint a publisher bound to this hub's topic.
    #[must_use]
    pub fn publisher(&self) -> MockPublisher {
        MockPublisher {
            topic: self.topic.clone(),
            log: Arc::clone(&self.log),
            closed: false,
        }
    }

    /// Mint a subscriber positioned at the log's current tail.
    ///
    /// The subscriber only observes messages published after this
    /// call; earlier history is intentionally out of reach.
    #[must_use]
    pub fn subscriber(&self) -> MockSubscriber {
        MockSubscriber {
            topic: self.topic.clone(),
            cursor: self.log.cursor(),
            closed: false,
        }
    }
}

/// Mock publishing endpoint: appends to the shared log.
pub struct MockPublisher {
    topic: String,
    log: Arc<TopicLog>,
    closed: bool,
}

impl MockPublisher {
    /// Append a message to the topic log.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotAvailable`] after close; publishing
    /// itself cannot fail.
    pub fn publish(&mut self, message: &Message) -> Result<(), BackendError> {
        if self.closed {
            return Err(BackendError::NotAvailable);
        }
        let seq = self.log.append(message.clone());
        trace!(topic = %self.topic, seq, "Mock publish");
        Ok(())
    }

    /// Mark the publisher closed. Idempotent.
    ///
    /// # Errors
    ///
    /// Infallible for the mock.
    pub fn close(&mut self) -> Result<(), BackendError> {
        self.closed = true;
        Ok(())
    }

    /// The topic this publisher is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Mock subscribing endpoint: a private cursor over the shared log.
pub struct MockSubscriber {
    topic: String,
    cursor: LogCursor,
    closed: bool,
}

impl MockSubscriber {
    /// Pull the next message, waiting up to `wait` for one to arrive.
    ///
    /// Returns `Ok(None)` when nothing arrived within `wait`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ReceiveFailed`] once when the cursor
    /// lagged past the log's retention window (delivery then resumes
    /// from the oldest retained message) and
    /// [`BackendError::NotAvailable`] after close.
    pub async fn recv(&mut self, wait: Duration) -> Result<Option<Arc<Message>>, BackendError> {
        if self.closed {
            return Err(BackendError::NotAvailable);
        }
        match self.cursor.next_within(wait).await {
            Ok(message) => Ok(message),
            Err(lagged) => Err(BackendError::ReceiveFailed(format!(
                "subscriber lagged: {} messages evicted before they were read",
                lagged.missed
            ))),
        }
    }

    /// Mark the subscriber closed. Idempotent.
    ///
    /// # Errors
    ///
    /// Infallible for the mock.
    pub fn close(&mut self) -> Result<(), BackendError> {
        self.closed = true;
        Ok(())
    }

    /// The topic this subscriber is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_receive_in_order() {
        let hub = MockHub::new("hello_topic");
        let mut publisher = hub.publisher();
        let mut subscriber = hub.subscriber();

        for i in 1..=5 {
            publisher
                .publish(&Message::new(format!("Hello World #{i}")))
                .unwrap();
        }

        for i in 1..=5 {
            let message = subscriber
                .recv(Duration::from_millis(100))
                .await
                .unwrap()
                .expect("message should be waiting");
            assert_eq!(message.content, format!("Hello World #{i}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_times_out_when_idle() {
        let hub = MockHub::new("quiet_topic");
        let mut subscriber = hub.subscriber();

        let outcome = subscriber.recv(Duration::from_millis(100)).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_no_history() {
        let hub = MockHub::new("hello_topic");
        let mut publisher = hub.publisher();

        publisher.publish(&Message::new("before")).unwrap();

        let mut late = hub.subscriber();
        assert!(late
            .recv(Duration::from_millis(10))
            .await
            .unwrap()
            .is_none());

        publisher.publish(&Message::new("after")).unwrap();
        let message = late
            .recv(Duration::from_millis(100))
            .await
            .unwrap()
            .expect("late subscriber sees new messages");
        assert_eq!(message.content, "after");
    }

    #[tokio::test]
    async fn test_two_subscribers_each_receive_everything() {
        let hub = MockHub::new("hello_topic");
        let mut publisher = hub.publisher();
        let mut first = hub.subscriber();
        let mut second = hub.subscriber();

        for i in 1..=5 {
            publisher
                .publish(&Message::new(format!("Hello World #{i}")))
                .unwrap();
        }

        for subscriber in [&mut first, &mut second] {
            for i in 1..=5 {
                let message = subscriber
                    .recv(Duration::from_millis(100))
                    .await
                    .unwrap()
                    .expect("both subscribers see every message");
                assert_eq!(message.content, format!("Hello World #{i}"));
            }
        }
    }

    #[tokio::test]
    async fn test_lag_is_reported_once_then_resumes() {
        let hub = MockHub::with_capacity("small_topic", 2);
        let mut publisher = hub.publisher();
        let mut subscriber = hub.subscriber();

        for i in 0..5 {
            publisher.publish(&Message::new(format!("msg {i}"))).unwrap();
        }

        // Messages 0..=2 were evicted by the time the cursor reads.
        let lagged = subscriber.recv(Duration::from_millis(10)).await;
        assert!(matches!(lagged, Err(BackendError::ReceiveFailed(_))));

        let resumed = subscriber
            .recv(Duration::from_millis(100))
            .await
            .unwrap()
            .expect("delivery resumes from the oldest retained message");
        assert_eq!(resumed.content, "msg 3");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_fences_use() {
        let hub = MockHub::new("hello_topic");
        let mut publisher = hub.publisher();
        let mut subscriber = hub.subscriber();

        publisher.close().unwrap();
        publisher.close().unwrap();
        subscriber.close().unwrap();
        subscriber.close().unwrap();

        assert!(matches!(
            publisher.publish(&Message::new("too late")),
            Err(BackendError::NotAvailable)
        ));
        assert!(matches!(
            subscriber.recv(Duration::from_millis(10)).await,
            Err(BackendError::NotAvailable)
        ));
    }
}
