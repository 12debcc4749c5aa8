//! Backend endpoint facade.
//!
//! [`BackendPublisher`] and [`BackendSubscriber`] wrap the two backend
//! implementations behind one uniform surface. They are enums rather
//! than trait objects: selection happens exactly once at startup, the
//! set of backends is closed, and exhaustive matching keeps dispatch
//! static.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use herald_core::Message;
use herald_wire::WireError;
use thiserror::Error;

use crate::dds::{DdsPublisher, DdsSubscriber};
use crate::mock::{MockPublisher, MockSubscriber};

/// Backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend construction failed. Triggers fallback at startup;
    /// never occurs mid-run.
    #[error("Create failed: {0}")]
    CreateFailed(String),

    /// The transport rejected a publish.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// A receive poll failed.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The endpoint was used after close. A contract violation by the
    /// caller, not a transport condition.
    #[error("Endpoint no longer available")]
    NotAvailable,

    /// A record violated the fixed wire layout.
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),
}

/// Which backend a selection landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The native DDS middleware.
    Dds,
    /// The in-process mock.
    Mock,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Dds => write!(f, "dds"),
            BackendKind::Mock => write!(f, "mock"),
        }
    }
}

/// The publishing half of a backend pair.
pub enum BackendPublisher {
    /// Native middleware writer.
    Dds(DdsPublisher),
    /// In-process log appender.
    Mock(MockPublisher),
}

impl BackendPublisher {
    /// Publish a message on the bound topic.
    ///
    /// The message becomes visible to every subscriber bound to the
    /// same topic at some point after this returns; ordering is only
    /// guaranteed relative to this publisher's other messages.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::PublishFailed`] when the transport
    /// rejects the message and [`BackendError::NotAvailable`] after
    /// [`close`](Self::close).
    pub fn publish(&mut self, message: &Message) -> Result<(), BackendError> {
        match self {
            BackendPublisher::Dds(publisher) => publisher.publish(message),
            BackendPublisher::Mock(publisher) => publisher.publish(message),
        }
    }

    /// Release backend resources. Idempotent.
    ///
    /// # Errors
    ///
    /// Currently infallible for both backends; the `Result` keeps the
    /// contract open for transports whose teardown can fail.
    pub fn close(&mut self) -> Result<(), BackendError> {
        match self {
            BackendPublisher::Dds(publisher) => publisher.close(),
            BackendPublisher::Mock(publisher) => publisher.close(),
        }
    }

    /// Which backend this publisher runs on.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendPublisher::Dds(_) => BackendKind::Dds,
            BackendPublisher::Mock(_) => BackendKind::Mock,
        }
    }

    /// The topic this publisher is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        match self {
            BackendPublisher::Dds(publisher) => publisher.topic(),
            BackendPublisher::Mock(publisher) => publisher.topic(),
        }
    }
}

/// The subscribing half of a backend pair.
///
/// Each subscriber owns an independent read position: messages are not
/// consumed away from other subscribers on the same topic, and a
/// subscriber created after a message was published never sees it.
pub enum BackendSubscriber {
    /// Native middleware reader.
    Dds(DdsSubscriber),
    /// In-process log cursor.
    Mock(MockSubscriber),
}

impl BackendSubscriber {
    /// Pull the next message, waiting up to `wait` for one to arrive.
    ///
    /// Returns `Ok(None)` when nothing arrived within `wait`. The
    /// bounded wait is what makes the pull cancellable: a caller
    /// re-checks its shutdown signal between polls.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ReceiveFailed`] on transport errors
    /// (including a lagging mock cursor, reported once) and
    /// [`BackendError::NotAvailable`] after [`close`](Self::close).
    pub async fn recv(&mut self, wait: Duration) -> Result<Option<Arc<Message>>, BackendError> {
        match self {
            BackendSubscriber::Dds(subscriber) => subscriber.recv(wait).await,
            BackendSubscriber::Mock(subscriber) => subscriber.recv(wait).await,
        }
    }

    /// Release backend resources. Idempotent, never blocks beyond the
    /// backend's poll interval.
    ///
    /// # Errors
    ///
    /// Currently infallible for both backends; the `Result` keeps the
    /// contract open for transports whose teardown can fail.
    pub fn close(&mut self) -> Result<(), BackendError> {
        match self {
            BackendSubscriber::Dds(subscriber) => subscriber.close(),
            BackendSubscriber::Mock(subscriber) => subscriber.close(),
        }
    }

    /// Which backend this subscriber runs on.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSubscriber::Dds(_) => BackendKind::Dds,
            BackendSubscriber::Mock(_) => BackendKind::Mock,
        }
    }

    /// The topic this subscriber is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        match self {
            BackendSubscriber::Dds(subscriber) => subscriber.topic(),
            BackendSubscriber::Mock(subscriber) => subscriber.topic(),
        }
    }
}
