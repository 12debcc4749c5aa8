//! One-shot backend selection.
//!
//! Runs once at startup, before any task exists: try to bring up a
//! native publisher/subscriber pair, and if any part of that fails,
//! fall back to an in-process [`MockHub`] pair on the same topic. The
//! decision is never revisited mid-run; a backend that dies later
//! surfaces as per-call errors, not as a new selection.
//!
//! Fallback must not leak: when the publisher chain comes up but the
//! subscriber chain fails, the publisher is closed before the mock
//! pair is built.

use std::sync::Arc;
use std::time::Duration;

use herald_core::log::DEFAULT_LOG_CAPACITY;
use tracing::{info, warn};

use crate::dds::{DdsPublisher, DdsSubscriber, MiddlewareApi, NativeApi};
use crate::endpoint::{BackendError, BackendKind, BackendPublisher, BackendSubscriber};
use crate::mock::MockHub;

/// Parameters for bringing up one publisher/subscriber pair.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Topic both endpoints bind to.
    pub topic: String,
    /// Native domain id.
    pub domain: u32,
    /// Bounded wait per native take; also the teardown latency bound.
    pub poll: Duration,
    /// Retention cap of the mock log when selection falls back.
    pub mock_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            topic: "hello_topic".to_string(),
            domain: 0,
            poll: Duration::from_millis(100),
            mock_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// What selection produced, and why.
pub struct Selection {
    pub publisher: BackendPublisher,
    pub subscriber: BackendSubscriber,
    pub kind: BackendKind,
    /// The create error that forced the mock fallback, if any.
    pub fallback_reason: Option<BackendError>,
}

/// Select a backend against the process-wide native middleware.
///
/// Never fails: the mock fallback is always constructible.
#[must_use]
pub fn select_backend(config: &BackendConfig) -> Selection {
    select_backend_with(Arc::new(MiddlewareApi::new()), config)
}

/// Select a backend against an explicit native surface.
///
/// Split out from [`select_backend`] so tests can script the native
/// side of the decision.
#[must_use]
pub fn select_backend_with(api: Arc<dyn NativeApi>, config: &BackendConfig) -> Selection {
    match native_pair(api, config) {
        Ok((publisher, subscriber)) => {
            info!(
                topic = %config.topic,
                domain = config.domain,
                "Selected DDS backend"
            );
            Selection {
                publisher: BackendPublisher::Dds(publisher),
                subscriber: BackendSubscriber::Dds(subscriber),
                kind: BackendKind::Dds,
                fallback_reason: None,
            }
        }
        Err(err) => {
            warn!(
                topic = %config.topic,
                error = %err,
                "DDS backend unavailable; falling back to in-process mock"
            );
            let hub = MockHub::with_capacity(config.topic.clone(), config.mock_capacity);
            Selection {
                publisher: BackendPublisher::Mock(hub.publisher()),
                subscriber: BackendSubscriber::Mock(hub.subscriber()),
                kind: BackendKind::Mock,
                fallback_reason: Some(err),
            }
        }
    }
}

fn native_pair(
    api: Arc<dyn NativeApi>,
    config: &BackendConfig,
) -> Result<(DdsPublisher, DdsSubscriber), BackendError> {
    let mut publisher = DdsPublisher::create(Arc::clone(&api), config.domain, &config.topic)?;
    match DdsSubscriber::create(api, config.domain, &config.topic, config.poll) {
        Ok(subscriber) => Ok((publisher, subscriber)),
        Err(err) => {
            // Half a pair is useless; tear the publisher down before
            // reporting the failure that forces the fallback.
            let _ = publisher.close();
            Err(err)
        }
    }
}
