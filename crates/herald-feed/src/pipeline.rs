//! Producer and delivery-bridge tasks plus the shutdown coordinator.
//!
//! ```text
//! ┌──────────┐ publish ┌─────────┐  recv  ┌──────────┐ push ┌──────┐
//! │ producer │────────▶│ backend │───────▶│  bridge  │─────▶│ feed │
//! └──────────┘         └─────────┘        └──────────┘      └──────┘
//!       ▲                                      ▲
//!       └────────── cancellation token ────────┘
//! ```
//!
//! Each task owns its endpoint for its whole life and hands it back
//! through its join handle. The coordinator closes endpoints strictly
//! after the join barrier, so no handle is destroyed while a task could
//! still touch it.
//!
//! Cancellation is cooperative: the producer parks on its ticker, the
//! bridge on a bounded-wait receive, and both select against the shared
//! token, so cancellation latency is capped by one tick or poll
//! interval. A task still running past the shutdown grace is the one
//! error this module escalates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use herald_backend::{BackendError, BackendPublisher, BackendSubscriber};
use herald_core::message::now_millis;
use herald_core::Message;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::feed::Feed;
use crate::metrics;

/// Timing and naming knobs of the two tasks.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Text prepended to the running sequence number.
    pub prefix: String,
    /// Publish cadence.
    pub interval: Duration,
    /// Bounded wait per receive.
    pub poll: Duration,
    /// Join-barrier grace after cancellation.
    pub grace: Duration,
}

/// A running producer/bridge pair around one backend selection.
pub struct Pipeline {
    cancel: CancellationToken,
    producer: JoinHandle<BackendPublisher>,
    bridge: JoinHandle<BackendSubscriber>,
    grace: Duration,
}

impl Pipeline {
    /// Spawn both tasks around an already-selected backend pair.
    #[must_use]
    pub fn start(
        publisher: BackendPublisher,
        subscriber: BackendSubscriber,
        feed: Arc<Feed>,
        config: PipelineConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let producer = tokio::spawn(producer_task(
            publisher,
            config.prefix,
            config.interval,
            cancel.clone(),
        ));
        let bridge = tokio::spawn(bridge_task(subscriber, feed, config.poll, cancel.clone()));

        info!("Pipeline started");
        Self {
            cancel,
            producer,
            bridge,
            grace: config.grace,
        }
    }

    /// Cancel both tasks, await the join barrier under the grace bound,
    /// then close the endpoints they hand back.
    ///
    /// # Errors
    ///
    /// Returns an error when a task panicked or is still running once
    /// the grace expires; a task ignoring cancellation that long has
    /// broken the bounded-wait rule and the process should not pretend
    /// otherwise.
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            cancel,
            producer,
            bridge,
            grace,
        } = self;

        info!("Stopping pipeline");
        cancel.cancel();

        let joined = tokio::time::timeout(grace, async { tokio::join!(producer, bridge) }).await;
        let (producer, bridge) = match joined {
            Ok(pair) => pair,
            Err(_) => bail!(
                "producer and delivery bridge did not stop within the {}ms shutdown grace",
                grace.as_millis()
            ),
        };

        // Join barrier passed; the endpoints have no remaining users.
        let mut publisher = producer.context("producer task panicked")?;
        let mut subscriber = bridge.context("delivery bridge task panicked")?;
        if let Err(err) = publisher.close() {
            warn!(error = %err, "Failed to close publisher");
        }
        if let Err(err) = subscriber.close() {
            warn!(error = %err, "Failed to close subscriber");
        }

        info!("Pipeline stopped");
        Ok(())
    }
}

/// Tick loop publishing `"{prefix} #{seq}"` until cancelled.
///
/// Publish failures are logged and skipped (at-most-once); only
/// [`BackendError::NotAvailable`] stops the loop early, since it means
/// the endpoint contract was broken.
async fn producer_task(
    mut publisher: BackendPublisher,
    prefix: String,
    interval: Duration,
    cancel: CancellationToken,
) -> BackendPublisher {
    // First tick after one full interval, matching the cadence of the
    // ticks that follow.
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq: u64 = 0;

    debug!(
        backend = %publisher.kind(),
        interval_ms = interval.as_millis() as u64,
        "Producer started"
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                seq += 1;
                let message = Message::new(format!("{prefix} #{seq}"));
                let bytes = message.content.len();
                match publisher.publish(&message) {
                    Ok(()) => {
                        metrics::record_published(bytes);
                        debug!(seq, "Published");
                    }
                    Err(BackendError::NotAvailable) => {
                        metrics::record_error("publish");
                        error!("Publisher endpoint not available; stopping producer");
                        break;
                    }
                    Err(err) => {
                        metrics::record_error("publish");
                        warn!(seq, error = %err, "Publish failed");
                    }
                }
            }
        }
    }

    debug!(last_seq = seq, "Producer stopped");
    publisher
}

/// Bounded-wait receive loop forwarding messages into the feed until
/// cancelled.
///
/// An empty poll just loops (that is the cancellation check); receive
/// failures are logged and survived. As in the producer, only
/// [`BackendError::NotAvailable`] stops the loop early.
async fn bridge_task(
    mut subscriber: BackendSubscriber,
    feed: Arc<Feed>,
    poll: Duration,
    cancel: CancellationToken,
) -> BackendSubscriber {
    debug!(
        backend = %subscriber.kind(),
        poll_ms = poll.as_millis() as u64,
        "Delivery bridge started"
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            received = subscriber.recv(poll) => {
                match received {
                    Ok(Some(message)) => {
                        let age_ms = message.age_millis(now_millis()).max(0);
                        metrics::record_delivered(message.content.len());
                        metrics::record_delivery_latency(age_ms as f64 / 1_000.0);
                        debug!(content = %message.content, age_ms, "Delivered");
                        feed.push(message);
                        metrics::set_feed_depth(feed.len());
                    }
                    // Poll expired with no data; loop to re-check the token.
                    Ok(None) => {}
                    Err(BackendError::NotAvailable) => {
                        metrics::record_error("receive");
                        error!("Subscriber endpoint not available; stopping delivery bridge");
                        break;
                    }
                    Err(err) => {
                        metrics::record_error("receive");
                        warn!(error = %err, "Receive failed");
                    }
                }
            }
        }
    }

    debug!(delivered = feed.total_delivered(), "Delivery bridge stopped");
    subscriber
}
