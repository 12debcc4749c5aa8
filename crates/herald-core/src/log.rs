//! Bounded append-only fan-out log.
//!
//! `TopicLog` is the storage half of the in-process mock backend: a ring of
//! published messages plus a watch channel carrying the tail sequence.
//! Readers hold a [`LogCursor`] with a private position, so any number of
//! subscribers replay the same entries independently and at their own pace.
//!
//! A cursor created after messages were appended starts at the tail and
//! never sees them. A cursor that falls behind the ring's retention window
//! is told how much it missed rather than silently skipped ahead.

use crate::message::Message;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::trace;

/// Default number of retained messages.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// A cursor fell behind the log's retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lagged {
    /// Number of messages evicted before the cursor could read them.
    pub missed: u64,
}

/// Outcome of reading one sequence number from the log.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// The entry at the requested sequence.
    Ready(Arc<Message>),
    /// The sequence has not been written yet.
    NotYet,
    /// The entry was evicted; `oldest` is the first retained sequence.
    Evicted { oldest: u64 },
}

struct LogInner {
    /// Retained entries; `entries[0]` holds sequence `base`.
    entries: VecDeque<Arc<Message>>,
    /// Sequence of the oldest retained entry.
    base: u64,
}

/// A bounded, append-only message log for one topic.
///
/// Appends past the capacity evict the oldest entries.
pub struct TopicLog {
    inner: Mutex<LogInner>,
    /// Carries the tail sequence (the next sequence to be assigned).
    tail_tx: watch::Sender<u64>,
    capacity: usize,
}

impl TopicLog {
    /// Create a log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Create a log retaining up to `capacity` messages.
    ///
    /// A zero capacity is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tail_tx, _) = watch::channel(0);
        Self {
            inner: Mutex::new(LogInner {
                entries: VecDeque::new(),
                base: 0,
            }),
            tail_tx,
            capacity: capacity.max(1),
        }
    }

    /// Append a message, evicting the oldest entry if the log is full.
    ///
    /// Returns the sequence number assigned to the message.
    pub fn append(&self, message: Message) -> u64 {
        let seq = {
            let mut inner = self.inner.lock().unwrap();
            let seq = inner.base + inner.entries.len() as u64;
            inner.entries.push_back(Arc::new(message));
            if inner.entries.len() > self.capacity {
                inner.entries.pop_front();
                inner.base += 1;
            }
            seq
        };

        trace!(seq, "Appended message");
        self.tail_tx.send_replace(seq + 1);
        seq
    }

    /// Read the entry at `seq`.
    #[must_use]
    pub fn read_at(&self, seq: u64) -> ReadOutcome {
        let inner = self.inner.lock().unwrap();
        if seq < inner.base {
            return ReadOutcome::Evicted { oldest: inner.base };
        }
        let offset = (seq - inner.base) as usize;
        match inner.entries.get(offset) {
            Some(entry) => ReadOutcome::Ready(Arc::clone(entry)),
            None => ReadOutcome::NotYet,
        }
    }

    /// The next sequence number to be assigned.
    #[must_use]
    pub fn tail(&self) -> u64 {
        *self.tail_tx.borrow()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Check if the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create a cursor positioned at the current tail.
    ///
    /// The cursor only observes messages appended after this call. The
    /// position is taken under the log's lock, not from the published
    /// tail, which can lag an append by an instant.
    #[must_use]
    pub fn cursor(self: &Arc<Self>) -> LogCursor {
        let next = {
            let inner = self.inner.lock().unwrap();
            inner.base + inner.entries.len() as u64
        };
        LogCursor {
            next,
            tail_rx: self.tail_tx.subscribe(),
            log: Arc::clone(self),
        }
    }
}

impl Default for TopicLog {
    fn default() -> Self {
        Self::new()
    }
}

/// A private read position into a [`TopicLog`].
pub struct LogCursor {
    log: Arc<TopicLog>,
    /// Next sequence to read.
    next: u64,
    tail_rx: watch::Receiver<u64>,
}

impl LogCursor {
    /// Read the next message without waiting.
    ///
    /// Returns `Ok(None)` when the cursor is caught up.
    ///
    /// # Errors
    ///
    /// Returns [`Lagged`] once when entries were evicted before they could
    /// be read; the cursor then resumes at the oldest retained entry.
    pub fn try_next(&mut self) -> Result<Option<Arc<Message>>, Lagged> {
        match self.log.read_at(self.next) {
            ReadOutcome::Ready(message) => {
                self.next += 1;
                Ok(Some(message))
            }
            ReadOutcome::NotYet => Ok(None),
            ReadOutcome::Evicted { oldest } => {
                let missed = oldest - self.next;
                self.next = oldest;
                Err(Lagged { missed })
            }
        }
    }

    /// Read the next message, waiting up to `wait` for one to arrive.
    ///
    /// Returns `Ok(None)` if nothing arrived within `wait`.
    ///
    /// # Errors
    ///
    /// Returns [`Lagged`] once when entries were evicted before they could
    /// be read; the cursor then resumes at the oldest retained entry.
    pub async fn next_within(&mut self, wait: Duration) -> Result<Option<Arc<Message>>, Lagged> {
        if let Some(message) = self.try_next()? {
            return Ok(Some(message));
        }

        let target = self.next;
        match timeout(wait, self.tail_rx.wait_for(|tail| *tail > target)).await {
            Ok(Ok(_)) => {}
            // Sender dropped: nothing more will be appended.
            Ok(Err(_)) => return Ok(None),
            // Timed out.
            Err(_) => return Ok(None),
        }
        self.try_next()
    }

    /// The sequence this cursor will read next.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next
    }
}
