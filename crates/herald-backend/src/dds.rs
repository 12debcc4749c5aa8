//! Native middleware binding.
//!
//! Both endpoint types own a [`HandleChain`]: the ordered set of native
//! resources one endpoint needs, acquired front to back and destroyed
//! back to front.
//!
//! ```text
//! DdsPublisher                      DdsSubscriber
//!   participant ─ publisher          participant ─ subscriber
//!        └─ topic ─ writer                └─ topic ─ reader
//!                                              │
//!                                     reader thread (std)
//!                                     take ─▶ decode ─▶ mpsc
//! ```
//!
//! The chain never moves backwards except through [`HandleChain::unwind`],
//! and `Destroyed` absorbs every later call. All native calls go through
//! the [`NativeApi`] trait; the `dds` cargo feature selects the real
//! `extern "C"` shim, and without it [`MiddlewareApi`] fails every
//! create so selection falls back to the mock.
//!
//! Receiving is a blocking native `take` with a millisecond timeout. It
//! runs on a dedicated OS thread so it cannot stall the async runtime;
//! decoded samples cross into async land through a bounded channel. The
//! thread re-checks its stop flag after every bounded take, which caps
//! teardown latency at one poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use herald_core::Message;
use herald_wire::{Sample, SAMPLE_RECORD_SIZE};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use crate::endpoint::BackendError;

/// Opaque native resource handle.
///
/// The shim deals in raw pointers; everything above it deals in this
/// alias so handles stay `Send` and test fakes can mint them freely.
pub type NativeHandle = usize;

/// Native status: call succeeded.
pub const NATIVE_OK: i32 = 0;
/// Native status: bounded take expired with nothing to read.
pub const NATIVE_NO_DATA: i32 = 1;

/// Capacity of the reader-thread → subscriber channel. When the async
/// side falls this far behind, further samples are dropped (at-most-once).
const RECV_QUEUE_DEPTH: usize = 100;

/// The granular native surface.
///
/// One method per shim call. Create operations return a handle or a
/// human-readable reason; destroy operations cannot fail. `write` and
/// `take` return raw native statuses ([`NATIVE_OK`], [`NATIVE_NO_DATA`],
/// negative on error).
pub trait NativeApi: Send + Sync {
    fn participant_create(&self, domain: u32) -> Result<NativeHandle, String>;
    fn participant_destroy(&self, participant: NativeHandle);
    fn publisher_create(&self, participant: NativeHandle) -> Result<NativeHandle, String>;
    fn publisher_destroy(&self, publisher: NativeHandle);
    fn subscriber_create(&self, participant: NativeHandle) -> Result<NativeHandle, String>;
    fn subscriber_destroy(&self, subscriber: NativeHandle);
    fn topic_create(&self, participant: NativeHandle, name: &str) -> Result<NativeHandle, String>;
    fn topic_destroy(&self, topic: NativeHandle);
    fn writer_create(&self, publisher: NativeHandle, topic: NativeHandle)
        -> Result<NativeHandle, String>;
    fn writer_destroy(&self, writer: NativeHandle);
    fn write(&self, writer: NativeHandle, record: &[u8]) -> i32;
    fn reader_create(&self, subscriber: NativeHandle, topic: NativeHandle)
        -> Result<NativeHandle, String>;
    fn reader_destroy(&self, reader: NativeHandle);
    fn take(&self, reader: NativeHandle, record: &mut [u8], timeout_ms: u32) -> i32;
}

/// Lifecycle of one endpoint's handle chain. Forward-only; `Destroyed`
/// is terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Uninitialized,
    ParticipantCreated,
    TopicBound,
    Active,
    Destroyed,
}

/// Which side of the topic the chain serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Writer,
    Reader,
}

/// Ordered native resources of one endpoint.
///
/// Acquisition order is participant → entity (publisher or subscriber)
/// → topic → io (writer or reader); teardown is the strict reverse.
/// A failure partway through `acquire` unwinds whatever was created so
/// far before the error is reported, so no handle leaks.
struct HandleChain {
    api: Arc<dyn NativeApi>,
    role: Role,
    state: EndpointState,
    participant: Option<NativeHandle>,
    entity: Option<NativeHandle>,
    topic: Option<NativeHandle>,
    io: Option<NativeHandle>,
}

impl HandleChain {
    fn acquire(
        api: Arc<dyn NativeApi>,
        role: Role,
        domain: u32,
        topic_name: &str,
    ) -> Result<Self, BackendError> {
        let mut chain = Self {
            api,
            role,
            state: EndpointState::Uninitialized,
            participant: None,
            entity: None,
            topic: None,
            io: None,
        };
        if let Err(reason) = chain.acquire_forward(domain, topic_name) {
            chain.unwind();
            return Err(BackendError::CreateFailed(reason));
        }
        Ok(chain)
    }

    fn acquire_forward(&mut self, domain: u32, topic_name: &str) -> Result<(), String> {
        let participant = self.api.participant_create(domain)?;
        self.participant = Some(participant);
        self.state = EndpointState::ParticipantCreated;

        let entity = match self.role {
            Role::Writer => self.api.publisher_create(participant)?,
            Role::Reader => self.api.subscriber_create(participant)?,
        };
        self.entity = Some(entity);

        let topic = self.api.topic_create(participant, topic_name)?;
        self.topic = Some(topic);
        self.state = EndpointState::TopicBound;

        let io = match self.role {
            Role::Writer => self.api.writer_create(entity, topic)?,
            Role::Reader => self.api.reader_create(entity, topic)?,
        };
        self.io = Some(io);
        self.state = EndpointState::Active;
        Ok(())
    }

    /// Destroy every held handle in reverse acquisition order.
    ///
    /// Safe to call at any state, any number of times; after the first
    /// call the chain is `Destroyed` and this is a no-op.
    fn unwind(&mut self) {
        if self.state == EndpointState::Destroyed {
            return;
        }
        if let Some(io) = self.io.take() {
            match self.role {
                Role::Writer => self.api.writer_destroy(io),
                Role::Reader => self.api.reader_destroy(io),
            }
        }
        if let Some(topic) = self.topic.take() {
            self.api.topic_destroy(topic);
        }
        if let Some(entity) = self.entity.take() {
            match self.role {
                Role::Writer => self.api.publisher_destroy(entity),
                Role::Reader => self.api.subscriber_destroy(entity),
            }
        }
        if let Some(participant) = self.participant.take() {
            self.api.participant_destroy(participant);
        }
        self.state = EndpointState::Destroyed;
    }
}

impl Drop for HandleChain {
    fn drop(&mut self) {
        self.unwind();
    }
}

/// Publishing endpoint over the native middleware.
pub struct DdsPublisher {
    topic: String,
    chain: HandleChain,
}

impl DdsPublisher {
    /// Acquire the writer-side handle chain on `topic` in `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CreateFailed`] when any native create
    /// fails; everything acquired before the failure is destroyed.
    pub fn create(
        api: Arc<dyn NativeApi>,
        domain: u32,
        topic: &str,
    ) -> Result<Self, BackendError> {
        let chain = HandleChain::acquire(api, Role::Writer, domain, topic)?;
        debug!(topic, domain, "Created native publisher");
        Ok(Self {
            topic: topic.to_string(),
            chain,
        })
    }

    /// Encode the message as a wire record and hand it to the native
    /// writer. Blocking, but short: the native write returns a status
    /// rather than waiting for acknowledgements.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::PublishFailed`] with the native status
    /// when the write is rejected, [`BackendError::NotAvailable`]
    /// after close.
    pub fn publish(&mut self, message: &Message) -> Result<(), BackendError> {
        let Some(writer) = self.chain.io else {
            return Err(BackendError::NotAvailable);
        };
        let sample = Sample::new(message.content.as_str(), message.created_at);
        let record = herald_wire::encode(&sample);
        let status = self.chain.api.write(writer, &record);
        if status != NATIVE_OK {
            return Err(BackendError::PublishFailed(format!(
                "native write returned status {status}"
            )));
        }
        trace!(topic = %self.topic, "Native publish");
        Ok(())
    }

    /// Destroy the handle chain. Idempotent.
    ///
    /// # Errors
    ///
    /// Infallible; destroys cannot fail on the native surface.
    pub fn close(&mut self) -> Result<(), BackendError> {
        self.chain.unwind();
        Ok(())
    }

    /// The topic this publisher is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Subscribing endpoint over the native middleware.
///
/// Owns the reader-side handle chain plus the reader thread that pumps
/// bounded takes into an async channel. [`DdsSubscriber::close`] stops
/// the thread, joins it, and only then destroys the chain, so the
/// thread can never touch a dead handle.
pub struct DdsSubscriber {
    topic: String,
    chain: HandleChain,
    rx: mpsc::Receiver<Arc<Message>>,
    stop: Arc<AtomicBool>,
    reader_thread: Option<thread::JoinHandle<()>>,
}

impl DdsSubscriber {
    /// Acquire the reader-side handle chain and start the reader
    /// thread. `poll` bounds each native take, which also bounds how
    /// long close can need to stop the thread.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CreateFailed`] when a native create or
    /// the thread spawn fails; partial acquisitions are unwound.
    pub fn create(
        api: Arc<dyn NativeApi>,
        domain: u32,
        topic: &str,
        poll: Duration,
    ) -> Result<Self, BackendError> {
        let mut chain = HandleChain::acquire(Arc::clone(&api), Role::Reader, domain, topic)?;
        let Some(reader) = chain.io else {
            chain.unwind();
            return Err(BackendError::CreateFailed(
                "no reader handle after acquisition".to_string(),
            ));
        };

        let (tx, rx) = mpsc::channel(RECV_QUEUE_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name("herald-dds-reader".to_string())
            .spawn(move || reader_loop(api, reader, thread_stop, tx, poll));
        let reader_thread = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                chain.unwind();
                return Err(BackendError::CreateFailed(format!(
                    "failed to spawn reader thread: {err}"
                )));
            }
        };

        debug!(topic, domain, "Created native subscriber");
        Ok(Self {
            topic: topic.to_string(),
            chain,
            rx,
            stop,
            reader_thread: Some(reader_thread),
        })
    }

    /// Pull the next decoded message, waiting up to `wait`.
    ///
    /// Returns `Ok(None)` when nothing arrived within `wait`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ReceiveFailed`] if the reader thread has
    /// stopped, [`BackendError::NotAvailable`] after close.
    pub async fn recv(&mut self, wait: Duration) -> Result<Option<Arc<Message>>, BackendError> {
        if self.chain.state == EndpointState::Destroyed {
            return Err(BackendError::NotAvailable);
        }
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(BackendError::ReceiveFailed(
                "reader thread stopped".to_string(),
            )),
            Err(_) => Ok(None),
        }
    }

    /// Stop the reader thread, join it, then destroy the handle chain.
    /// Idempotent. Blocks up to roughly one poll interval while the
    /// thread notices the stop flag.
    ///
    /// # Errors
    ///
    /// Infallible; a panicked reader thread is logged, not escalated.
    pub fn close(&mut self) -> Result<(), BackendError> {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.reader_thread.take() {
            if thread.join().is_err() {
                warn!(topic = %self.topic, "Reader thread panicked before close");
            }
        }
        self.chain.unwind();
        Ok(())
    }

    /// The topic this subscriber is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for DdsSubscriber {
    // The chain's own Drop unwinds after this body, so the thread is
    // always stopped before its reader handle dies.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.reader_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Body of the reader thread: bounded take → decode → bounded send.
fn reader_loop(
    api: Arc<dyn NativeApi>,
    reader: NativeHandle,
    stop: Arc<AtomicBool>,
    tx: mpsc::Sender<Arc<Message>>,
    poll: Duration,
) {
    let timeout_ms = poll.as_millis().min(u128::from(u32::MAX)) as u32;
    let mut record = [0u8; SAMPLE_RECORD_SIZE];

    while !stop.load(Ordering::Acquire) {
        let status = api.take(reader, &mut record, timeout_ms);
        if status == NATIVE_NO_DATA {
            continue;
        }
        if status != NATIVE_OK {
            warn!(status, "Native take failed; retrying after poll interval");
            thread::sleep(poll);
            continue;
        }
        match herald_wire::decode(&record) {
            Ok(sample) => {
                let message =
                    Arc::new(Message::new(sample.content).with_created_at(sample.timestamp_ms));
                match tx.try_send(message) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Receive queue full; dropping sample");
                    }
                    // Subscriber gone; nothing left to deliver to.
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            Err(err) => warn!(error = %err, "Discarding undecodable record"),
        }
    }
    trace!("Reader thread exiting");
}

/// The process-wide native middleware.
///
/// With the `dds` cargo feature this calls the C shim; without it every
/// create fails with a fixed reason, which sends backend selection down
/// the mock path.
#[derive(Debug, Default)]
pub struct MiddlewareApi;

impl MiddlewareApi {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "dds")]
mod shim {
    use std::ffi::{c_char, c_int, c_uint, c_void};

    extern "C" {
        pub fn dds_participant_create(domain: c_uint) -> *mut c_void;
        pub fn dds_participant_destroy(participant: *mut c_void);
        pub fn dds_publisher_create(participant: *mut c_void) -> *mut c_void;
        pub fn dds_publisher_destroy(publisher: *mut c_void);
        pub fn dds_subscriber_create(participant: *mut c_void) -> *mut c_void;
        pub fn dds_subscriber_destroy(subscriber: *mut c_void);
        pub fn dds_topic_create(participant: *mut c_void, name: *const c_char) -> *mut c_void;
        pub fn dds_topic_destroy(topic: *mut c_void);
        pub fn dds_writer_create(publisher: *mut c_void, topic: *mut c_void) -> *mut c_void;
        pub fn dds_writer_destroy(writer: *mut c_void);
        pub fn dds_write(writer: *mut c_void, record: *const u8, len: usize) -> c_int;
        pub fn dds_reader_create(subscriber: *mut c_void, topic: *mut c_void) -> *mut c_void;
        pub fn dds_reader_destroy(reader: *mut c_void);
        pub fn dds_take(
            reader: *mut c_void,
            record: *mut u8,
            len: usize,
            timeout_ms: c_uint,
        ) -> c_int;
    }
}

#[cfg(feature = "dds")]
mod native_impl {
    use std::ffi::{c_void, CString};

    use super::{shim, MiddlewareApi, NativeApi, NativeHandle};

    fn checked(ptr: *mut c_void, what: &str) -> Result<NativeHandle, String> {
        if ptr.is_null() {
            Err(format!("{what} returned a null handle"))
        } else {
            Ok(ptr as NativeHandle)
        }
    }

    fn ptr(handle: NativeHandle) -> *mut c_void {
        handle as *mut c_void
    }

    // SAFETY throughout: handles given to destroy/write/take were minted
    // by the matching create and are destroyed exactly once; HandleChain
    // enforces both.
    impl NativeApi for MiddlewareApi {
        fn participant_create(&self, domain: u32) -> Result<NativeHandle, String> {
            checked(
                unsafe { shim::dds_participant_create(domain) },
                "dds_participant_create",
            )
        }

        fn participant_destroy(&self, participant: NativeHandle) {
            unsafe { shim::dds_participant_destroy(ptr(participant)) }
        }

        fn publisher_create(&self, participant: NativeHandle) -> Result<NativeHandle, String> {
            checked(
                unsafe { shim::dds_publisher_create(ptr(participant)) },
                "dds_publisher_create",
            )
        }

        fn publisher_destroy(&self, publisher: NativeHandle) {
            unsafe { shim::dds_publisher_destroy(ptr(publisher)) }
        }

        fn subscriber_create(&self, participant: NativeHandle) -> Result<NativeHandle, String> {
            checked(
                unsafe { shim::dds_subscriber_create(ptr(participant)) },
                "dds_subscriber_create",
            )
        }

        fn subscriber_destroy(&self, subscriber: NativeHandle) {
            unsafe { shim::dds_subscriber_destroy(ptr(subscriber)) }
        }

        fn topic_create(
            &self,
            participant: NativeHandle,
            name: &str,
        ) -> Result<NativeHandle, String> {
            let name =
                CString::new(name).map_err(|_| "topic name contains a NUL byte".to_string())?;
            checked(
                unsafe { shim::dds_topic_create(ptr(participant), name.as_ptr()) },
                "dds_topic_create",
            )
        }

        fn topic_destroy(&self, topic: NativeHandle) {
            unsafe { shim::dds_topic_destroy(ptr(topic)) }
        }

        fn writer_create(
            &self,
            publisher: NativeHandle,
            topic: NativeHandle,
        ) -> Result<NativeHandle, String> {
            checked(
                unsafe { shim::dds_writer_create(ptr(publisher), ptr(topic)) },
                "dds_writer_create",
            )
        }

        fn writer_destroy(&self, writer: NativeHandle) {
            unsafe { shim::dds_writer_destroy(ptr(writer)) }
        }

        fn write(&self, writer: NativeHandle, record: &[u8]) -> i32 {
            unsafe { shim::dds_write(ptr(writer), record.as_ptr(), record.len()) }
        }

        fn reader_create(
            &self,
            subscriber: NativeHandle,
            topic: NativeHandle,
        ) -> Result<NativeHandle, String> {
            checked(
                unsafe { shim::dds_reader_create(ptr(subscriber), ptr(topic)) },
                "dds_reader_create",
            )
        }

        fn reader_destroy(&self, reader: NativeHandle) {
            unsafe { shim::dds_reader_destroy(ptr(reader)) }
        }

        fn take(&self, reader: NativeHandle, record: &mut [u8], timeout_ms: u32) -> i32 {
            unsafe { shim::dds_take(ptr(reader), record.as_mut_ptr(), record.len(), timeout_ms) }
        }
    }
}

#[cfg(not(feature = "dds"))]
mod native_impl {
    use super::{MiddlewareApi, NativeApi, NativeHandle};

    const UNAVAILABLE: &str = "built without DDS middleware support (enable the `dds` feature)";

    impl NativeApi for MiddlewareApi {
        fn participant_create(&self, _domain: u32) -> Result<NativeHandle, String> {
            Err(UNAVAILABLE.to_string())
        }

        fn participant_destroy(&self, _participant: NativeHandle) {}

        fn publisher_create(&self, _participant: NativeHandle) -> Result<NativeHandle, String> {
            Err(UNAVAILABLE.to_string())
        }

        fn publisher_destroy(&self, _publisher: NativeHandle) {}

        fn subscriber_create(&self, _participant: NativeHandle) -> Result<NativeHandle, String> {
            Err(UNAVAILABLE.to_string())
        }

        fn subscriber_destroy(&self, _subscriber: NativeHandle) {}

        fn topic_create(
            &self,
            _participant: NativeHandle,
            _name: &str,
        ) -> Result<NativeHandle, String> {
            Err(UNAVAILABLE.to_string())
        }

        fn topic_destroy(&self, _topic: NativeHandle) {}

        fn writer_create(
            &self,
            _publisher: NativeHandle,
            _topic: NativeHandle,
        ) -> Result<NativeHandle, String> {
            Err(UNAVAILABLE.to_string())
        }

        fn writer_destroy(&self, _writer: NativeHandle) {}

        fn write(&self, _writer: NativeHandle, _record: &[u8]) -> i32 {
            -1
        }

        fn reader_create(
            &self,
            _subscriber: NativeHandle,
            _topic: NativeHandle,
        ) -> Result<NativeHandle, String> {
            Err(UNAVAILABLE.to_string())
        }

        fn reader_destroy(&self, _reader: NativeHandle) {}

        fn take(&self, _reader: NativeHandle, _record: &mut [u8], _timeout_ms: u32) -> i32 {
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;

    /// Scripted native surface recording every call it sees.
    ///
    /// Handles are minted sequentially starting at 1, so a full
    /// acquisition yields participant=1, entity=2, topic=3, io=4.
    struct ScriptedApi {
        ops: Mutex<Vec<String>>,
        next: AtomicUsize,
        fail_on: Option<&'static str>,
        write_status: i32,
        written: Mutex<Vec<Vec<u8>>>,
        inbound: Mutex<VecDeque<Vec<u8>>>,
    }

    impl ScriptedApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ops: Mutex::new(Vec::new()),
                next: AtomicUsize::new(0),
                fail_on: None,
                write_status: NATIVE_OK,
                written: Mutex::new(Vec::new()),
                inbound: Mutex::new(VecDeque::new()),
            })
        }

        fn failing_at(step: &'static str) -> Arc<Self> {
            let mut api = Self::new();
            Arc::get_mut(&mut api).unwrap().fail_on = Some(step);
            api
        }

        fn rejecting_writes(status: i32) -> Arc<Self> {
            let mut api = Self::new();
            Arc::get_mut(&mut api).unwrap().write_status = status;
            api
        }

        fn with_inbound(records: Vec<Vec<u8>>) -> Arc<Self> {
            let api = Self::new();
            *api.inbound.lock().unwrap() = records.into();
            api
        }

        fn op(&self, entry: String) {
            self.ops.lock().unwrap().push(entry);
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn step(&self, name: &'static str) -> Result<NativeHandle, String> {
            self.op(name.to_string());
            if self.fail_on == Some(name) {
                Err(format!("scripted failure at {name}"))
            } else {
                Ok(self.next.fetch_add(1, Ordering::Relaxed) + 1)
            }
        }
    }

    impl NativeApi for ScriptedApi {
        fn participant_create(&self, _domain: u32) -> Result<NativeHandle, String> {
            self.step("participant_create")
        }

        fn participant_destroy(&self, participant: NativeHandle) {
            self.op(format!("participant_destroy({participant})"));
        }

        fn publisher_create(&self, _participant: NativeHandle) -> Result<NativeHandle, String> {
            self.step("publisher_create")
        }

        fn publisher_destroy(&self, publisher: NativeHandle) {
            self.op(format!("publisher_destroy({publisher})"));
        }

        fn subscriber_create(&self, _participant: NativeHandle) -> Result<NativeHandle, String> {
            self.step("subscriber_create")
        }

        fn subscriber_destroy(&self, subscriber: NativeHandle) {
            self.op(format!("subscriber_destroy({subscriber})"));
        }

        fn topic_create(
            &self,
            _participant: NativeHandle,
            _name: &str,
        ) -> Result<NativeHandle, String> {
            self.step("topic_create")
        }

        fn topic_destroy(&self, topic: NativeHandle) {
            self.op(format!("topic_destroy({topic})"));
        }

        fn writer_create(
            &self,
            _publisher: NativeHandle,
            _topic: NativeHandle,
        ) -> Result<NativeHandle, String> {
            self.step("writer_create")
        }

        fn writer_destroy(&self, writer: NativeHandle) {
            self.op(format!("writer_destroy({writer})"));
        }

        fn write(&self, _writer: NativeHandle, record: &[u8]) -> i32 {
            self.written.lock().unwrap().push(record.to_vec());
            self.write_status
        }

        fn reader_create(
            &self,
            _subscriber: NativeHandle,
            _topic: NativeHandle,
        ) -> Result<NativeHandle, String> {
            self.step("reader_create")
        }

        fn reader_destroy(&self, reader: NativeHandle) {
            self.op(format!("reader_destroy({reader})"));
        }

        fn take(&self, _reader: NativeHandle, record: &mut [u8], timeout_ms: u32) -> i32 {
            if let Some(next) = self.inbound.lock().unwrap().pop_front() {
                record[..next.len()].copy_from_slice(&next);
                return NATIVE_OK;
            }
            thread::sleep(Duration::from_millis(u64::from(timeout_ms)));
            NATIVE_NO_DATA
        }
    }

    #[test]
    fn test_publisher_acquires_chain_in_order() {
        let api = ScriptedApi::new();
        let publisher = DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello")
            .expect("acquisition succeeds");

        assert_eq!(publisher.chain.state, EndpointState::Active);
        assert_eq!(
            api.ops(),
            vec![
                "participant_create",
                "publisher_create",
                "topic_create",
                "writer_create",
            ]
        );
    }

    #[test]
    fn test_create_failure_unwinds_partial_chain_in_reverse() {
        let api = ScriptedApi::failing_at("topic_create");
        let result = DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello");

        assert!(matches!(result, Err(BackendError::CreateFailed(_))));
        assert_eq!(
            api.ops(),
            vec![
                "participant_create",
                "publisher_create",
                "topic_create",
                "publisher_destroy(2)",
                "participant_destroy(1)",
            ]
        );
    }

    #[test]
    fn test_close_destroys_in_reverse_order() {
        let api = ScriptedApi::new();
        let mut publisher =
            DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello").unwrap();

        publisher.close().unwrap();

        assert_eq!(
            api.ops()[4..],
            [
                "writer_destroy(4)",
                "topic_destroy(3)",
                "publisher_destroy(2)",
                "participant_destroy(1)",
            ]
        );
    }

    #[test]
    fn test_double_close_destroys_each_handle_once() {
        let api = ScriptedApi::new();
        let mut publisher =
            DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello").unwrap();

        publisher.close().unwrap();
        publisher.close().unwrap();
        drop(publisher);

        let destroys = api
            .ops()
            .iter()
            .filter(|op| op.contains("destroy"))
            .count();
        assert_eq!(destroys, 4);
    }

    #[test]
    fn test_publish_after_close_is_not_available() {
        let api = ScriptedApi::new();
        let mut publisher =
            DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello").unwrap();

        publisher.close().unwrap();

        assert!(matches!(
            publisher.publish(&Message::new("too late")),
            Err(BackendError::NotAvailable)
        ));
    }

    #[test]
    fn test_publish_writes_encoded_record() {
        let api = ScriptedApi::new();
        let mut publisher =
            DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello").unwrap();

        let message = Message::new("Hello World #1").with_created_at(42);
        publisher.publish(&message).unwrap();

        let written = api.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].len(), SAMPLE_RECORD_SIZE);
        let sample = herald_wire::decode(&written[0]).unwrap();
        assert_eq!(sample.content, "Hello World #1");
        assert_eq!(sample.timestamp_ms, 42);
    }

    #[test]
    fn test_rejected_write_is_publish_failed() {
        let api = ScriptedApi::rejecting_writes(-3);
        let mut publisher =
            DdsPublisher::create(Arc::clone(&api) as Arc<dyn NativeApi>, 0, "hello").unwrap();

        let result = publisher.publish(&Message::new("hi"));
        match result {
            Err(BackendError::PublishFailed(reason)) => assert!(reason.contains("-3")),
            other => panic!("expected PublishFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscriber_delivers_decoded_records() {
        let record = herald_wire::encode(&Sample::new("Hello World #1", 7)).to_vec();
        let api = ScriptedApi::with_inbound(vec![record]);
        let mut subscriber = DdsSubscriber::create(
            Arc::clone(&api) as Arc<dyn NativeApi>,
            0,
            "hello",
            Duration::from_millis(10),
        )
        .unwrap();

        let message = subscriber
            .recv(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("reader thread forwards the record");
        assert_eq!(message.content, "Hello World #1");
        assert_eq!(message.created_at, 7);

        subscriber.close().unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_close_stops_thread_then_unwinds() {
        let api = ScriptedApi::new();
        let mut subscriber = DdsSubscriber::create(
            Arc::clone(&api) as Arc<dyn NativeApi>,
            0,
            "hello",
            Duration::from_millis(10),
        )
        .unwrap();

        subscriber.close().unwrap();
        subscriber.close().unwrap();

        assert_eq!(
            api.ops()[4..],
            [
                "reader_destroy(4)",
                "topic_destroy(3)",
                "subscriber_destroy(2)",
                "participant_destroy(1)",
            ]
        );
        assert!(matches!(
            subscriber.recv(Duration::from_millis(10)).await,
            Err(BackendError::NotAvailable)
        ));
    }

    #[cfg(not(feature = "dds"))]
    #[test]
    fn test_middleware_stub_fails_every_create() {
        let api: Arc<dyn NativeApi> = Arc::new(MiddlewareApi::new());
        match DdsPublisher::create(api, 0, "hello") {
            Err(BackendError::CreateFailed(reason)) => {
                assert!(reason.contains("without DDS middleware support"));
            }
            Err(other) => panic!("expected CreateFailed, got {other:?}"),
            Ok(_) => panic!("stub create unexpectedly succeeded"),
        }
    }
}
