//! # herald-backend
//!
//! Backend abstraction layer for the Herald relay.
//!
//! This crate provides a unified publish/subscribe interface over two
//! interchangeable backends:
//!
//! - **DDS** - The native middleware, reached over an FFI shim
//! - **Mock** - An in-process fan-out log, used when the middleware is
//!   unavailable
//!
//! ## Backend selection
//!
//! [`select_backend`] tries the DDS pair once at startup and falls back
//! to the mock pair on any failure, recording the reason. Code past the
//! selection point only sees [`BackendPublisher`] and
//! [`BackendSubscriber`] and never branches on which backend is live.
//!
//! ```rust
//! use herald_backend::{select_backend, BackendConfig};
//! use herald_core::Message;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut selection = select_backend(&BackendConfig::default());
//!
//! selection
//!     .publisher
//!     .publish(&Message::new("Hello World #1"))
//!     .unwrap();
//! # }
//! ```

pub mod dds;
pub mod endpoint;
pub mod mock;
pub mod select;

pub use endpoint::{BackendError, BackendKind, BackendPublisher, BackendSubscriber};
pub use mock::MockHub;
pub use select::{select_backend, select_backend_with, BackendConfig, Selection};
