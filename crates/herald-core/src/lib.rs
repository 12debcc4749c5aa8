//! # herald-core
//!
//! Core types and the in-process topic log for the Herald relay.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Message** - Timestamped text payload
//! - **Topic** - Topic name validation shared by every backend
//! - **TopicLog** - Bounded append-only fan-out log with per-reader cursors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Publisher  │────▶│  TopicLog   │────▶│  LogCursor  │ (one per reader)
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```

pub mod log;
pub mod message;
pub mod topic;

pub use log::{Lagged, LogCursor, ReadOutcome, TopicLog};
pub use message::Message;
pub use topic::{validate_topic_name, MAX_TOPIC_NAME_LENGTH};
