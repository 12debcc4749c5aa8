//! # herald-wire
//!
//! Wire format for samples crossing the Herald middleware boundary.
//!
//! The native middleware exchanges fixed-layout records, not a
//! self-describing format: a NUL-padded content field followed by a
//! little-endian timestamp. This crate owns that layout so the FFI
//! binding and its tests agree on a single record shape.
//!
//! ## Record layout
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────┐
//! │ content: 256 bytes, NUL-pad  │ timestamp_ms: i64 LE │
//! └──────────────────────────────┴──────────────────────┘
//!   264 bytes total, content always NUL-terminated
//! ```
//!
//! ## Example
//!
//! ```rust
//! use herald_wire::{codec, Sample};
//!
//! let sample = Sample::new("Hello World #1", 1_700_000_000_000);
//!
//! let record = codec::encode(&sample);
//! assert_eq!(record.len(), codec::SAMPLE_RECORD_SIZE);
//!
//! let decoded = codec::decode(&record).unwrap();
//! assert_eq!(decoded, sample);
//! ```

pub mod codec;
pub mod sample;

pub use codec::{decode, encode, WireError, MAX_CONTENT_LENGTH, SAMPLE_RECORD_SIZE};
pub use sample::Sample;
