//! Codec for the fixed-layout sample record.
//!
//! Every record is exactly [`SAMPLE_RECORD_SIZE`] bytes: a 256-byte
//! content field followed by an 8-byte little-endian millisecond
//! timestamp. The content field always carries a terminating NUL, so at
//! most [`MAX_CONTENT_LENGTH`] content bytes are usable.
//!
//! Encoding is a lossy boundary by design: over-long content is
//! silently truncated at a character boundary rather than rejected.
//! Decoding never trusts the peer: it stops at the first NUL and
//! converts invalid UTF-8 lossily instead of failing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::sample::Sample;

/// Size of the content field in bytes.
pub const CONTENT_FIELD_SIZE: usize = 256;

/// Size of the timestamp field in bytes.
pub const TIMESTAMP_FIELD_SIZE: usize = 8;

/// Total record size in bytes.
pub const SAMPLE_RECORD_SIZE: usize = CONTENT_FIELD_SIZE + TIMESTAMP_FIELD_SIZE;

/// Maximum usable content length in bytes.
///
/// One byte below the field size so the record always carries a
/// terminating NUL, whatever the peer's scanner expects.
pub const MAX_CONTENT_LENGTH: usize = CONTENT_FIELD_SIZE - 1;

/// Wire errors that can occur during decoding.
#[derive(Debug, Error)]
pub enum WireError {
    /// Record is smaller than the fixed layout.
    #[error("Short record: {0} bytes, need {SAMPLE_RECORD_SIZE}")]
    ShortRecord(usize),

    /// Record is larger than the fixed layout.
    #[error("Oversized record: {0} bytes, expected {SAMPLE_RECORD_SIZE}")]
    OversizedRecord(usize),
}

/// Encode a sample into a fresh record.
///
/// Content longer than [`MAX_CONTENT_LENGTH`] bytes is truncated at a
/// character boundary; encoding itself cannot fail.
#[must_use]
pub fn encode(sample: &Sample) -> Bytes {
    let mut buf = BytesMut::with_capacity(SAMPLE_RECORD_SIZE);
    encode_into(sample, &mut buf);
    buf.freeze()
}

/// Encode a sample into an existing buffer.
///
/// Appends exactly [`SAMPLE_RECORD_SIZE`] bytes.
pub fn encode_into(sample: &Sample, buf: &mut BytesMut) {
    let content = truncated(&sample.content);

    buf.reserve(SAMPLE_RECORD_SIZE);
    buf.extend_from_slice(content.as_bytes());
    buf.put_bytes(0, CONTENT_FIELD_SIZE - content.len());
    buf.put_i64_le(sample.timestamp_ms);
}

/// Decode a sample from one record.
///
/// Content is read up to the first NUL; bytes that are not valid UTF-8
/// are replaced rather than rejected, since the record comes from a
/// foreign peer.
///
/// # Errors
///
/// Returns an error if `record` is not exactly [`SAMPLE_RECORD_SIZE`]
/// bytes.
pub fn decode(record: &[u8]) -> Result<Sample, WireError> {
    if record.len() < SAMPLE_RECORD_SIZE {
        return Err(WireError::ShortRecord(record.len()));
    }
    if record.len() > SAMPLE_RECORD_SIZE {
        return Err(WireError::OversizedRecord(record.len()));
    }

    let field = &record[..CONTENT_FIELD_SIZE];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let content = String::from_utf8_lossy(&field[..end]).into_owned();

    let mut tail = &record[CONTENT_FIELD_SIZE..];
    let timestamp_ms = tail.get_i64_le();

    Ok(Sample {
        content,
        timestamp_ms,
    })
}

/// The longest prefix of `content` that fits the content field,
/// ending on a character boundary.
fn truncated(content: &str) -> &str {
    if content.len() <= MAX_CONTENT_LENGTH {
        return content;
    }
    let mut end = MAX_CONTENT_LENGTH;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
