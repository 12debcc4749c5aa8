//! The sample type carried across the middleware boundary.

/// One datum as the middleware sees it: text content plus the
/// publisher's creation timestamp.
///
/// A sample is the wire-side twin of a message. The binding builds one
/// at publish time and rebuilds the message from one at receive time,
/// so the publisher's timestamp survives the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Sample text.
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(content: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            content: content.into(),
            timestamp_ms,
        }
    }

    /// Whether the content fits the record's content field without
    /// truncation.
    #[must_use]
    pub fn fits(&self) -> bool {
        self.content.len() <= crate::codec::MAX_CONTENT_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_CONTENT_LENGTH;

    #[test]
    fn test_sample_new() {
        let sample = Sample::new("hello", 42);
        assert_eq!(sample.content, "hello");
        assert_eq!(sample.timestamp_ms, 42);
    }

    #[test]
    fn test_sample_fits() {
        assert!(Sample::new("a".repeat(MAX_CONTENT_LENGTH), 0).fits());
        assert!(!Sample::new("a".repeat(MAX_CONTENT_LENGTH + 1), 0).fits());
    }
}
