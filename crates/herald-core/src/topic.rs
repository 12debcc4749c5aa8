//! Topic name validation.
//!
//! A topic is a named stream that one publisher and any number of
//! subscribers agree on. The same rules apply to the native middleware and
//! the in-process mock, so a name accepted here binds on either backend.

/// Maximum topic name length in bytes.
pub const MAX_TOPIC_NAME_LENGTH: usize = 256;

/// Validate a topic name.
///
/// # Errors
///
/// Returns an error message if the topic name is invalid.
pub fn validate_topic_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Topic name cannot be empty");
    }
    if name.len() > MAX_TOPIC_NAME_LENGTH {
        return Err("Topic name too long");
    }
    if name.starts_with('$') {
        return Err("Topic names starting with '$' are reserved");
    }
    if name.contains('\0') {
        return Err("Topic name cannot contain NUL");
    }
    // Check for valid ASCII printable characters
    if !name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Err("Topic name contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_name_validation() {
        assert!(validate_topic_name("hello_topic").is_ok());
        assert!(validate_topic_name("sensor/room-1").is_ok());
        assert!(validate_topic_name("").is_err());
        assert!(validate_topic_name("$builtin").is_err());
        assert!(validate_topic_name("bad\0name").is_err());
        assert!(validate_topic_name("ünïcode").is_err());

        let long_name = "a".repeat(MAX_TOPIC_NAME_LENGTH + 1);
        assert!(validate_topic_name(&long_name).is_err());
    }

    #[test]
    fn test_topic_name_at_limit() {
        let name = "a".repeat(MAX_TOPIC_NAME_LENGTH);
        assert!(validate_topic_name(&name).is_ok());
    }
}
