use regex::Regex;
use std::sync::OnceLock;

/// Validation error type
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Validation error for field '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

/// Validate an RFID tag UID.
///
/// The firmware formats UIDs as lowercase hex with no per-byte zero
/// padding, and the string doubles as the record filename, so anything
/// outside `[0-9a-f]{1,32}` is rejected before a path is built from it.
pub fn validate_uid(uid: &str) -> Result<(), ValidationError> {
    static UID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = UID_REGEX.get_or_init(|| Regex::new(r"^[0-9a-f]{1,32}$").unwrap());

    if regex.is_match(uid) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "uid",
            "UID must be 1-32 lowercase hexadecimal characters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uid() {
        // Valid UIDs (unpadded lowercase hex, as the reader formats them)
        assert!(validate_uid("4a1").is_ok());
        assert!(validate_uid("abc123").is_ok());
        assert!(validate_uid("0").is_ok());
        assert!(validate_uid("deadbeef04").is_ok());
        assert!(validate_uid(&"a".repeat(32)).is_ok()); // exactly 32 chars

        // Invalid UIDs
        assert!(validate_uid("").is_err()); // empty
        assert!(validate_uid(&"a".repeat(33)).is_err()); // too long
        assert!(validate_uid("ABC123").is_err()); // uppercase
        assert!(validate_uid("xyz").is_err()); // not hex
        assert!(validate_uid("4a 1").is_err()); // whitespace
    }

    #[test]
    fn test_validate_uid_rejects_path_metacharacters() {
        // A UID names a file on flash, so traversal attempts must fail
        assert!(validate_uid("../etc/passwd").is_err());
        assert!(validate_uid("..").is_err());
        assert!(validate_uid("a/b").is_err());
        assert!(validate_uid("a\\b").is_err());
        assert!(validate_uid(".").is_err());
        assert!(validate_uid("%2e%2e").is_err());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("uid", "bad format");
        let message = err.to_string();
        assert!(message.contains("uid"));
        assert!(message.contains("bad format"));
    }
}
