use thiserror::Error;

/// Errors surfaced by the configuration store
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),

    #[error("Malformed configuration document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Register {register} was not acknowledged after {attempts} attempts")]
    HardwareAckTimeout { register: u16, attempts: u32 },

    #[error("No configuration document has been loaded")]
    NotLoaded,
}

/// Errors surfaced by the access-control store
///
/// A missing record file is not an error (it maps to an `Unknown` lookup
/// result), and a corrupt record maps to an unauthorized result with a
/// warning. Only directory-level storage failures surface here.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Access record storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::HardwareAckTimeout {
            register: 2005,
            attempts: 5,
        };
        let message = err.to_string();
        assert!(message.contains("2005"));
        assert!(message.contains("5 attempts"));
    }

    #[test]
    fn test_io_error_converts_to_storage_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::StorageUnavailable(_)));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err: AccessError = io.into();
        assert!(err.to_string().contains("storage unavailable"));
    }

    #[test]
    fn test_parse_error_converts_to_malformed_document() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ConfigError = parse_err.into();
        assert!(matches!(err, ConfigError::MalformedDocument(_)));
    }
}
