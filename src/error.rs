use thiserror::Error;

/// Attribute protocol errors returned synchronously to a remote requester
///
/// These never mutate scale state. The numeric codes match the ATT error
/// codes a BLE peripheral stack reports back to the central.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttError {
    /// A non-zero offset was requested; only single-shot access is supported
    #[error("Attribute not long: offset reads and writes are not supported")]
    AttributeNotLong,

    /// The written value was not exactly one byte long
    #[error("Invalid attribute value length")]
    InvalidAttributeLength,
}

impl AttError {
    /// ATT protocol error code for this result
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::AttributeNotLong => 0x0B,
            Self::InvalidAttributeLength => 0x0D,
        }
    }
}

/// Errors that can occur while bridging a scale to remote subscribers
#[derive(Error, Debug)]
pub enum TricklerError {
    /// Reading from the serial line failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote request was rejected
    #[error("Attribute error: {0}")]
    Attribute(#[from] AttError),

    /// Invalid configuration or call parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for trickler operations
pub type Result<T> = std::result::Result<T, TricklerError>;

impl TricklerError {
    /// Check if this error was caused by a misbehaving remote client
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Attribute(_))
    }

    /// Check if processing can simply continue with the next line or request
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Attribute(_) | Self::InvalidParameters(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let att_error = TricklerError::from(AttError::InvalidAttributeLength);
        assert!(att_error.is_client_error());
        assert!(att_error.is_recoverable());

        let config_error = TricklerError::InvalidParameters("idle_timeout_ms".to_string());
        assert!(!config_error.is_client_error());
        assert!(config_error.is_recoverable());

        let io_error = TricklerError::from(std::io::Error::other("port gone"));
        assert!(!io_error.is_client_error());
        assert!(!io_error.is_recoverable());
    }

    #[test]
    fn test_att_codes() {
        assert_eq!(AttError::AttributeNotLong.code(), 0x0B);
        assert_eq!(AttError::InvalidAttributeLength.code(), 0x0D);
    }

    #[test]
    fn test_error_display() {
        let error = TricklerError::from(AttError::AttributeNotLong);
        let error_string = format!("{error}");
        assert!(error_string.contains("Attribute error"));
        assert!(error_string.contains("offset"));
    }
}
