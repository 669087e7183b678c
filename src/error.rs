//! Error types for the depth book reconstructor.
//!
//! The merge core never fails: malformed slot updates are corrected or
//! dropped. Errors exist only for the surfaces around it (lookups by name,
//! configuration, replay sources, export).

use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Main error type for the crate.
#[derive(Error, Debug, Clone)]
pub enum BookError {
    /// Ticker has never been seen (or was evicted)
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// Configuration rejected by `RegistryConfig::validate`
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A replay source produced a record that could not be decoded
    #[error("Decode error at record {line}: {reason}")]
    Decode { line: u64, reason: String },

    /// Serialization of a view or warning export failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl BookError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        BookError::Generic(msg.into())
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::Generic(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::Serialization(err.to_string())
    }
}

impl From<String> for BookError {
    fn from(err: String) -> Self {
        BookError::Generic(err)
    }
}

impl From<&str> for BookError {
    fn from(err: &str) -> Self {
        BookError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BookError::TickerNotFound("NSE:NIFTY25JULFUT".into());
        assert_eq!(err.to_string(), "Ticker not found: NSE:NIFTY25JULFUT");

        let err = BookError::Decode {
            line: 7,
            reason: "missing field `ticker`".into(),
        };
        assert_eq!(
            err.to_string(),
            "Decode error at record 7: missing field `ticker`"
        );
    }

    #[test]
    fn test_from_json_error() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: BookError = parse.unwrap_err().into();
        assert!(matches!(err, BookError::Serialization(_)));
    }
}
