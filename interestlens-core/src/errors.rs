//! Error types for the InterestLens core
//!
//! Most of the core is deliberately forgiving: missing profiles, missing
//! embeddings and unknown event types are not errors. The variants here cover
//! the cases that do propagate: store failures surfaced by non-cache callers,
//! collaborator failures and timeouts inside compute functions, and input that
//! cannot be interpreted at all.

use thiserror::Error;

/// Main error type for the InterestLens core
#[derive(Error, Debug)]
pub enum CoreError {
    /// The key/value store rejected or failed an operation
    #[error("Store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An external call did not finish in time
    #[error("Timed out after {seconds} seconds")]
    Timeout {
        /// Number of seconds waited before giving up
        seconds: u64,
    },

    /// An external collaborator (embedding model, extractor, checker) failed
    #[error("Collaborator {name} failed: {message}")]
    Collaborator {
        /// Name of the collaborator
        name: String,
        /// Failure description
        message: String,
    },

    /// Input that cannot be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record that was explicitly requested does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A resource limit was reached
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
}

impl CoreError {
    /// Shorthand for a collaborator failure
    pub fn collaborator(name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Collaborator {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the error was produced by an elapsed timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Timeout { seconds: 10 };
        assert_eq!(err.to_string(), "Timed out after 10 seconds");
        assert!(err.is_timeout());

        let err = CoreError::collaborator("embedder", "503 from upstream");
        assert_eq!(
            err.to_string(),
            "Collaborator embedder failed: 503 from upstream"
        );
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
