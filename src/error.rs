//! Error types for the insight pipeline core
//!
//! Structured error definitions use thiserror; adapters written against
//! anyhow convert into [`RibbonError::Other`].

use crate::types::Domain;
use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum RibbonError {
    /// Domain analyzer failed; the result must not be cached
    #[error("Computation failed for {domain} domain: {message}")]
    Computation { domain: Domain, message: String },

    /// Domain data source failed to produce records
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Cache backend read/write failed
    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    /// Best-effort remote cache mirror call failed
    #[error("Remote mirror error: {0}")]
    RemoteMirror(String),

    /// Suggestion cooldown store failed
    #[error("Cooldown store error: {0}")]
    CooldownStore(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RibbonError>;

impl From<anyhow::Error> for RibbonError {
    fn from(err: anyhow::Error) -> Self {
        RibbonError::Other(err.to_string())
    }
}

impl From<rusqlite::Error> for RibbonError {
    fn from(err: rusqlite::Error) -> Self {
        RibbonError::Database(err.to_string())
    }
}

impl RibbonError {
    /// Whether this error came from the domain analyzer itself
    pub fn is_computation_failure(&self) -> bool {
        matches!(self, RibbonError::Computation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RibbonError::Computation {
            domain: Domain::Mood,
            message: "division by zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Computation failed for mood domain: division by zero"
        );
        assert!(err.is_computation_failure());
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: RibbonError = json_err.into();
        assert!(matches!(err, RibbonError::Serialization(_)));
        assert!(!err.is_computation_failure());

        let err: RibbonError = anyhow::anyhow!("adapter blew up").into();
        assert_eq!(err.to_string(), "adapter blew up");
    }
}
