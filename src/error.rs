//! Error types for playlist migration.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all adapter and migration operations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Expired or invalid credential. Always aborts the run.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Playlist or other resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service asked us to slow down.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Delay suggested by the service's `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// Network failure or 5xx response.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Write path failed after the destination playlist was (or was about to be) created.
    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    /// HTTP request failed before a response was received.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic API error with message.
    #[error("API error: {0}")]
    Api(String),
}

impl MigrateError {
    /// Whether this error must abort the whole run regardless of policy.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, MigrateError::Unauthorized(_))
    }

    /// Whether the call that produced this error may succeed if repeated.
    pub fn is_transport(&self) -> bool {
        match self {
            MigrateError::Transport(_) => true,
            MigrateError::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Re-classify a write-path error. Credential failures keep their identity.
    pub fn into_transfer_failure(self) -> Self {
        match self {
            MigrateError::Unauthorized(_) | MigrateError::TransferFailure(_) => self,
            other => MigrateError::TransferFailure(other.to_string()),
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
