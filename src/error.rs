//! Error types for ltm-core.

use thiserror::Error;

/// Result type alias using ltm-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during memory operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Record store unreachable or rejected a write/delete
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation targeted a record that does not exist
    #[error("Memory {id} not found in session {session_id}")]
    NotFound { id: String, session_id: String },

    /// Scoring oracle unavailable or returned an unusable response
    #[error("Scoring oracle error: {0}")]
    Oracle(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a not-found error for an `(id, session_id)` pair.
    pub fn not_found(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            session_id: session_id.into(),
        }
    }

    /// Create an oracle error.
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
