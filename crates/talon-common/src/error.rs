//! Error types for Talon
//!
//! This module defines the common error type used throughout the system.

use thiserror::Error;

/// Common result type for Talon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Talon
#[derive(Debug, Error)]
pub enum Error {
    /// The subject exists in neither the caches nor the backing store.
    #[error("subject not found")]
    NotFound,

    #[error("payload encoding failed: {0}")]
    Encode(String),

    #[error("payload decoding failed: {0}")]
    Decode(String),

    #[error("datastore I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store is cancelling; queued work may have been discarded.
    #[error("datastore is shutting down")]
    Shutdown,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an encode error from any encoder failure
    pub fn encode(err: impl std::fmt::Display) -> Self {
        Self::Encode(err.to_string())
    }

    /// Create a decode error from any decoder failure
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
