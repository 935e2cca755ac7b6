//! Common error types for Stowage.

use thiserror::Error;

/// Top-level error type for storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network, authentication or provider-side failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Logical name cannot be turned into a storage key.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Whether this error is an explicit not-found signal.
    ///
    /// Only this case may be read as "the object is absent". Every other
    /// variant means the check itself failed.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
