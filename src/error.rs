//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! Only malformed caller input and construction failures surface as errors.
//! I/O trouble during ordinary operations is logged and reported as `false`
//! or "not found" by the backends.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Logical key is empty or cannot be turned into a safe file name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Argument cannot be stored or combined (e.g. incrementing a non-integer)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration was rejected during validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem error while setting up the cache root
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
