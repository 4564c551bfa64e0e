//! Error types for cache operations
//!
//! This module defines the error taxonomy for clever-cache. Store transport
//! failures and server-side script rejections are kept apart so callers can
//! tell "the store is unreachable" from "the store refused the operation".

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The caller supplied something that cannot be coded as a dependency key
    #[error("Invalid dependency descriptor: {0}")]
    InvalidDependencyDescriptor(String),

    /// Transport or connection failure talking to the backing store
    #[error("Store error: {0}")]
    StoreError(String),

    /// An atomic operation was rejected by the store
    #[error("Script error: {0}")]
    ScriptError(String),

    /// An entry key that would collide with the dependency namespace
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// A TTL that the store cannot express
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Whether the error came from the transport rather than the operation itself
    pub fn is_store_error(&self) -> bool {
        matches!(self, CacheError::StoreError(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error()
            || e.is_connection_refusal()
            || e.is_connection_dropped()
            || e.is_timeout()
        {
            CacheError::StoreError(e.to_string())
        } else {
            CacheError::ScriptError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
