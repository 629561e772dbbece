//! # Cache Error Types
//!
//! Errors raised by cache stores.
//!
//! These never leave the crate's public read/write path: the
//! [`CacheCoordinator`](crate::CacheCoordinator) logs them and degrades to a
//! miss. Stores still return them so the coordinator can decide.

use thiserror::Error;

/// Cache store failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Could not reach the backend.
    ///
    /// ## When This Occurs
    /// - Redis is down or the URL is wrong
    /// - The connection manager gave up reconnecting
    #[error("Cache connection failed: {0}")]
    Connection(String),

    /// The backend answered with an error.
    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
