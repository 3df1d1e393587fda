//! Cache subsystem errors.

use thiserror::Error;

/// Errors raised while configuring or talking to a cache backend.
///
/// None of these reach a request: the dispatcher logs configuration errors and
/// keeps the installed backend, and backends turn store errors into misses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The configuration payload is absent or cannot be parsed.
    #[error("malformed cache configuration: {0}")]
    MalformedConfiguration(String),

    /// The payload parsed but names a cache type with no registered builder.
    #[error("unsupported cache type: {0}")]
    UnsupportedCacheType(String),

    /// Connection settings were rejected before any connection was attempted.
    #[error("invalid cache connection settings: {0}")]
    InvalidConnection(String),

    /// The external store could not be reached or returned an error.
    #[error("cache backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The external store did not answer within the configured wait.
    #[error("cache operation timed out after {0} ms")]
    Timeout(u64),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
