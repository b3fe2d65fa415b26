//! Common error types for Updrift.

use thiserror::Error;

/// Top-level error type for Updrift operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Authorization failed: consent denied, malformed descriptor, or a
    /// refresh that was permanently rejected.
    #[error("Authorization error: {0}")]
    Auth(String),

    /// Invalid or missing configuration, detected before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient network failure (timeout, connection reset, 5xx).
    #[error("Network error: {0}")]
    Network(String),

    /// The remote API asked us to slow down.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Non-transient remote API failure.
    #[error("Remote API error: {0}")]
    Remote(String),

    /// Storage quota permanently exceeded.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not permitted on the remote resource.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The invocation was cancelled before this operation started.
    #[error("Cancelled")]
    Cancelled,
}

impl Error {
    /// Whether a retry with backoff is worth attempting.
    ///
    /// Only network-level failures and rate limiting qualify; auth
    /// rejections, quota exhaustion, and local I/O errors fail immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::RateLimited(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
