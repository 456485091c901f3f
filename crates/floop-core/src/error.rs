//! Error types for the Floop engine.
//!
//! Every fallible boundary returns one of the enums below rather than a raw
//! string or a panic. `StoreError` covers the persistence layer; `EngineError`
//! wraps it plus the runtime-shell failure modes (rate limiting, path
//! rejection) that aren't specific to storage.

use std::path::PathBuf;

/// Errors surfaced by `GraphStore` and friends.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced node/edge/behavior does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Duplicate edge, or an edge kind rejected by the operation.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Graph validation failed (dangling reference, cycle, self-edge).
    #[error("integrity error: {0}")]
    IntegrityError(String),
    /// Underlying I/O or database failure.
    #[error("backend error: {0}")]
    BackendError(String),
    /// Operation was cancelled before completion.
    #[error("cancelled")]
    Cancelled,
    /// Operation exceeded its deadline.
    #[error("timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::BackendError(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::BackendError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::BackendError(e.to_string())
    }
}

/// Errors from the cross-cutting runtime shell (rate limiting, path validation).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A backup/restore path resolved outside the configured allow-list.
    #[error("path rejected: {0:?}")]
    PathRejected(PathBuf),
    /// The per-tool rate limit was exceeded; retryable.
    #[error("rate limited")]
    RateLimited,
}

/// Top-level engine error — what `FloopEngine`'s tool operations return.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// Embedding backend unavailable; callers should degrade to rule-based paths.
    #[error("embedding unavailable: {0}")]
    EmbedUnavailable(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
