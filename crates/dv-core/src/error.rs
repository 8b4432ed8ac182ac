//! Typed error definitions for the depthvault pipeline.
//!
//! Provides [`DvError`] for the failure classes the persistence pipeline
//! distinguishes. All variants implement `std::error::Error` via `thiserror`,
//! so they integrate seamlessly with `anyhow::Result` at the binary level.
//!
//! | Variant              | Class                  | Handling                          |
//! |----------------------|------------------------|-----------------------------------|
//! | `Connection`         | fatal                  | abort startup                     |
//! | `Write`              | transient, retryable   | retry policy, never seen upstream |
//! | `ExhaustedRetries`   | terminal for one item  | drop item, log, keep consuming    |
//! | `ClosedQueue`        | programming error      | surfaced loudly, never retried    |

use thiserror::Error;

/// Domain-specific errors for the depthvault pipeline.
#[derive(Debug, Error)]
pub enum DvError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// A snapshot record failed construction-time validation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The storage backend could not be reached at startup.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single write attempt against the backend failed.
    #[error("write error on {namespace}: {reason}")]
    Write { namespace: String, reason: String },

    /// Every allowed attempt for one item failed; the item is dropped.
    #[error("write to {namespace} failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        namespace: String,
        attempts: u32,
        last_error: String,
    },

    /// Submission attempted after the write queue was closed.
    #[error("write queue is closed")]
    ClosedQueue,

    /// Filesystem error (config or replay files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DvError {
    /// Whether the error is worth another attempt under the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}
