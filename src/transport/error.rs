//! Transport error types.

use std::io;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while handing statements to the executor.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to spawn the executor process.
    #[error("failed to spawn executor process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Failed to write statements to executor stdin.
    #[error("failed to write to executor: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to read results from executor stdout.
    #[error("failed to read from executor: {0}")]
    ReadFailed(#[source] io::Error),

    /// Failed to serialize statements to JSON.
    #[error("failed to serialize statements: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Executor output was not a JSON array of result sets.
    #[error("failed to deserialize results: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// Executor reported a failure.
    #[error("executor failed ({status}): {message}")]
    ExecutorFailed {
        /// Exit status or status code, as reported.
        status: String,
        /// Executor's error text.
        message: String,
    },

    /// Executor returned a different number of result sets than statements.
    #[error("expected {expected} result set(s), got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },
}

impl TransportError {
    /// Create an executor failure.
    pub fn executor(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutorFailed {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Whether the executor was reached at all.
    pub fn is_executor_failure(&self) -> bool {
        matches!(
            self,
            Self::ExecutorFailed { .. } | Self::ResultCountMismatch { .. }
        )
    }
}
