//! Job store error types.
//!
//! Provides error handling for job records and the task facade using `thiserror`.

use creel_core::JobId;
use thiserror::Error;

use crate::job::JobStatus;

/// Errors raised by job stores and the task facade.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job was canceled externally; not a failure.
    #[error("job canceled")]
    Canceled,

    /// Requested job was not found.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The job already left `InProgress` and cannot transition again.
    #[error("job {id} is already {status}")]
    Terminal {
        /// Job identifier
        id: JobId,
        /// Status the job is frozen in
        status: JobStatus,
    },

    /// Failed to open or create the database.
    #[error("failed to open job database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Failed to decode a stored value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that may carry a cooperative cancellation.
///
/// Bounded batches and the task facade use this to let cancellation abort a
/// phase while ordinary failures stay isolated to their unit of work.
pub trait Cancellable {
    /// Whether this error is the cancellation signal rather than a failure.
    fn is_cancellation(&self) -> bool;
}

impl Cancellable for JobError {
    fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_canceled_is_cancellation() {
        assert!(JobError::Canceled.is_cancellation());
        assert!(!JobError::Decode("bad".to_string()).is_cancellation());
    }

    #[test]
    fn test_terminal_display() {
        let id = JobId::generate();
        let err = JobError::Terminal {
            id: id.clone(),
            status: JobStatus::Canceled,
        };
        assert_eq!(err.to_string(), format!("job {id} is already CANCELED"));
    }
}
