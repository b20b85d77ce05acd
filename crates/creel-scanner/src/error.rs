use creel_browser::BrowserError;
use creel_jobs::{Cancellable, JobError};
use thiserror::Error;

/// Errors raised while crawling or enriching sites.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The owning job was canceled.
    #[error("scan canceled")]
    Canceled,

    /// A content selector could not be compiled.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// Selector as configured
        selector: String,
        /// Parser message
        reason: String,
    },

    /// Page content could not be read or parsed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Browser error
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Job store error
    #[error("job error: {0}")]
    Job(#[from] JobError),
}

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;

impl Cancellable for ScanError {
    fn is_cancellation(&self) -> bool {
        match self {
            Self::Canceled => true,
            Self::Job(e) => e.is_cancellation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_cancellation_is_cancellation() {
        assert!(ScanError::from(JobError::Canceled).is_cancellation());
        assert!(ScanError::Canceled.is_cancellation());
        assert!(!ScanError::Extraction("no body".to_string()).is_cancellation());
        assert!(!ScanError::from(BrowserError::NotLaunched).is_cancellation());
    }
}
