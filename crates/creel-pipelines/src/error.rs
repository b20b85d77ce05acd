//! Pipeline error types.

use creel_browser::BrowserError;
use creel_jobs::{Cancellable, JobError};
use creel_llm::LlmError;
use creel_scanner::ScanError;
use thiserror::Error;

use crate::listing::ListingError;

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The job was canceled; not a failure.
    #[error("pipeline canceled")]
    Canceled,

    /// Job input was malformed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Tabular input could not be read or written.
    #[error("table error: {0}")]
    Table(String),

    /// Business listing search failed.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// Completion service failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Browser failed outside a per-site unit.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// Crawling or enrichment failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Job store failed.
    #[error(transparent)]
    Job(#[from] JobError),
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        Self::Table(err.to_string())
    }
}

/// Result type alias for pipelines.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl Cancellable for PipelineError {
    fn is_cancellation(&self) -> bool {
        match self {
            Self::Canceled => true,
            Self::Scan(e) => e.is_cancellation(),
            Self::Job(e) => e.is_cancellation(),
            _ => false,
        }
    }
}
