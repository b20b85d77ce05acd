//! Storage seam for job records.

use async_trait::async_trait;
use creel_core::{JobId, JobKind};

use crate::error::{JobError, Result};
use crate::job::{FileSlot, Job, JobStatus, JobSummary};

/// Persistence for jobs and their message logs.
///
/// Implementations must refuse to move a job out of a terminal status: a
/// request for the status the job already has succeeds, anything else fails
/// with [`JobError::Terminal`].
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a new in-progress job.
    async fn create(&self, kind: JobKind) -> Result<Job>;

    /// Load a job with its messages and files.
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Current status of a job.
    async fn status(&self, id: &JobId) -> Result<JobStatus> {
        self.find_by_id(id)
            .await?
            .map(|job| job.status)
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Transition a job to `status`.
    async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()>;

    /// Append a message to the job log.
    async fn append_message(&self, id: &JobId, message: &str) -> Result<()>;

    /// Replace the most recent message, or append if the log is empty.
    async fn replace_last_message(&self, id: &JobId, message: &str) -> Result<()>;

    /// Store an output file in `slot`, overwriting any previous contents.
    async fn attach_file(&self, id: &JobId, slot: FileSlot, bytes: Vec<u8>) -> Result<()>;

    /// All jobs, oldest first.
    async fn list(&self) -> Result<Vec<JobSummary>>;

    /// Delete a job. Returns whether it existed.
    async fn delete(&self, id: &JobId) -> Result<bool>;
}

/// Decide the outcome of a status change against the stored status.
pub(crate) fn check_transition(id: &JobId, current: JobStatus, next: JobStatus) -> Result<bool> {
    if current == next {
        return Ok(false);
    }
    if current.is_terminal() {
        return Err(JobError::Terminal {
            id: id.clone(),
            status: current,
        });
    }
    Ok(true)
}
