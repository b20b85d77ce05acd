//! Job lifecycle operations used outside a running pipeline.

use creel_core::{JobId, JobKind};

use crate::error::{JobError, Result};
use crate::job::{JobStatus, JobUpdate};
use crate::store::JobStore;

/// Cancel a running job.
///
/// Appends `Canceled` to the log and sets the status. The running pipeline
/// discovers this at its next cancellation check.
pub async fn cancel_job(store: &dyn JobStore, id: &JobId) -> Result<()> {
    let status = store.status(id).await?;
    if status.is_terminal() {
        return Err(JobError::Terminal {
            id: id.clone(),
            status,
        });
    }
    store.append_message(id, "Canceled").await?;
    store.set_status(id, JobStatus::Canceled).await?;
    tracing::info!("Canceled job {}", id);
    Ok(())
}

/// Polling snapshot of a job.
pub async fn job_updates(store: &dyn JobStore, id: &JobId) -> Result<JobUpdate> {
    store
        .find_by_id(id)
        .await?
        .map(|job| JobUpdate::from(&job))
        .ok_or_else(|| JobError::NotFound(id.clone()))
}

/// Outcome of a retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Failed or canceled jobs removed
    pub unsuccessful_deleted: usize,
    /// Completed jobs removed beyond the per-kind retention limit
    pub completed_deleted: usize,
}

impl CleanupReport {
    /// Total jobs removed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.unsuccessful_deleted + self.completed_deleted
    }
}

/// Delete failed and canceled jobs, then keep only the `keep_completed` most
/// recent completed jobs of each kind. Running jobs are never touched.
pub async fn cleanup_jobs(store: &dyn JobStore, keep_completed: usize) -> Result<CleanupReport> {
    let jobs = store.list().await?;
    let mut report = CleanupReport::default();

    for job in jobs
        .iter()
        .filter(|job| matches!(job.status, JobStatus::Failed | JobStatus::Canceled))
    {
        if store.delete(&job.id).await? {
            report.unsuccessful_deleted += 1;
        }
    }

    for kind in JobKind::ALL {
        let mut completed: Vec<_> = jobs
            .iter()
            .filter(|job| job.kind == kind && job.status == JobStatus::Completed)
            .collect();
        completed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        for job in completed.into_iter().skip(keep_completed) {
            if store.delete(&job.id).await? {
                report.completed_deleted += 1;
            }
        }
    }

    tracing::info!(
        "Job cleanup removed {} unsuccessful and {} old completed jobs",
        report.unsuccessful_deleted,
        report.completed_deleted
    );
    Ok(report)
}
