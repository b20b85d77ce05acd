//! Per-job facade handed to pipelines.
//!
//! A [`Task`] is the only way a running pipeline touches its job: it polls for
//! cancellation, narrates progress, attaches outputs, and records the final
//! outcome. Cancellation is observed two ways: the local token (cancelled by
//! the process that owns the run) and the stored status (set by
//! [`cancel_job`](crate::cancel_job) from anywhere that shares the store).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use creel_core::JobId;
use tokio_util::sync::CancellationToken;

use crate::error::{Cancellable, JobError, Result};
use crate::job::{FileSlot, JobStatus};
use crate::store::JobStore;

/// Capability handle over one job.
#[derive(Clone)]
pub struct Task {
    store: Arc<dyn JobStore>,
    job_id: JobId,
    token: CancellationToken,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Create a task for an existing job with a fresh cancellation token.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, job_id: JobId) -> Self {
        Self::with_token(store, job_id, CancellationToken::new())
    }

    /// Create a task sharing an externally owned token.
    #[must_use]
    pub fn with_token(store: Arc<dyn JobStore>, job_id: JobId, token: CancellationToken) -> Self {
        Self {
            store,
            job_id,
            token,
        }
    }

    /// Job this task drives.
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Token that is cancelled once cancellation has been observed.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Fail with [`JobError::Canceled`] if the job has been canceled.
    pub async fn check_canceled(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(JobError::Canceled);
        }
        if self.store.status(&self.job_id).await? == JobStatus::Canceled {
            tracing::info!("Job {} was canceled", self.job_id);
            self.token.cancel();
            return Err(JobError::Canceled);
        }
        Ok(())
    }

    /// Append a message to the job log.
    pub async fn add_message(&self, message: impl AsRef<str>) -> Result<()> {
        self.store
            .append_message(&self.job_id, message.as_ref())
            .await
    }

    /// Replace the most recent message (progress counters).
    pub async fn update_message(&self, message: impl AsRef<str>) -> Result<()> {
        self.store
            .replace_last_message(&self.job_id, message.as_ref())
            .await
    }

    /// Attach an output file.
    pub async fn attach_file(&self, slot: FileSlot, bytes: Vec<u8>) -> Result<()> {
        self.store.attach_file(&self.job_id, slot, bytes).await
    }

    /// Transition the job status.
    pub async fn set_status(&self, status: JobStatus) -> Result<()> {
        self.store.set_status(&self.job_id, status).await
    }

    /// Progress counter over `total` units that rewrites the last message.
    #[must_use]
    pub fn progress<F>(&self, total: usize, render: F) -> Progress
    where
        F: Fn(usize, usize) -> String + Send + Sync + 'static,
    {
        Progress {
            task: self.clone(),
            done: AtomicUsize::new(0),
            total,
            render: Box::new(render),
        }
    }

    /// Record the outcome of a pipeline run and return the final status.
    ///
    /// Success appends `message` and completes the job. Cancellation leaves
    /// the log untouched. Any other error is logged as `Error: ...` and fails
    /// the job. A job canceled while the pipeline was finishing stays
    /// canceled.
    pub async fn finish<E>(&self, outcome: std::result::Result<String, E>) -> Result<JobStatus>
    where
        E: Cancellable + fmt::Display,
    {
        match outcome {
            Ok(message) => {
                self.add_message(&message).await?;
                self.settle(JobStatus::Completed).await
            }
            Err(e) if e.is_cancellation() => {
                tracing::info!("Job {} stopped after cancellation", self.job_id);
                self.settle(JobStatus::Canceled).await
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", self.job_id, e);
                self.add_message(format!("Error: {e}")).await?;
                self.settle(JobStatus::Failed).await
            }
        }
    }

    async fn settle(&self, status: JobStatus) -> Result<JobStatus> {
        match self.set_status(status).await {
            Ok(()) => Ok(status),
            Err(JobError::Terminal { status: current, .. }) => {
                tracing::debug!(
                    "Job {} already {}, not moving to {}",
                    self.job_id,
                    current,
                    status
                );
                Ok(current)
            }
            Err(e) => Err(e),
        }
    }
}

/// Shared "k/N" counter for a bounded batch.
pub struct Progress {
    task: Task,
    done: AtomicUsize,
    total: usize,
    render: Box<dyn Fn(usize, usize) -> String + Send + Sync>,
}

impl Progress {
    /// Count one finished unit and publish the new message.
    pub async fn tick(&self) -> Result<usize> {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.task
            .update_message((self.render)(done, self.total))
            .await?;
        Ok(done)
    }

    /// Units counted so far.
    #[must_use]
    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("done", &self.done())
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryJobStore;
    use creel_core::JobKind;

    #[derive(Debug)]
    enum TestError {
        Canceled,
        Broken,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Canceled => write!(f, "canceled"),
                Self::Broken => write!(f, "broken pipe"),
            }
        }
    }

    impl Cancellable for TestError {
        fn is_cancellation(&self) -> bool {
            matches!(self, Self::Canceled)
        }
    }

    async fn setup() -> (Arc<MemoryJobStore>, Task) {
        let store = Arc::new(MemoryJobStore::new());
        let job = store.create(JobKind::FishTales).await.expect("create job");
        let task = Task::new(store.clone(), job.id);
        (store, task)
    }

    #[tokio::test]
    async fn test_check_canceled_sees_store_status() {
        let (store, task) = setup().await;
        task.check_canceled().await.expect("not canceled yet");

        store
            .set_status(task.job_id(), JobStatus::Canceled)
            .await
            .expect("cancel");

        assert!(matches!(task.check_canceled().await, Err(JobError::Canceled)));
        assert!(task.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_check_canceled_sees_token() {
        let (_store, task) = setup().await;
        task.token().cancel();
        assert!(matches!(task.check_canceled().await, Err(JobError::Canceled)));
    }

    #[tokio::test]
    async fn test_finish_success() {
        let (store, task) = setup().await;
        let status = task
            .finish::<TestError>(Ok("Done".to_string()))
            .await
            .expect("finish");
        assert_eq!(status, JobStatus::Completed);

        let job = store.find_by_id(task.job_id()).await.expect("find").expect("job");
        assert_eq!(job.messages, vec!["Done"]);
    }

    #[tokio::test]
    async fn test_finish_failure_appends_error() {
        let (store, task) = setup().await;
        let status = task
            .finish::<TestError>(Err(TestError::Broken))
            .await
            .expect("finish");
        assert_eq!(status, JobStatus::Failed);

        let job = store.find_by_id(task.job_id()).await.expect("find").expect("job");
        assert_eq!(job.messages, vec!["Error: broken pipe"]);
    }

    #[tokio::test]
    async fn test_finish_after_cancel_adds_nothing() {
        let (store, task) = setup().await;
        crate::cancel_job(store.as_ref(), task.job_id())
            .await
            .expect("cancel job");

        let status = task
            .finish::<TestError>(Err(TestError::Canceled))
            .await
            .expect("finish");
        assert_eq!(status, JobStatus::Canceled);

        let job = store.find_by_id(task.job_id()).await.expect("find").expect("job");
        assert_eq!(job.messages, vec!["Canceled"]);
        assert_eq!(job.status, JobStatus::Canceled);
    }

    #[tokio::test]
    async fn test_success_racing_cancel_stays_canceled() {
        let (store, task) = setup().await;
        store
            .set_status(task.job_id(), JobStatus::Canceled)
            .await
            .expect("cancel");

        let status = task
            .finish::<TestError>(Ok("Done".to_string()))
            .await
            .expect("finish");
        assert_eq!(status, JobStatus::Canceled);
    }

    #[tokio::test]
    async fn test_progress_rewrites_last_message() {
        let (store, task) = setup().await;
        task.add_message("Found 3 sites to scrape!").await.expect("add");
        task.add_message("Scraping sites (0/3) for reports...")
            .await
            .expect("add");

        let progress = task.progress(3, |k, n| format!("Scraping sites ({k}/{n}) for reports..."));
        progress.tick().await.expect("tick");
        progress.tick().await.expect("tick");
        assert_eq!(progress.done(), 2);

        let job = store.find_by_id(task.job_id()).await.expect("find").expect("job");
        assert_eq!(
            job.messages,
            vec!["Found 3 sites to scrape!", "Scraping sites (2/3) for reports..."]
        );
    }
}
