//! In-process job store.

use std::collections::HashMap;

use async_trait::async_trait;
use creel_core::{JobId, JobKind};
use tokio::sync::RwLock;

use crate::error::{JobError, Result};
use crate::job::{FileSlot, Job, JobStatus, JobSummary};
use crate::store::{check_transition, JobStore};

/// Job store backed by a map; used by tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job as-is, replacing any job with the same id.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    async fn with_job<T>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> Result<T> + Send) -> Result<T> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
        f(job)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, kind: JobKind) -> Result<Job> {
        let job = Job::new(kind);
        self.insert(job.clone()).await;
        Ok(job)
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<()> {
        self.with_job(id, |job| {
            if check_transition(&job.id, job.status, status)? {
                job.status = status;
            }
            Ok(())
        })
        .await
    }

    async fn append_message(&self, id: &JobId, message: &str) -> Result<()> {
        self.with_job(id, |job| {
            job.messages.push(message.to_string());
            Ok(())
        })
        .await
    }

    async fn replace_last_message(&self, id: &JobId, message: &str) -> Result<()> {
        self.with_job(id, |job| {
            match job.messages.last_mut() {
                Some(last) => *last = message.to_string(),
                None => job.messages.push(message.to_string()),
            }
            Ok(())
        })
        .await
    }

    async fn attach_file(&self, id: &JobId, slot: FileSlot, bytes: Vec<u8>) -> Result<()> {
        self.with_job(id, |job| {
            match slot {
                FileSlot::Primary => job.primary_file = Some(bytes),
                FileSlot::Secondary => job.secondary_file = Some(bytes),
            }
            Ok(())
        })
        .await
    }

    async fn list(&self) -> Result<Vec<JobSummary>> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<JobSummary> = jobs
            .values()
            .map(|job| JobSummary {
                id: job.id.clone(),
                kind: job.kind,
                status: job.status,
                created_at: job.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(summaries)
    }

    async fn delete(&self, id: &JobId) -> Result<bool> {
        Ok(self.jobs.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_last_on_empty_log_appends() {
        let store = MemoryJobStore::new();
        let job = store.create(JobKind::FishTales).await.expect("create job");

        store
            .replace_last_message(&job.id, "Scraping sites (1/3) for reports...")
            .await
            .expect("replace");
        store
            .replace_last_message(&job.id, "Scraping sites (2/3) for reports...")
            .await
            .expect("replace");

        let job = store.find_by_id(&job.id).await.expect("find").expect("exists");
        assert_eq!(job.messages, vec!["Scraping sites (2/3) for reports..."]);
    }

    #[tokio::test]
    async fn test_terminal_status_is_frozen() {
        let store = MemoryJobStore::new();
        let job = store.create(JobKind::ShopReel).await.expect("create job");

        store
            .set_status(&job.id, JobStatus::Canceled)
            .await
            .expect("cancel");
        store
            .set_status(&job.id, JobStatus::Canceled)
            .await
            .expect("same status is a no-op");

        let err = store
            .set_status(&job.id, JobStatus::Completed)
            .await
            .expect_err("terminal");
        assert!(matches!(err, JobError::Terminal { status: JobStatus::Canceled, .. }));
        assert_eq!(
            store.status(&job.id).await.expect("status"),
            JobStatus::Canceled
        );
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = MemoryJobStore::new();
        let id = JobId::generate();
        assert!(matches!(
            store.append_message(&id, "hi").await,
            Err(JobError::NotFound(_))
        ));
        assert!(!store.delete(&id).await.expect("delete"));
    }
}
