//! SiteScout: add shops that publish reports to the FishTales site list.

use std::sync::Arc;

use creel_core::JobKind;
use creel_jobs::{FileSlot, JobStatus, Task};

use crate::error::Result;
use crate::reconciler::{reconcile, Reconciliation};
use crate::submission::{invalid, JobParams};
use crate::tabular::{CsvCodec, TabularCodec};

/// Input to a SiteScout job.
#[derive(Debug, Clone)]
pub struct SiteScoutParams {
    /// ShopReel export (`website`, `has_report`)
    pub shops_table: Vec<u8>,
    /// FishTales sites table (`url`, ...)
    pub sites_table: Vec<u8>,
}

impl JobParams for SiteScoutParams {
    const KIND: JobKind = JobKind::SiteScout;

    fn validate(&self) -> Result<()> {
        if self.shops_table.iter().all(u8::is_ascii_whitespace) {
            return Err(invalid("shop file is empty"));
        }
        if self.sites_table.iter().all(u8::is_ascii_whitespace) {
            return Err(invalid("sites file is empty"));
        }
        Ok(())
    }
}

/// Runs SiteScout jobs. No browser involved.
#[derive(Clone)]
pub struct SiteScout {
    codec: Arc<dyn TabularCodec>,
}

impl std::fmt::Debug for SiteScout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteScout").finish_non_exhaustive()
    }
}

impl Default for SiteScout {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteScout {
    #[must_use]
    pub fn new() -> Self {
        Self {
            codec: Arc::new(CsvCodec),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn TabularCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Run the job behind `task` and record its outcome.
    pub async fn execute(&self, task: &Task, params: &SiteScoutParams) -> creel_jobs::Result<JobStatus> {
        let outcome = self.run(task, params).await;
        task.finish(outcome).await
    }

    /// Pipeline body; returns the completion message.
    pub async fn run(&self, task: &Task, params: &SiteScoutParams) -> Result<String> {
        task.add_message("Comparing report and site URLs...").await?;
        let observed = self.codec.read(&params.shops_table, &[])?;
        let reported = self.codec.read(&params.sites_table, &[])?;
        task.check_canceled().await?;

        match reconcile(&reported, &observed) {
            Reconciliation::NothingMissing => Ok("No missing URLs found.".to_string()),
            Reconciliation::Missing { urls, rows } => {
                task.add_message(format!("Appending {} missing URLs...", urls.len()))
                    .await?;
                task.attach_file(FileSlot::Primary, self.codec.write(&rows)?)
                    .await?;
                Ok("Finished!".to_string())
            }
        }
    }
}
