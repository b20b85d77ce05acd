//! Map-reduce summarization through a completion provider.
//!
//! The compiled report text is chunked to the token budget, every chunk is
//! summarized concurrently, and the chunk summaries are merged by one final
//! call. Individual chunk failures are tolerated; if none succeed the merge
//! is skipped.

use std::sync::Arc;

use creel_core::SummarizerConfig;
use creel_jobs::Task;
use creel_llm::LlmProvider;
use creel_scanner::BoundedPool;

use crate::chunking::chunk_reports;
use crate::error::{PipelineError, Result};

/// Result of a summarization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Merged summary text
    Summary(String),
    /// Every chunk summary failed (or there was nothing to summarize)
    NoSummaries,
}

/// Summarizes long report text within a token budget.
pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    task: Task,
    pool: BoundedPool,
    config: SummarizerConfig,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("provider", &self.provider.provider_id())
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        task: Task,
        pool: BoundedPool,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            provider,
            task,
            pool,
            config,
        }
    }

    /// Summarize divider-separated `text`.
    pub async fn summarize(&self, text: &str) -> Result<SummaryOutcome> {
        let chunks = chunk_reports(text, self.config.token_limit);
        tracing::info!(
            "Summarizing {} chunk(s) with {} ({})",
            chunks.len(),
            self.config.model,
            self.provider.provider_id()
        );

        let outcomes = self
            .pool
            .run(chunks, move |index, chunk| async move {
                self.task.check_canceled().await?;
                let prompt = format!("{chunk}\n\n{}", self.config.summary_prompt);
                let summary = self.provider.generate(&self.config.model, &prompt).await?;
                tracing::debug!("Chunk {} summarized ({} chars)", index, summary.len());
                Ok::<_, PipelineError>(summary)
            })
            .await?;

        let total = outcomes.len();
        let summaries: Vec<String> = outcomes.into_iter().filter_map(Result::ok).collect();
        if summaries.len() < total {
            tracing::warn!("{} of {} chunk summaries failed", total - summaries.len(), total);
        }
        if summaries.is_empty() {
            return Ok(SummaryOutcome::NoSummaries);
        }

        self.task.check_canceled().await?;
        let prompt = format!("{}\n\n{}", self.config.merge_prompt, summaries.join("\n\n"));
        let merged = self.provider.generate(&self.config.model, &prompt).await?;
        self.task.check_canceled().await?;

        Ok(SummaryOutcome::Summary(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creel_core::JobKind;
    use creel_jobs::{Cancellable, JobStatus, JobStore, MemoryJobStore};
    use creel_llm::testing::MockProvider;
    use creel_scanner::DIVIDER;

    fn config(token_limit: usize) -> SummarizerConfig {
        SummarizerConfig {
            token_limit,
            model: "test-model".to_string(),
            summary_prompt: "SUMMARIZE".to_string(),
            merge_prompt: "MERGE".to_string(),
            max_age_days: 30,
        }
    }

    async fn task() -> (Arc<MemoryJobStore>, Task) {
        let store = Arc::new(MemoryJobStore::new());
        let job = store.create(JobKind::FishTales).await.expect("job");
        let task = Task::new(store.clone(), job.id);
        (store, task)
    }

    fn text() -> String {
        ["Bow River: 12 fish", "Elk River: dry flies", "Oldman: closed"].join(DIVIDER)
    }

    #[tokio::test]
    async fn test_map_then_merge() {
        let (_store, task) = task().await;
        let provider = Arc::new(MockProvider::new(|_, prompt| {
            if prompt.starts_with("MERGE") {
                Ok("final".to_string())
            } else {
                Ok(format!("summary of {}", prompt.lines().next().unwrap_or_default()))
            }
        }));
        let summarizer = Summarizer::new(provider.clone(), task, BoundedPool::new(2), config(8));

        let outcome = summarizer.summarize(&text()).await.expect("summarize");
        assert_eq!(outcome, SummaryOutcome::Summary("final".to_string()));

        let calls = provider.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|c| c.model.as_deref() == Some("test-model")));
        assert!(calls[..3].iter().all(|c| c.prompt.ends_with("\n\nSUMMARIZE")));
        let merge = &calls[3].prompt;
        assert!(merge.starts_with("MERGE\n\nsummary of "));
        assert!(merge.contains("summary of Elk River: dry flies"));
    }

    #[tokio::test]
    async fn test_partial_failures_still_merge() {
        let (_store, task) = task().await;
        let provider = Arc::new(MockProvider::new(|_, prompt| {
            if prompt.starts_with("Elk") {
                Err("quota".to_string())
            } else {
                Ok("ok".to_string())
            }
        }));
        let summarizer = Summarizer::new(provider.clone(), task, BoundedPool::new(3), config(8));

        let outcome = summarizer.summarize(&text()).await.expect("summarize");
        assert_eq!(outcome, SummaryOutcome::Summary("ok".to_string()));
        assert_eq!(provider.calls().last().map(|c| c.prompt.clone()), Some("MERGE\n\nok\n\nok".to_string()));
    }

    #[tokio::test]
    async fn test_all_failures_skip_merge() {
        let (_store, task) = task().await;
        let provider = Arc::new(MockProvider::failing("down"));
        let summarizer = Summarizer::new(provider.clone(), task, BoundedPool::new(3), config(8));

        let outcome = summarizer.summarize(&text()).await.expect("summarize");
        assert_eq!(outcome, SummaryOutcome::NoSummaries);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_calls() {
        let (store, task) = task().await;
        store
            .set_status(task.job_id(), JobStatus::Canceled)
            .await
            .expect("cancel");
        let provider = Arc::new(MockProvider::fixed("never"));
        let summarizer = Summarizer::new(provider.clone(), task, BoundedPool::new(2), config(8));

        let err = summarizer.summarize(&text()).await.expect_err("canceled");
        assert!(err.is_cancellation());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_chunk_under_large_budget() {
        let (_store, task) = task().await;
        let provider = Arc::new(MockProvider::fixed("done"));
        let summarizer = Summarizer::new(provider.clone(), task, BoundedPool::new(2), config(10_000));

        summarizer.summarize(&text()).await.expect("summarize");
        assert_eq!(provider.call_count(), 2);
    }
}
