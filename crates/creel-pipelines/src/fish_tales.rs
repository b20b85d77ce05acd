//! FishTales: crawl report sites, keep recent reports, summarize them.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use creel_browser::BrowserSession;
use creel_core::{AppConfig, JobKind, SummarizerConfig};
use creel_jobs::{Cancellable, FileSlot, JobStatus, Task};
use creel_llm::LlmProvider;
use creel_scanner::{BoundedPool, CrawlOutcome, CrawlSite, Crawler, ScanError, DIVIDER};

use crate::error::Result;
use crate::report_filter::ReportFilter;
use crate::submission::{invalid, with_browser, JobParams};
use crate::summarizer::{Summarizer, SummaryOutcome};
use crate::tabular::{CsvCodec, Row, TabularCodec};

/// List columns of the sites table, in both spellings.
pub const SITE_LIST_COLUMNS: &[&str] = &[
    "keywords",
    "junk-words",
    "junk_words",
    "click-phrases",
    "click_phrases",
];

/// Input to a FishTales job.
#[derive(Debug, Clone)]
pub struct FishTalesParams {
    /// Sites table (`url`, `keywords`, `junk-words`, `click-phrases`, `selector`)
    pub sites_table: Vec<u8>,
    pub max_age_days: i64,
    pub filter_by_rivers: bool,
    pub river_list: Vec<String>,
    pub include_site_list: bool,
    pub token_limit: usize,
    pub crawl_depth: usize,
    pub model: String,
    pub summary_prompt: String,
    pub merge_prompt: String,
}

impl FishTalesParams {
    /// Parameters with every tunable taken from `config`.
    #[must_use]
    pub fn from_config(sites_table: Vec<u8>, config: &AppConfig) -> Self {
        Self {
            sites_table,
            max_age_days: config.summarizer.max_age_days,
            filter_by_rivers: false,
            river_list: Vec::new(),
            include_site_list: config.crawl.include_site_list,
            token_limit: config.summarizer.token_limit,
            crawl_depth: config.crawl.default_depth,
            model: config.summarizer.model.clone(),
            summary_prompt: config.summarizer.summary_prompt.clone(),
            merge_prompt: config.summarizer.merge_prompt.clone(),
        }
    }

    fn rivers(&self) -> Option<Vec<String>> {
        self.filter_by_rivers.then(|| self.river_list.clone())
    }

    fn summarizer_config(&self) -> SummarizerConfig {
        SummarizerConfig {
            token_limit: self.token_limit,
            model: self.model.clone(),
            summary_prompt: self.summary_prompt.clone(),
            merge_prompt: self.merge_prompt.clone(),
            max_age_days: self.max_age_days,
        }
    }
}

impl JobParams for FishTalesParams {
    const KIND: JobKind = JobKind::FishTales;

    fn validate(&self) -> Result<()> {
        if self.sites_table.iter().all(u8::is_ascii_whitespace) {
            return Err(invalid("sites file is empty"));
        }
        if self.crawl_depth == 0 {
            return Err(invalid("crawl depth must be at least 1"));
        }
        if self.token_limit == 0 {
            return Err(invalid("token limit must be at least 1"));
        }
        if self.max_age_days < 0 {
            return Err(invalid("max age must not be negative"));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model is required"));
        }
        if self.summary_prompt.trim().is_empty() || self.merge_prompt.trim().is_empty() {
            return Err(invalid("summary and merge prompts are required"));
        }
        if self.filter_by_rivers && self.river_list.iter().all(|r| r.trim().is_empty()) {
            return Err(invalid("river filtering needs at least one river"));
        }
        Ok(())
    }
}

/// Build crawl sites from table rows, first occurrence of a URL wins.
#[must_use]
pub fn sites_from_rows(rows: &[Row]) -> Vec<CrawlSite> {
    let mut seen = HashSet::new();
    let mut sites = Vec::new();

    for row in rows {
        let Some(url) = row.text("url") else {
            tracing::warn!("Skipping site row without a url");
            continue;
        };
        let site = CrawlSite::new(&url)
            .with_keywords(either_list(row, "keywords", "keywords"))
            .with_junk_words(either_list(row, "junk-words", "junk_words"))
            .with_click_phrases(either_list(row, "click-phrases", "click_phrases"));
        let site = match row.text("selector") {
            Some(selector) => site.with_selector(selector),
            None => site,
        };

        if seen.insert(site.url.clone()) {
            sites.push(site);
        } else {
            tracing::warn!("Duplicate site {} ignored", site.url);
        }
    }
    sites
}

fn either_list(row: &Row, key: &str, alt: &str) -> Vec<String> {
    let items = row.list(key);
    if items.is_empty() {
        row.list(alt)
    } else {
        items
    }
}

/// Runs FishTales jobs.
pub struct FishTales {
    session: Arc<BrowserSession>,
    provider: Arc<dyn LlmProvider>,
    codec: Arc<dyn TabularCodec>,
    concurrency: usize,
    default_selector: String,
    today: Option<NaiveDate>,
}

impl std::fmt::Debug for FishTales {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FishTales")
            .field("provider", &self.provider.provider_id())
            .field("concurrency", &self.concurrency)
            .field("default_selector", &self.default_selector)
            .finish_non_exhaustive()
    }
}

impl FishTales {
    pub fn new(session: Arc<BrowserSession>, provider: Arc<dyn LlmProvider>, concurrency: usize) -> Self {
        Self {
            session,
            provider,
            codec: Arc::new(CsvCodec),
            concurrency,
            default_selector: "body".to_string(),
            today: None,
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn TabularCodec>) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_default_selector(mut self, selector: impl Into<String>) -> Self {
        self.default_selector = selector.into();
        self
    }

    /// Pin the date reports are aged against.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Run the job behind `task` and record its outcome.
    pub async fn execute(&self, task: &Task, params: &FishTalesParams) -> creel_jobs::Result<JobStatus> {
        let outcome = with_browser(&self.session, self.run(task, params)).await;
        task.finish(outcome).await
    }

    /// Pipeline body; returns the completion message.
    ///
    /// The browser session must already be launched.
    pub async fn run(&self, task: &Task, params: &FishTalesParams) -> Result<String> {
        task.add_message("Reading Sites from file...").await?;
        let rows = self.codec.read(&params.sites_table, SITE_LIST_COLUMNS)?;
        let sites = sites_from_rows(&rows);
        if sites.is_empty() {
            return Err(invalid("no sites found in file"));
        }
        task.update_message(format!("Found {} sites to scrape!", sites.len()))
            .await?;

        let outcomes = self.crawl_sites(task, &sites, params.crawl_depth).await?;
        log_failures(&outcomes);

        if params.include_site_list {
            let listing: String = outcomes.iter().map(CrawlOutcome::site_list_text).collect();
            task.attach_file(FileSlot::Secondary, listing.into_bytes()).await?;
        }

        let reports: Vec<_> = outcomes.into_iter().flat_map(|o| o.reports).collect();
        task.add_message(format!("Found {} total reports!", reports.len()))
            .await?;
        if reports.is_empty() {
            return Ok("No reports found".to_string());
        }

        task.add_message("Compiling reports...").await?;
        let filter = ReportFilter {
            max_age_days: params.max_age_days,
            rivers: params.rivers(),
        };
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let compiled = filter
            .apply(reports, today)
            .iter()
            .map(creel_scanner::Report::render)
            .collect::<Vec<_>>()
            .join(DIVIDER);
        task.add_message("Compiling complete!").await?;

        task.check_canceled().await?;
        task.add_message("Generating report summary...").await?;
        let summarizer = Summarizer::new(
            self.provider.clone(),
            task.clone(),
            BoundedPool::new(self.concurrency),
            params.summarizer_config(),
        );
        match summarizer.summarize(&compiled).await? {
            SummaryOutcome::Summary(summary) => {
                task.attach_file(FileSlot::Primary, summary.into_bytes())
                    .await?;
            }
            SummaryOutcome::NoSummaries => {
                task.add_message("No summaries generated. Skipping final summary.")
                    .await?;
            }
        }

        Ok("Finished!".to_string())
    }

    async fn crawl_sites(&self, task: &Task, sites: &[CrawlSite], depth: usize) -> Result<Vec<CrawlOutcome>> {
        task.check_canceled().await?;
        task.add_message(format!("Scraping sites (0/{}) for reports...", sites.len()))
            .await?;

        let crawler = &Crawler::new(self.session.clone(), task.clone())
            .with_default_selector(self.default_selector.clone());
        let progress = &task.progress(sites.len(), |done, total| {
            format!("Scraping sites ({done}/{total}) for reports...")
        });

        let outcomes = BoundedPool::new(self.concurrency)
            .run_or(
                sites,
                move |_, site| async move {
                    task.check_canceled().await?;
                    let outcome = crawler.crawl(site, depth).await;
                    if !matches!(&outcome, Err(e) if e.is_cancellation()) {
                        if let Err(e) = progress.tick().await {
                            tracing::warn!("Failed to record crawl progress: {}", e);
                        }
                    }
                    outcome
                },
                |index, e: &ScanError| CrawlOutcome::failed(&sites[index], depth, e),
            )
            .await?;
        Ok(outcomes)
    }
}

fn log_failures(outcomes: &[CrawlOutcome]) {
    let failures: Vec<&str> = outcomes
        .iter()
        .flat_map(|o| o.failures.iter().map(String::as_str))
        .collect();
    if !failures.is_empty() {
        tracing::warn!(
            "{} crawl failures:\n  {}",
            failures.len(),
            failures.join("\n  ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FishTalesParams {
        FishTalesParams::from_config(b"url\nhttps://river.com\n".to_vec(), &AppConfig::default())
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut empty = params();
        empty.sites_table = b"  \n".to_vec();
        assert!(empty.validate().is_err());

        let mut shallow = params();
        shallow.crawl_depth = 0;
        assert!(shallow.validate().is_err());

        let mut rivers = params();
        rivers.filter_by_rivers = true;
        assert!(rivers.validate().is_err());
        rivers.river_list = vec!["Madison".to_string()];
        assert!(rivers.validate().is_ok());
    }

    #[test]
    fn test_sites_from_rows_dedupes_by_normalized_url() {
        let csv = "URL,Keywords,Junk Words,Click-Phrases,Selector\n\
                   https://river.com/,\"report, conditions\",archive,read more,#main\n\
                   https://river.com?ref=x,other,,,\n\
                   ,report,,,\n\
                   https://lake.com,report,,,\n";
        let rows = CsvCodec.read(csv.as_bytes(), SITE_LIST_COLUMNS).expect("read");
        let sites = sites_from_rows(&rows);

        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].url, "https://river.com");
        assert_eq!(sites[0].keywords, vec!["report", "conditions"]);
        assert_eq!(sites[0].junk_words, vec!["archive"]);
        assert_eq!(sites[0].click_phrases, vec!["read more"]);
        assert_eq!(sites[0].selector.as_deref(), Some("#main"));
        assert_eq!(sites[1].url, "https://lake.com");
        assert_eq!(sites[1].selector, None);
    }
}
