//! Job runner: submit, drive to completion (or Ctrl-C), write outputs.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use creel_browser::{BrowserSession, ChromiumDriver};
use creel_core::AppConfig;
use creel_jobs::{cancel_job, cleanup_jobs, job_updates, JobStatus, JobStore, SqliteJobStore, Task};
use creel_llm::provider_from_config;
use creel_pipelines::{
    submit, FishTales, FishTalesParams, SerpApiClient, ShopReel, ShopReelParams, SiteScout,
    SiteScoutParams,
};
use tracing::{info, warn};

pub struct FishTalesOptions {
    pub sites: PathBuf,
    pub depth: Option<usize>,
    pub max_age_days: Option<i64>,
    pub rivers: Vec<String>,
    pub token_limit: Option<usize>,
    pub model: Option<String>,
    pub site_list: bool,
    pub api_key: Option<String>,
}

pub struct ShopReelOptions {
    pub query: String,
    pub lat: f64,
    pub lng: f64,
    pub max_results: Option<usize>,
    pub cached: Option<PathBuf>,
    pub serp_api_key: Option<String>,
}

pub struct Runner {
    config: AppConfig,
    store: Arc<dyn JobStore>,
    out: PathBuf,
}

impl Runner {
    pub async fn open(config: AppConfig, database: &Path, out: PathBuf) -> Result<Self> {
        if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let store = SqliteJobStore::open(database).await?;
        Ok(Self {
            config,
            store: Arc::new(store),
            out,
        })
    }

    fn session(&self) -> Arc<BrowserSession> {
        Arc::new(BrowserSession::new(
            Arc::new(ChromiumDriver::new()),
            self.config.browser.clone(),
        ))
    }

    pub async fn fish_tales(&self, options: FishTalesOptions) -> Result<()> {
        let sites = read_file(&options.sites)?;
        let mut params = FishTalesParams::from_config(sites, &self.config);
        if let Some(depth) = options.depth {
            params.crawl_depth = depth;
        }
        if let Some(days) = options.max_age_days {
            params.max_age_days = days;
        }
        if let Some(limit) = options.token_limit {
            params.token_limit = limit;
        }
        if let Some(model) = options.model {
            params.model = model;
        }
        params.filter_by_rivers = !options.rivers.is_empty();
        params.river_list = options.rivers;
        params.include_site_list |= options.site_list;

        let provider = provider_from_config(&self.config.llm, options.api_key.as_deref())?;
        let pipeline = FishTales::new(self.session(), provider, self.config.pipeline.concurrency)
            .with_default_selector(self.config.crawl.default_selector.clone());

        let task = submit(self.store.clone(), &params).await?;
        self.drive(&task, pipeline.execute(&task, &params)).await
    }

    pub async fn shop_reel(&self, options: ShopReelOptions) -> Result<()> {
        let mut params = ShopReelParams::new(options.query, options.lat, options.lng, &self.config);
        if let Some(max) = options.max_results {
            params.max_results = max;
        }

        let mut pipeline = ShopReel::new(self.session(), self.config.pipeline.concurrency);
        match &options.cached {
            Some(path) => params = params.with_cached_shops(read_file(path)?),
            None => {
                let client = SerpApiClient::new(&self.config.listing, options.serp_api_key.as_deref())?;
                pipeline = pipeline.with_search(Arc::new(client), self.config.listing.page_size);
            }
        }

        let task = submit(self.store.clone(), &params).await?;
        self.drive(&task, pipeline.execute(&task, &params)).await
    }

    pub async fn site_scout(&self, shops: &Path, sites: &Path) -> Result<()> {
        let params = SiteScoutParams {
            shops_table: read_file(shops)?,
            sites_table: read_file(sites)?,
        };
        let task = submit(self.store.clone(), &params).await?;
        self.drive(&task, SiteScout::new().execute(&task, &params))
            .await
    }

    pub async fn cleanup(&self, keep: Option<usize>) -> Result<()> {
        let keep = keep.unwrap_or(self.config.jobs.keep_completed_per_kind);
        let report = cleanup_jobs(self.store.as_ref(), keep).await?;
        println!(
            "Removed {} jobs ({} failed or canceled, {} old completed)",
            report.total(),
            report.unsuccessful_deleted,
            report.completed_deleted
        );
        Ok(())
    }

    /// Await `run`, canceling the job on Ctrl-C, then print and save results.
    async fn drive<F>(&self, task: &Task, run: F) -> Result<()>
    where
        F: Future<Output = creel_jobs::Result<JobStatus>>,
    {
        tokio::pin!(run);
        let status = tokio::select! {
            status = &mut run => status?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, canceling job {}", task.job_id());
                if let Err(e) = cancel_job(self.store.as_ref(), task.job_id()).await {
                    warn!("Failed to mark job canceled: {}", e);
                }
                task.token().cancel();
                run.await?
            }
        };

        let update = job_updates(self.store.as_ref(), task.job_id()).await?;
        println!("{}", update.message);
        println!("Job {} {}", task.job_id(), status);

        if !update.files.is_empty() {
            std::fs::create_dir_all(&self.out)
                .with_context(|| format!("failed to create {}", self.out.display()))?;
        }
        for file in update.files {
            let path = self.out.join(&file.name);
            std::fs::write(&path, &file.bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }

        if status == JobStatus::Failed {
            anyhow::bail!("job {} failed", task.job_id());
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
