//! ShopReel: find fly shops, enrich them from their websites, export a table.

use std::sync::Arc;

use creel_browser::BrowserSession;
use creel_core::{AppConfig, JobKind};
use creel_jobs::{FileSlot, JobStatus, Task};
use creel_scanner::{DetailScraper, ShopDetails};

use crate::error::{PipelineError, Result};
use crate::listing::{fetch_listings, BusinessListing, ListingQuery, ListingSearch, NO_WEBSITE};
use crate::submission::{invalid, with_browser, JobParams};
use crate::tabular::{CsvCodec, Row, TabularCodec};

/// Input to a ShopReel job.
#[derive(Debug, Clone)]
pub struct ShopReelParams {
    /// Previously exported listing table; skips the search API when present
    pub cached_shops: Option<Vec<u8>>,
    pub query: String,
    pub lat: f64,
    pub lng: f64,
    pub max_results: usize,
}

impl ShopReelParams {
    #[must_use]
    pub fn new(query: impl Into<String>, lat: f64, lng: f64, config: &AppConfig) -> Self {
        Self {
            cached_shops: None,
            query: query.into(),
            lat,
            lng,
            max_results: config.listing.default_max_results,
        }
    }

    #[must_use]
    pub fn with_cached_shops(mut self, table: Vec<u8>) -> Self {
        self.cached_shops = Some(table);
        self
    }
}

impl JobParams for ShopReelParams {
    const KIND: JobKind = JobKind::ShopReel;

    fn validate(&self) -> Result<()> {
        if let Some(table) = &self.cached_shops {
            if table.iter().all(u8::is_ascii_whitespace) {
                return Err(invalid("cached shop file is empty"));
            }
            return Ok(());
        }
        if self.query.trim().is_empty() {
            return Err(invalid("search query is required"));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(invalid(format!(
                "coordinates out of range: {}, {}",
                self.lat, self.lng
            )));
        }
        if self.max_results == 0 {
            return Err(invalid("max results must be at least 1"));
        }
        Ok(())
    }
}

/// One exported shop row.
#[must_use]
pub fn export_row(listing: &BusinessListing, details: &ShopDetails) -> Row {
    Row::new()
        .with("Name", listing.title.as_str())
        .with("Category", listing.category.as_str())
        .with("Phone", listing.phone.as_str())
        .with("Address", listing.address.as_str())
        .with("Email", details.email.as_str())
        .with("Has Website", listing.website().is_some())
        .with("Website", listing.website().unwrap_or(NO_WEBSITE))
        .with("Sells Online", details.sells_online.to_string())
        .with("Rating", listing.rating_label())
        .with("Reviews", listing.reviews.unwrap_or(0).to_string())
        .with("Has Report", details.fishing_report.to_string())
        .with("Socials", details.socials.clone())
}

/// Runs ShopReel jobs.
pub struct ShopReel {
    session: Arc<BrowserSession>,
    search: Option<Arc<dyn ListingSearch>>,
    codec: Arc<dyn TabularCodec>,
    concurrency: usize,
    page_size: usize,
}

impl std::fmt::Debug for ShopReel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopReel")
            .field("has_search", &self.search.is_some())
            .field("concurrency", &self.concurrency)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl ShopReel {
    pub fn new(session: Arc<BrowserSession>, concurrency: usize) -> Self {
        Self {
            session,
            search: None,
            codec: Arc::new(CsvCodec),
            concurrency,
            page_size: 20,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: Arc<dyn ListingSearch>, page_size: usize) -> Self {
        self.search = Some(search);
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn TabularCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Run the job behind `task` and record its outcome.
    pub async fn execute(&self, task: &Task, params: &ShopReelParams) -> creel_jobs::Result<JobStatus> {
        let outcome = with_browser(&self.session, self.run(task, params)).await;
        task.finish(outcome).await
    }

    /// Pipeline body; returns the completion message.
    ///
    /// The browser session must already be launched.
    pub async fn run(&self, task: &Task, params: &ShopReelParams) -> Result<String> {
        task.add_message("Searching for shops...").await?;
        let listings = self.listings(task, params).await?;
        task.add_message(format!("Found {} shops.", listings.len()))
            .await?;
        if listings.is_empty() {
            return Ok("No shops found.".to_string());
        }

        let websites: Vec<Option<String>> = listings
            .iter()
            .map(|listing| listing.website().map(str::to_string))
            .collect();
        let scraper = DetailScraper::new(self.session.clone(), task.clone(), self.concurrency);
        let details = scraper.scrape_all(&websites).await?;
        tracing::info!(
            "Enriched {} shops from {} distinct websites",
            details.len(),
            scraper.cache().len()
        );

        task.check_canceled().await?;
        task.add_message("Writing shop data...").await?;
        if details.len() != listings.len() {
            return Err(PipelineError::Table(format!(
                "{} shops but {} detail records",
                listings.len(),
                details.len()
            )));
        }
        let rows: Vec<Row> = listings
            .iter()
            .zip(&details)
            .map(|(listing, details)| export_row(listing, details))
            .collect();
        task.attach_file(FileSlot::Primary, self.codec.write(&rows)?)
            .await?;

        Ok("Finished!".to_string())
    }

    async fn listings(&self, task: &Task, params: &ShopReelParams) -> Result<Vec<BusinessListing>> {
        if let Some(table) = &params.cached_shops {
            let rows = self.codec.read(table, &[])?;
            tracing::info!("Using {} cached shops", rows.len());
            return Ok(rows.iter().map(BusinessListing::from_cache_row).collect());
        }

        let search = self
            .search
            .as_deref()
            .ok_or_else(|| invalid("listing search is not configured"))?;
        let query = ListingQuery {
            query: params.query.clone(),
            lat: params.lat,
            lng: params.lng,
        };
        let listings =
            fetch_listings(search, &query, params.max_results, self.page_size, task).await?;

        if !listings.is_empty() {
            let rows: Vec<Row> = listings.iter().map(BusinessListing::cache_row).collect();
            task.attach_file(FileSlot::Secondary, self.codec.write(&rows)?)
                .await?;
        }
        Ok(listings)
    }
}
