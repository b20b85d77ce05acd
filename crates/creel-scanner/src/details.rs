//! Per-shop website enrichment.
//!
//! [`DetailScraper`] visits each shop's website once per job and reads off an
//! email address, storefront and report signals, and social links. Results
//! are cached by normalized URL for the lifetime of the scraper, so shops
//! sharing a website cost one visit.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use creel_browser::{BrowserSession, PageDriver};
use creel_core::urls::normalize_url;
use creel_jobs::{Cancellable, Task};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::extract::ShopSignals;
use crate::pool::BoundedPool;

/// Statuses that short-circuit a shop to the blocked fallback.
pub const BLOCKED_STATUSES: [u16; 2] = [403, 429];

pub const NO_EMAIL: &str = "No Email";
pub const ERROR_EMAIL: &str = "Errored while checking for an email";
pub const ERROR_SHOP: &str = "Errored while checking for an online shop";
pub const ERROR_REPORT: &str = "Errored while checking for reports";
pub const ERROR_SOCIAL: &str = "Error while checking for social media";
pub const ERROR_LOAD_FAILED: &str = "Page load failed";

/// Message used in every field when a site refuses the visit.
#[must_use]
pub fn blocked_message(status: u16) -> String {
    format!("Blocked or Forbidden link (HTTP {status})")
}

/// A yes/no finding, or a note explaining why there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Found(bool),
    Note(String),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(found) => write!(f, "{found}"),
            Self::Note(note) => f.write_str(note),
        }
    }
}

/// What a shop's website revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopDetails {
    pub email: String,
    pub sells_online: Signal,
    pub fishing_report: Signal,
    pub socials: Vec<String>,
}

impl ShopDetails {
    /// Shop without a website.
    #[must_use]
    pub fn none() -> Self {
        Self {
            email: String::new(),
            sells_online: Signal::Found(false),
            fishing_report: Signal::Found(false),
            socials: vec![String::new()],
        }
    }

    /// Site answered with a denial status.
    #[must_use]
    pub fn blocked(status: u16) -> Self {
        let message = blocked_message(status);
        Self {
            email: message.clone(),
            sells_online: Signal::Note(message.clone()),
            fishing_report: Signal::Note(message.clone()),
            socials: vec![message],
        }
    }

    /// Site never loaded.
    #[must_use]
    pub fn timeout() -> Self {
        Self {
            email: ERROR_LOAD_FAILED.to_string(),
            sells_online: Signal::Note(ERROR_LOAD_FAILED.to_string()),
            fishing_report: Signal::Note(ERROR_LOAD_FAILED.to_string()),
            socials: vec![ERROR_LOAD_FAILED.to_string()],
        }
    }

    /// Site loaded but could not be inspected.
    #[must_use]
    pub fn error() -> Self {
        Self {
            email: ERROR_EMAIL.to_string(),
            sells_online: Signal::Note(ERROR_SHOP.to_string()),
            fishing_report: Signal::Note(ERROR_REPORT.to_string()),
            socials: vec![ERROR_SOCIAL.to_string()],
        }
    }
}

/// Write-once results keyed by normalized website URL.
///
/// Concurrent lookups of the same key share one computation. A computation
/// that fails leaves the key empty for the next caller.
#[derive(Debug, Default)]
pub struct DetailCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<ShopDetails>>>>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<OnceCell<ShopDetails>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.to_string()).or_default().clone()
    }

    /// Cached details for `key`, if computed.
    pub fn get(&self, key: &str) -> Option<ShopDetails> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Return the cached value for `key`, computing it with `compute` if absent.
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: &str, compute: F) -> std::result::Result<ShopDetails, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<ShopDetails, E>>,
    {
        let cell = self.slot(key);
        cell.get_or_try_init(compute).await.cloned()
    }

    /// Number of computed entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Enriches shops with details from their websites.
pub struct DetailScraper {
    session: Arc<BrowserSession>,
    task: Task,
    pool: BoundedPool,
    cache: DetailCache,
}

impl fmt::Debug for DetailScraper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetailScraper")
            .field("task", &self.task)
            .field("pool", &self.pool)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl DetailScraper {
    /// Create a scraper for one job run with its own empty cache.
    pub fn new(session: Arc<BrowserSession>, task: Task, concurrency: usize) -> Self {
        Self {
            session,
            task,
            pool: BoundedPool::new(concurrency),
            cache: DetailCache::new(),
        }
    }

    pub fn cache(&self) -> &DetailCache {
        &self.cache
    }

    /// Details for every website, aligned with the input.
    ///
    /// `None` or blank websites get [`ShopDetails::none`] without a visit.
    /// The session must already be launched.
    pub async fn scrape_all(&self, websites: &[Option<String>]) -> Result<Vec<ShopDetails>> {
        let total = websites.len();
        self.task
            .add_message(format!("Scraping shops (0/{total})"))
            .await?;
        let progress = self
            .task
            .progress(total, |done, total| format!("Scraping shops ({done}/{total})"));

        let progress = &progress;
        let details = self
            .pool
            .run_or(
                websites,
                move |_, website| async move {
                    let outcome = self.details_for(website.as_deref()).await;
                    match &outcome {
                        Err(e) if e.is_cancellation() => {}
                        _ => {
                            if let Err(e) = progress.tick().await {
                                tracing::warn!("Failed to record shop progress: {}", e);
                            }
                        }
                    }
                    outcome
                },
                |index, e| {
                    tracing::warn!("Failed to get details for shop {}: {}", index, e);
                    ShopDetails::error()
                },
            )
            .await?;

        self.task.update_message("Scraping Complete").await?;
        Ok(details)
    }

    /// Details for one website, from cache when possible.
    pub async fn details_for(&self, website: Option<&str>) -> Result<ShopDetails> {
        let Some(website) = website.map(str::trim).filter(|w| !w.is_empty()) else {
            return Ok(ShopDetails::none());
        };
        self.task.check_canceled().await?;

        let url = normalize_url(website);
        self.cache
            .get_or_try_insert(&url, || self.scrape_site(&url))
            .await
    }

    async fn scrape_site(&self, url: &str) -> Result<ShopDetails> {
        self.task.check_canceled().await?;
        let page = self.session.new_page().await?;
        let outcome = self.inspect(page.as_ref(), url).await;
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }
        outcome
    }

    async fn inspect(&self, page: &dyn PageDriver, url: &str) -> Result<ShopDetails> {
        match self.session.load(page, url).await {
            Ok(Some(status)) if BLOCKED_STATUSES.contains(&status) => {
                return Ok(ShopDetails::blocked(status));
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(status) = e.blocked_status().filter(|s| BLOCKED_STATUSES.contains(s)) {
                    return Ok(ShopDetails::blocked(status));
                }
                tracing::warn!("Could not load {}: {}", url, e);
                return Ok(ShopDetails::timeout());
            }
        }

        let signals = match Self::read_signals(page, url).await {
            Ok(signals) => signals,
            Err(e) => {
                tracing::warn!("Could not read {}: {}", url, e);
                return Ok(ShopDetails::error());
            }
        };

        let email = self.find_email(page, signals.clone()).await;
        self.task.check_canceled().await?;

        Ok(ShopDetails {
            email,
            sells_online: Signal::Found(signals.sells_online),
            fishing_report: Signal::Found(signals.has_report_link),
            socials: signals.socials,
        })
    }

    async fn read_signals(page: &dyn PageDriver, fallback_url: &str) -> Result<ShopSignals> {
        let html = page.content().await?;
        let base = page
            .current_url()
            .await
            .unwrap_or_else(|_| fallback_url.to_string());
        ShopSignals::from_html(&html, &base)
    }

    /// Email from the page, or from its contact page at most one hop away.
    async fn find_email(&self, page: &dyn PageDriver, home: ShopSignals) -> String {
        let mut signals = home;
        let mut on_contact_page = false;

        loop {
            if let Some(email) = signals.email() {
                return email.to_string();
            }
            if on_contact_page {
                return NO_EMAIL.to_string();
            }
            let Some(contact) = signals.contact_link.clone() else {
                return NO_EMAIL.to_string();
            };
            on_contact_page = true;

            if let Err(e) = self.session.load(page, &contact).await {
                tracing::debug!("Contact page {} failed: {}", contact, e);
                return ERROR_EMAIL.to_string();
            }
            signals = match Self::read_signals(page, &contact).await {
                Ok(signals) => signals,
                Err(e) => {
                    tracing::debug!("Contact page {} unreadable: {}", contact, e);
                    return ERROR_EMAIL.to_string();
                }
            };
        }
    }
}
