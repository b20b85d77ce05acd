//! Creel Scanner - Site crawling and per-shop enrichment.
//!
//! This crate turns a browser session into report text and shop details. It
//! provides the bounded pool every pipeline phase fans out through, the
//! link-scoring crawler that collects fishing reports, and the detail
//! scraper that reads contact and storefront signals off shop websites.
//!
//! # Features
//!
//! - Bounded concurrency with input-ordered results and cancellation abort
//! - Priority crawl frontier with insertion-order tie-breaking
//! - Keyword, junk-word and click-phrase link scoring
//! - Write-once per-job detail cache keyed by normalized URL
//!
//! # Example
//!
//! ```rust,ignore
//! use creel_scanner::{Crawler, CrawlSite};
//!
//! let crawler = Crawler::new(session.clone(), task.clone());
//! let site = CrawlSite::new("https://river.com").with_keywords(["report"]);
//! let outcome = crawler.crawl(&site, 25).await?;
//! println!("{}", outcome.site_list_text());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod crawler;
#[allow(missing_docs)]
pub mod details;
pub mod error;
pub mod extract;
pub mod pool;
#[allow(missing_docs)]
pub mod queue;
pub mod report;
#[allow(missing_docs)]
pub mod scoring;

// Re-export commonly used types
pub use crawler::{CrawlOutcome, Crawler};
pub use details::{DetailCache, DetailScraper, ShopDetails, Signal};
pub use error::{Result, ScanError};
pub use pool::BoundedPool;
pub use queue::{CrawlQueue, CrawlQueueItem};
pub use report::{Report, DIVIDER};
pub use scoring::{includes_any, score_link, CrawlSite, LinkScore};
