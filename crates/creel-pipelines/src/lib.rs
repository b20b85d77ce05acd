//! Creel Pipelines
//!
//! The three job pipelines and the pieces only they use:
//!
//! - [`FishTales`] crawls report sites, keeps recent reports and summarizes
//!   them through a completion provider ([`Summarizer`]).
//! - [`ShopReel`] pages a business listing search, enriches every shop from
//!   its website and exports a table.
//! - [`SiteScout`] finds shops with report pages that the FishTales site list
//!   is missing ([`reconcile`]).
//!
//! Jobs are created with [`submit`], which validates input first, and run
//! with each pipeline's `execute`, which records the outcome on the job.
//!
//! # Example
//!
//! ```ignore
//! let params = SiteScoutParams { shops_table, sites_table };
//! let task = submit(store.clone(), &params).await?;
//! let status = SiteScout::new().execute(&task, &params).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod chunking;
pub mod error;
#[allow(missing_docs)]
pub mod fish_tales;
#[allow(missing_docs)]
pub mod listing;
pub mod reconciler;
pub mod report_filter;
#[allow(missing_docs)]
pub mod shop_reel;
#[allow(missing_docs)]
pub mod site_scout;
pub mod submission;
pub mod summarizer;
#[allow(missing_docs)]
pub mod tabular;

// Re-export commonly used types
pub use chunking::{chunk_reports, estimate_tokens};
pub use error::{PipelineError, Result};
pub use fish_tales::{FishTales, FishTalesParams};
pub use listing::{
    fetch_listings, BusinessListing, ListingError, ListingQuery, ListingSearch, SerpApiClient,
};
pub use reconciler::{reconcile, Reconciliation};
pub use report_filter::{extract_date, ReportFilter};
pub use shop_reel::{ShopReel, ShopReelParams};
pub use site_scout::{SiteScout, SiteScoutParams};
pub use submission::{submit, JobParams};
pub use summarizer::{Summarizer, SummaryOutcome};
pub use tabular::{Cell, CsvCodec, Row, TabularCodec};
