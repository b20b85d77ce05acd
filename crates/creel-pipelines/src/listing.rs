//! Business listing search.
//!
//! [`ListingSearch`] is one page of a paged search. [`fetch_listings`] walks
//! pages until a short page or the result cap, checking for cancellation
//! before every request. [`SerpApiClient`] is the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use creel_core::ListingConfig;
use creel_jobs::Task;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::tabular::Row;

/// Placeholder written for shops without a website.
pub const NO_WEBSITE: &str = "No Website";

/// Errors from the listing search API.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing search needs an API key")]
    MissingApiKey,

    #[error("listing search returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("listing search request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One business record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessListing {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub category: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<u64>,
}

impl BusinessListing {
    /// Website, if present and not blank.
    pub fn website(&self) -> Option<&str> {
        self.website.as_deref().map(str::trim).filter(|w| !w.is_empty())
    }

    /// Rating as `r/5`, or `N/A`.
    pub fn rating_label(&self) -> String {
        self.rating
            .map_or_else(|| "N/A".to_string(), |rating| format!("{rating}/5"))
    }

    /// Row for the cached listing table.
    pub fn cache_row(&self) -> Row {
        Row::new()
            .with("Name", self.title.as_str())
            .with("Category", self.category.as_str())
            .with("Phone", self.phone.as_str())
            .with("Address", self.address.as_str())
            .with("Has Website", self.website().is_some())
            .with("Website", self.website().unwrap_or(NO_WEBSITE))
            .with("Rating", self.rating_label())
            .with("Reviews", self.reviews.unwrap_or(0).to_string())
    }

    /// Rebuild a listing from a cached table row (normalized headers).
    pub fn from_cache_row(row: &Row) -> Self {
        let website = row.text("website").filter(|w| w != NO_WEBSITE);
        let rating = row
            .text("rating")
            .and_then(|r| r.trim_end_matches("/5").trim().parse().ok());
        Self {
            title: row.text("name").unwrap_or_default(),
            category: row.text("category").unwrap_or_default(),
            phone: row.text("phone").unwrap_or_default(),
            address: row.text("address").unwrap_or_default(),
            website,
            rating,
            reviews: row.text("reviews").and_then(|r| r.parse().ok()),
        }
    }
}

/// Where and what to search.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub query: String,
    pub lat: f64,
    pub lng: f64,
}

/// One page of a paged listing search.
#[async_trait]
pub trait ListingSearch: Send + Sync {
    /// Records starting at offset `start`.
    async fn search_page(
        &self,
        query: &ListingQuery,
        start: usize,
    ) -> std::result::Result<Vec<BusinessListing>, ListingError>;
}

/// Fetch up to `max_results` listings in pages of `page_size`.
///
/// Stops at the first page shorter than `page_size`.
pub async fn fetch_listings(
    search: &dyn ListingSearch,
    query: &ListingQuery,
    max_results: usize,
    page_size: usize,
    task: &Task,
) -> Result<Vec<BusinessListing>> {
    let page_size = page_size.max(1);
    let mut listings = Vec::new();
    let mut start = 0;

    while start < max_results {
        task.check_canceled().await?;

        let page = search.search_page(query, start).await?;
        let count = page.len();
        tracing::debug!("Listing page at {} returned {} records", start, count);
        listings.extend(page);

        if count < page_size {
            break;
        }
        start += page_size;
    }

    Ok(listings)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    local_results: Vec<BusinessListing>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps search over the SerpAPI JSON endpoint.
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    client: reqwest::Client,
    base_url: String,
    engine: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(config: &ListingConfig, api_key: Option<&str>) -> std::result::Result<Self, ListingError> {
        let api_key = api_key
            .or(config.api_key.as_deref())
            .filter(|k| !k.is_empty())
            .ok_or(ListingError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            engine: config.engine.clone(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ListingSearch for SerpApiClient {
    async fn search_page(
        &self,
        query: &ListingQuery,
        start: usize,
    ) -> std::result::Result<Vec<BusinessListing>, ListingError> {
        let ll = format!("@{},{},10z", query.lat, query.lng);
        let start = start.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query.query.as_str()),
                ("ll", ll.as_str()),
                ("start", start.as_str()),
                ("type", "search"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ListingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response.json().await?;
        if let Some(message) = body.error {
            // The API reports an exhausted result set as an error.
            if message.contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(ListingError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body.local_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creel_core::JobKind;
    use creel_jobs::{cancel_job, Cancellable, JobStore, MemoryJobStore};
    use std::sync::{Arc, Mutex};

    struct FakeSearch {
        total: usize,
        starts: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ListingSearch for FakeSearch {
        async fn search_page(
            &self,
            _query: &ListingQuery,
            start: usize,
        ) -> std::result::Result<Vec<BusinessListing>, ListingError> {
            self.starts.lock().expect("lock").push(start);
            let end = self.total.min(start + 20);
            Ok((start..end)
                .map(|i| BusinessListing {
                    title: format!("Shop {i}"),
                    ..BusinessListing::default()
                })
                .collect())
        }
    }

    fn query() -> ListingQuery {
        ListingQuery {
            query: "fly shop".to_string(),
            lat: 45.6,
            lng: -111.0,
        }
    }

    async fn task() -> (Arc<MemoryJobStore>, Task) {
        let store = Arc::new(MemoryJobStore::new());
        let job = store.create(JobKind::ShopReel).await.expect("job");
        let task = Task::new(store.clone(), job.id);
        (store, task)
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let (_store, task) = task().await;
        let search = FakeSearch {
            total: 45,
            starts: Mutex::new(Vec::new()),
        };
        let listings = fetch_listings(&search, &query(), 100, 20, &task)
            .await
            .expect("fetch");
        assert_eq!(listings.len(), 45);
        assert_eq!(*search.starts.lock().expect("lock"), vec![0, 20, 40]);
    }

    #[tokio::test]
    async fn test_respects_max_results() {
        let (_store, task) = task().await;
        let search = FakeSearch {
            total: 500,
            starts: Mutex::new(Vec::new()),
        };
        let listings = fetch_listings(&search, &query(), 40, 20, &task)
            .await
            .expect("fetch");
        assert_eq!(listings.len(), 40);
        assert_eq!(*search.starts.lock().expect("lock"), vec![0, 20]);
    }

    #[tokio::test]
    async fn test_cancel_before_first_page() {
        let (store, task) = task().await;
        cancel_job(store.as_ref(), task.job_id()).await.expect("cancel");
        let search = FakeSearch {
            total: 10,
            starts: Mutex::new(Vec::new()),
        };
        let err = fetch_listings(&search, &query(), 100, 20, &task)
            .await
            .expect_err("canceled");
        assert!(err.is_cancellation());
        assert!(search.starts.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_cache_row_round_trip() {
        let listing = BusinessListing {
            title: "Bozeman Angler".to_string(),
            category: "Fishing store".to_string(),
            phone: "(406) 555-0100".to_string(),
            address: "23 E Main St".to_string(),
            website: Some("https://bozemanangler.com/".to_string()),
            rating: Some(4.8),
            reviews: Some(312),
        };
        let row = listing.cache_row();
        assert_eq!(row.text("Rating").as_deref(), Some("4.8/5"));
        assert_eq!(row.text("Has Website").as_deref(), Some("true"));

        let bytes = crate::tabular::TabularCodec::write(&crate::tabular::CsvCodec, &[row]).expect("write");
        let rows = crate::tabular::TabularCodec::read(&crate::tabular::CsvCodec, &bytes, &[]).expect("read");
        assert_eq!(BusinessListing::from_cache_row(&rows[0]), listing);
    }

    #[test]
    fn test_listing_without_website() {
        let listing = BusinessListing {
            title: "River Guides".to_string(),
            ..BusinessListing::default()
        };
        let row = listing.cache_row();
        assert_eq!(row.text("Website").as_deref(), Some(NO_WEBSITE));
        assert_eq!(row.text("Rating").as_deref(), Some("N/A"));

        let bytes = crate::tabular::TabularCodec::write(&crate::tabular::CsvCodec, &[row]).expect("write");
        let rows = crate::tabular::TabularCodec::read(&crate::tabular::CsvCodec, &bytes, &[]).expect("read");
        let back = BusinessListing::from_cache_row(&rows[0]);
        assert_eq!(back.website, None);
        assert_eq!(back.rating, None);
    }

    #[test]
    fn test_deserialize_serpapi_record() {
        let json = r#"{"local_results":[{"title":"Bozeman Angler","type":"Fishing store","rating":4.8,"reviews":312,"website":"https://bozemanangler.com/","gps_coordinates":{"latitude":45.6}}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.local_results[0].category, "Fishing store");
        assert_eq!(parsed.local_results[0].reviews, Some(312));
    }
}
