//! Priority-driven, depth-bounded crawl of one site.
//!
//! The root is always visited first. After that, same-domain links are
//! followed in score order until `depth` distinct pages have been visited or
//! nothing worth following is left. Each non-root page contributes its
//! visible text as a [`Report`]. A page that fails to load is recorded and
//! skipped; only cancellation ends a crawl early.

use std::collections::HashSet;
use std::sync::Arc;

use creel_browser::{BrowserSession, PageDriver};
use creel_core::urls::{normalize_url, same_domain};
use creel_jobs::Task;
use scraper::Selector;

use crate::error::Result;
use crate::extract::{extract_page, parse_selector};
use crate::queue::CrawlQueue;
use crate::report::{Report, DIVIDER};
use crate::scoring::{score_link, CrawlSite};

/// Queue priority of the root page; below every link score.
pub const ROOT_PRIORITY: i64 = -1;

/// Everything one site crawl produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// Normalized root URL
    pub site_url: String,
    /// Reports in visit order
    pub reports: Vec<Report>,
    /// Pages visited, in order
    pub visited: Vec<String>,
    /// Pages still queued when the crawl stopped
    pub to_visit: Vec<String>,
    /// Depth the crawl was allowed
    pub depth: usize,
    /// Pages (or the whole site) that could not be processed
    pub failures: Vec<String>,
}

impl CrawlOutcome {
    /// Outcome for a site whose crawl could not run at all.
    pub fn failed(site: &CrawlSite, depth: usize, reason: impl std::fmt::Display) -> Self {
        Self {
            site_url: site.url.clone(),
            reports: Vec::new(),
            visited: Vec::new(),
            to_visit: Vec::new(),
            depth,
            failures: vec![format!("Error crawling {}: {}", site.url, reason)],
        }
    }

    /// Whether the crawl stopped because it hit its depth.
    #[must_use]
    pub fn depth_reached(&self) -> bool {
        self.depth > 0 && self.visited.len() >= self.depth
    }

    /// Visited and pending pages as a plain-text listing.
    #[must_use]
    pub fn site_list_text(&self) -> String {
        let tabbed = |urls: &[String]| {
            urls.iter()
                .map(|url| format!("\t{url}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut text = String::new();
        if self.depth_reached() {
            text.push_str("Reached crawl depth limit for this site.\n");
        }
        text.push_str(&format!(
            "VISITED:\n{}\nTO VISIT:\n{}\n{}\n",
            tabbed(&self.visited),
            tabbed(&self.to_visit),
            DIVIDER
        ));
        text
    }
}

/// Crawls sites through a shared browser session.
pub struct Crawler {
    session: Arc<BrowserSession>,
    task: Task,
    default_selector: String,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("task", &self.task)
            .field("default_selector", &self.default_selector)
            .finish_non_exhaustive()
    }
}

impl Crawler {
    /// Create a crawler reading report text from `body` unless a site says
    /// otherwise.
    pub fn new(session: Arc<BrowserSession>, task: Task) -> Self {
        Self {
            session,
            task,
            default_selector: "body".to_string(),
        }
    }

    #[must_use]
    pub fn with_default_selector(mut self, selector: impl Into<String>) -> Self {
        self.default_selector = selector.into();
        self
    }

    /// Crawl `site`, visiting at most `depth` distinct pages.
    ///
    /// Opens one page for the whole crawl and closes it afterwards.
    pub async fn crawl(&self, site: &CrawlSite, depth: usize) -> Result<CrawlOutcome> {
        let selector = parse_selector(site.selector.as_deref().unwrap_or(&self.default_selector))?;

        let page = self.session.new_page().await?;
        let outcome = self.walk(page.as_ref(), site, depth, &selector).await;
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close crawl page for {}: {}", site.url, e);
        }

        if let Ok(outcome) = &outcome {
            tracing::info!(
                "Crawled {}: {} pages visited, {} reports, {} failures",
                site.url,
                outcome.visited.len(),
                outcome.reports.len(),
                outcome.failures.len()
            );
        }
        outcome
    }

    async fn walk(
        &self,
        page: &dyn PageDriver,
        site: &CrawlSite,
        depth: usize,
        selector: &Selector,
    ) -> Result<CrawlOutcome> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: Vec<String> = Vec::new();
        let mut reports = Vec::new();
        let mut failures = Vec::new();
        let mut queue = CrawlQueue::new();
        queue.push(site.url.clone(), ROOT_PRIORITY);

        while visited.len() < depth {
            self.task.check_canceled().await?;

            let Some(item) = queue.pop() else {
                break;
            };
            let url = item.url;
            if !seen.insert(url.clone()) {
                continue;
            }
            visited.push(url.clone());

            if let Err(e) = self.session.load(page, &url).await {
                tracing::warn!("Skipping {}: {}", url, e);
                failures.push(format!("Error navigating to {url}: {e}"));
                continue;
            }
            let html = match page.content().await {
                Ok(html) => html,
                Err(e) => {
                    failures.push(format!("Error reading {url}: {e}"));
                    continue;
                }
            };
            let base = page.current_url().await.unwrap_or_else(|_| url.clone());

            let is_root = url == site.url;
            let extract = extract_page(&html, &base, (!is_root).then_some(selector))?;
            if let Some(text) = extract.text {
                reports.push(Report::new(text, url.clone()));
            }

            for anchor in extract.anchors {
                if !same_domain(&anchor.href, &site.url) {
                    continue;
                }
                let link = normalize_url(&anchor.href);
                if seen.contains(&link) {
                    continue;
                }
                let score = score_link(&url, &link, &anchor.text, site);
                if let Some(priority) = score.priority() {
                    tracing::debug!("Queueing {} ({:?}) from {}", link, score, url);
                    queue.push(link, priority);
                }
            }
        }

        let mut pending_seen = HashSet::new();
        let to_visit = queue
            .pending()
            .into_iter()
            .filter(|url| !seen.contains(url) && pending_seen.insert(url.clone()))
            .collect();

        Ok(CrawlOutcome {
            site_url: site.url.clone(),
            reports,
            visited,
            to_visit,
            depth,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(visited: usize, depth: usize) -> CrawlOutcome {
        CrawlOutcome {
            site_url: "https://river.com".to_string(),
            reports: Vec::new(),
            visited: (0..visited).map(|i| format!("https://river.com/{i}")).collect(),
            to_visit: vec!["https://river.com/next".to_string()],
            depth,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_site_list_text() {
        let text = outcome(2, 2).site_list_text();
        assert_eq!(
            text,
            format!(
                "Reached crawl depth limit for this site.\nVISITED:\n\thttps://river.com/0\n\thttps://river.com/1\nTO VISIT:\n\thttps://river.com/next\n{DIVIDER}\n"
            )
        );
    }

    #[test]
    fn test_site_list_without_depth_notice() {
        let text = outcome(1, 5).site_list_text();
        assert!(text.starts_with("VISITED:\n"));
    }

    #[test]
    fn test_failed_outcome() {
        let site = CrawlSite::new("https://river.com/");
        let failed = CrawlOutcome::failed(&site, 10, "browser gone");
        assert!(failed.visited.is_empty());
        assert_eq!(failed.failures, vec!["Error crawling https://river.com: browser gone"]);
    }
}
