//! Link scoring for the report crawler.

use creel_core::urls::normalize_url;
use serde::{Deserialize, Serialize};

/// One site to crawl, with the word lists that steer the crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSite {
    /// Normalized root URL
    pub url: String,
    /// Terms that mark a URL as report-bearing
    pub keywords: Vec<String>,
    /// Terms that demote an otherwise relevant URL
    pub junk_words: Vec<String>,
    /// Anchor texts that invite a click ("read more")
    pub click_phrases: Vec<String>,
    /// CSS selector for the report content, if not the default
    pub selector: Option<String>,
}

impl CrawlSite {
    /// Create a site rooted at `url` (normalized) with empty word lists.
    pub fn new(url: &str) -> Self {
        Self {
            url: normalize_url(url),
            keywords: Vec::new(),
            junk_words: Vec::new(),
            click_phrases: Vec::new(),
            selector: None,
        }
    }

    #[must_use]
    pub fn with_keywords<S: Into<String>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        self.keywords = words.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_junk_words<S: Into<String>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        self.junk_words = words.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_click_phrases<S: Into<String>>(
        mut self,
        phrases: impl IntoIterator<Item = S>,
    ) -> Self {
        self.click_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

/// How eagerly a discovered link should be followed.
///
/// Lower priorities are dequeued first. [`LinkScore::Skip`] is never
/// enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkScore {
    /// Link URL carries a keyword and no junk word.
    FollowHigh,
    /// Current page is relevant and the anchor text invites a click.
    FollowMedium,
    /// Link URL carries a keyword but also a junk word.
    FollowLow,
    /// Not worth visiting.
    Skip,
}

impl LinkScore {
    /// Queue priority, or `None` for links that are not followed.
    #[must_use]
    pub fn priority(self) -> Option<i64> {
        match self {
            Self::FollowHigh => Some(0),
            Self::FollowMedium => Some(1),
            Self::FollowLow => Some(2),
            Self::Skip => None,
        }
    }
}

/// Case-insensitive "contains any of" check.
#[must_use]
pub fn includes_any<S: AsRef<str>>(target: &str, terms: &[S]) -> bool {
    let target = target.to_lowercase();
    terms
        .iter()
        .any(|term| target.contains(&term.as_ref().to_lowercase()))
}

/// Score `link`, found on `current_url` with anchor text `anchor_text`.
#[must_use]
pub fn score_link(current_url: &str, link: &str, anchor_text: &str, site: &CrawlSite) -> LinkScore {
    let current_relevant = includes_any(current_url, &site.keywords);
    let has_keyword = includes_any(link, &site.keywords);
    let has_junk = includes_any(link, &site.junk_words);
    let invites_click = includes_any(anchor_text, &site.click_phrases);

    if has_keyword && !has_junk {
        LinkScore::FollowHigh
    } else if current_relevant && invites_click {
        LinkScore::FollowMedium
    } else if has_keyword && has_junk {
        LinkScore::FollowLow
    } else {
        LinkScore::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> CrawlSite {
        CrawlSite::new("https://river.com/")
            .with_keywords(["report"])
            .with_junk_words(["archive"])
            .with_click_phrases(["read more"])
    }

    #[test]
    fn test_site_url_is_normalized() {
        assert_eq!(site().url, "https://river.com");
    }

    #[test]
    fn test_keyword_without_junk_is_high() {
        let score = score_link("https://river.com", "https://river.com/fishing-report", "read report", &site());
        assert_eq!(score, LinkScore::FollowHigh);
        assert_eq!(score.priority(), Some(0));
    }

    #[test]
    fn test_keyword_with_junk_is_low() {
        let score = score_link("https://river.com", "https://river.com/report-archive", "", &site());
        assert_eq!(score, LinkScore::FollowLow);
    }

    #[test]
    fn test_click_phrase_on_relevant_page_is_medium() {
        let score = score_link(
            "https://river.com/reports",
            "https://river.com/2024/05/12/high-water",
            "Read More",
            &site(),
        );
        assert_eq!(score, LinkScore::FollowMedium);

        // Same anchor on an irrelevant page is not followed.
        let score = score_link("https://river.com/about", "https://river.com/2024/05/12", "read more", &site());
        assert_eq!(score, LinkScore::Skip);
        assert_eq!(score.priority(), None);
    }

    #[test]
    fn test_medium_beats_low() {
        let score = score_link(
            "https://river.com/report",
            "https://river.com/report-archive",
            "read more",
            &site(),
        );
        assert_eq!(score, LinkScore::FollowMedium);
    }

    #[test]
    fn test_matching_ignores_case() {
        assert!(includes_any("https://river.com/Fishing-REPORT", &["report"]));
        assert!(includes_any("lower", &["LOW"]));
        assert!(!includes_any("anything", &[] as &[&str]));
    }
}
