//! Raw report text collected by the crawler.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Separator placed between reports and between site-list entries.
pub const DIVIDER: &str = "\n--------------------------------------------------\n";

/// Visible text of one crawled page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Extracted page text
    pub text: String,
    /// Normalized URL the text came from
    pub source_url: String,
    /// Most recent date mentioned in the text, once detected
    pub extracted_date: Option<NaiveDate>,
}

impl Report {
    /// Create an undated report.
    pub fn new(text: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
            extracted_date: None,
        }
    }

    /// Text followed by a `Source:` line, as fed to the summarizer.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}\nSource: {}", self.text, self.source_url)
    }
}
