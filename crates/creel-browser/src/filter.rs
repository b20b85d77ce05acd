use serde::{Deserialize, Serialize};

/// Kind of subresource a page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Document,
    Script,
    Stylesheet,
    Image,
    Font,
    Media,
    Xhr,
    Fetch,
    Other,
}

/// URL fragments of analytics and ad endpoints.
pub const BLOCKED_URL_PATTERNS: [&str; 6] = [
    "google-analytics",
    "doubleclick.net",
    "ads.",
    "googletagmanager.com",
    "facebook.net",
    "tiktok.com/tracker",
];

/// Decides which subresource requests a page is allowed to make.
///
/// The default drops heavy assets and trackers while letting documents,
/// scripts and XHR through so content still renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    blocked_kinds: Vec<ResourceKind>,
    blocked_patterns: Vec<String>,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self {
            blocked_kinds: vec![
                ResourceKind::Image,
                ResourceKind::Font,
                ResourceKind::Stylesheet,
                ResourceKind::Media,
            ],
            blocked_patterns: BLOCKED_URL_PATTERNS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl RequestFilter {
    /// A filter that lets everything through.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            blocked_kinds: Vec::new(),
            blocked_patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.blocked_kinds.is_empty() && self.blocked_patterns.is_empty()
    }

    #[must_use]
    pub fn should_block(&self, kind: ResourceKind, url: &str) -> bool {
        self.blocked_kinds.contains(&kind)
            || self
                .blocked_patterns
                .iter()
                .any(|pattern| url.contains(pattern.as_str()))
    }
}
