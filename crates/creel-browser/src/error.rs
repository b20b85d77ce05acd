use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    Chromium(String),

    #[error("browser session has not been launched")]
    NotLaunched,

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to load {url}: timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The site answered with a denial status and a block page.
    #[error("failed to load {url}: blocked or forbidden (HTTP {status})")]
    Blocked { url: String, status: u16 },

    #[error("page error: {0}")]
    Page(String),
}

impl BrowserError {
    /// HTTP status of a block, if this is one.
    #[must_use]
    pub fn blocked_status(&self) -> Option<u16> {
        match self {
            Self::Blocked { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::Navigation {
            url: "https://example.com".to_string(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to load https://example.com: net::ERR_NAME_NOT_RESOLVED"
        );
    }

    #[test]
    fn test_blocked_status() {
        let err = BrowserError::Blocked {
            url: "https://example.com".to_string(),
            status: 403,
        };
        assert_eq!(err.blocked_status(), Some(403));
        assert!(err.to_string().contains("HTTP 403"));
        assert_eq!(BrowserError::NotLaunched.blocked_status(), None);
    }
}
