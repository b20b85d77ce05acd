//! Anti-bot browsing policy on top of a [`BrowserDriver`].

use std::sync::Arc;
use std::time::Duration;

use creel_core::BrowserConfig;
use tokio::sync::RwLock;

use crate::driver::{BrowserContext, BrowserDriver, LaunchOptions, PageDriver};
use crate::error::{BrowserError, Result};
use crate::filter::RequestFilter;
use crate::fingerprint::Fingerprint;

/// Statuses that may indicate an anti-bot denial.
pub const DENIAL_STATUSES: [u16; 3] = [401, 403, 429];

/// Phrases on a denial page that confirm the block.
pub const BLOCK_PHRASES: [&str; 6] = [
    "Access Denied",
    "Forbidden",
    "Too Many Requests",
    "Error 403",
    "Access Blocked",
    "You have been rate limited",
];

const POINTER_PATH: [(f64, f64); 3] = [(100.0, 100.0), (200.0, 300.0), (50.0, 175.0)];

/// Whether a page body reads like a block page.
#[must_use]
pub fn looks_blocked(body: &str) -> bool {
    BLOCK_PHRASES.iter().any(|phrase| body.contains(phrase))
}

/// One browser with one shared context and a randomized identity.
///
/// Pages are cheap and opened per unit of work; the context lives for the
/// whole pipeline phase and is released by [`BrowserSession::close`].
pub struct BrowserSession {
    driver: Arc<dyn BrowserDriver>,
    config: BrowserConfig,
    filter: RequestFilter,
    context: RwLock<Option<Arc<dyn BrowserContext>>>,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("config", &self.config)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: BrowserConfig) -> Self {
        Self {
            driver,
            config,
            filter: RequestFilter::default(),
            context: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: RequestFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Launch with a randomly chosen fingerprint.
    pub async fn launch(&self) -> Result<()> {
        let fingerprint = Fingerprint::randomized();
        self.launch_with(fingerprint).await
    }

    /// Launch with a specific fingerprint. A second launch is a no-op.
    pub async fn launch_with(&self, fingerprint: Fingerprint) -> Result<()> {
        let mut slot = self.context.write().await;
        if slot.is_some() {
            tracing::debug!("Browser session already launched");
            return Ok(());
        }

        let options = LaunchOptions {
            headless: self.config.headless,
            args: self.config.launch_args.clone(),
            fingerprint,
        };
        tracing::info!(
            "Launching browser (headless: {}, locale: {}, viewport: {}x{})",
            options.headless,
            options.fingerprint.locale,
            options.fingerprint.viewport.width,
            options.fingerprint.viewport.height
        );
        *slot = Some(self.driver.launch(&options).await?);
        Ok(())
    }

    pub async fn is_launched(&self) -> bool {
        self.context.read().await.is_some()
    }

    /// Open a filtered page in the shared context.
    pub async fn new_page(&self) -> Result<Box<dyn PageDriver>> {
        let context = self
            .context
            .read()
            .await
            .clone()
            .ok_or(BrowserError::NotLaunched)?;
        context.new_page(&self.filter).await
    }

    /// Navigate with the configured attempt count.
    pub async fn load(&self, page: &dyn PageDriver, url: &str) -> Result<Option<u16>> {
        self.load_with_attempts(page, url, self.config.load_attempts)
            .await
    }

    /// Navigate to `url`, retrying transient failures.
    ///
    /// Each attempt is bounded by the navigation timeout. A denial status whose
    /// body carries a block phrase fails immediately with
    /// [`BrowserError::Blocked`] and is never retried. After a successful load
    /// the pointer is moved along a short path.
    pub async fn load_with_attempts(
        &self,
        page: &dyn PageDriver,
        url: &str,
        attempts: u32,
    ) -> Result<Option<u16>> {
        let attempts = attempts.max(1);
        let timeout = Duration::from_secs(self.config.navigation_timeout_secs);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match tokio::time::timeout(timeout, page.goto(url)).await {
                Ok(Ok(status)) => {
                    if let Some(code) = status.filter(|s| DENIAL_STATUSES.contains(s)) {
                        let body = page.content().await.unwrap_or_default();
                        if looks_blocked(&body) {
                            tracing::warn!("Blocked or forbidden (HTTP {}) at {}", code, url);
                            return Err(BrowserError::Blocked {
                                url: url.to_string(),
                                status: code,
                            });
                        }
                    }
                    self.simulate_user(page).await;
                    return Ok(status);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Load attempt {}/{} for {} failed: {}", attempt, attempts, url, e);
                    last_error = Some(BrowserError::Navigation {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    tracing::warn!(
                        "Load attempt {}/{} for {} timed out after {:?}",
                        attempt,
                        attempts,
                        url,
                        timeout
                    );
                    last_error = Some(BrowserError::Timeout {
                        url: url.to_string(),
                        secs: self.config.navigation_timeout_secs,
                    });
                }
            }

            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error.unwrap_or_else(|| BrowserError::Navigation {
            url: url.to_string(),
            reason: "retries exhausted".to_string(),
        }))
    }

    async fn simulate_user(&self, page: &dyn PageDriver) {
        for (x, y) in POINTER_PATH {
            if let Err(e) = page.move_mouse(x, y).await {
                tracing::debug!("Pointer move failed: {}", e);
                break;
            }
        }
    }

    /// Close the context. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        let context = self.context.write().await.take();
        if let Some(context) = context {
            tracing::info!("Closing browser session");
            context.close().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePage, FakeWeb};

    fn session(web: &FakeWeb) -> BrowserSession {
        BrowserSession::new(Arc::new(web.clone()), BrowserConfig::default())
    }

    #[test]
    fn test_looks_blocked() {
        assert!(looks_blocked("<h1>Access Denied</h1>"));
        assert!(looks_blocked("You have been rate limited"));
        assert!(!looks_blocked("<h1>Welcome to the fly shop</h1>"));
    }

    #[tokio::test]
    async fn test_new_page_requires_launch() {
        let web = FakeWeb::new();
        let session = session(&web);
        assert!(matches!(
            session.new_page().await,
            Err(BrowserError::NotLaunched)
        ));
    }

    #[tokio::test]
    async fn test_load_moves_pointer() {
        let web = FakeWeb::new().with_page("https://shop.com", FakePage::html("<p>hi</p>"));
        let session = session(&web);
        session.launch().await.expect("launch");

        let page = session.new_page().await.expect("page");
        let status = session
            .load(page.as_ref(), "https://shop.com")
            .await
            .expect("load");

        assert_eq!(status, Some(200));
        assert_eq!(web.mouse_moves(), 3);
        assert_eq!(page.content().await.expect("content"), "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_blocked_is_not_retried() {
        let web = FakeWeb::new().with_page(
            "https://shop.com",
            FakePage::status(403, "<h1>403 Forbidden</h1>"),
        );
        let session = session(&web);
        session.launch().await.expect("launch");
        let page = session.new_page().await.expect("page");

        let err = session
            .load(page.as_ref(), "https://shop.com")
            .await
            .expect_err("blocked");
        assert_eq!(err.blocked_status(), Some(403));
        assert_eq!(web.visits("https://shop.com"), 1);
    }

    #[tokio::test]
    async fn test_denial_status_without_block_page_loads() {
        let web = FakeWeb::new().with_page(
            "https://shop.com",
            FakePage::status(401, "<p>Please sign in</p>"),
        );
        let session = session(&web);
        session.launch().await.expect("launch");
        let page = session.new_page().await.expect("page");

        let status = session
            .load(page.as_ref(), "https://shop.com")
            .await
            .expect("load");
        assert_eq!(status, Some(401));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let web = FakeWeb::new().with_page(
            "https://shop.com",
            FakePage::html("<p>ok</p>").fail_first(1),
        );
        let session = session(&web);
        session.launch().await.expect("launch");
        let page = session.new_page().await.expect("page");

        session
            .load(page.as_ref(), "https://shop.com")
            .await
            .expect("second attempt succeeds");
        assert_eq!(web.visits("https://shop.com"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_page_times_out() {
        let web = FakeWeb::new().with_page("https://slow.com", FakePage::hanging());
        let session = session(&web);
        session.launch().await.expect("launch");
        let page = session.new_page().await.expect("page");

        let err = session
            .load(page.as_ref(), "https://slow.com")
            .await
            .expect_err("timeout");
        assert!(matches!(err, BrowserError::Timeout { secs: 15, .. }));
        assert_eq!(web.visits("https://slow.com"), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let web = FakeWeb::new();
        let session = session(&web);
        session.launch().await.expect("launch");
        session.launch().await.expect("second launch is a no-op");
        assert_eq!(web.launches(), 1);

        session.close().await.expect("close");
        session.close().await.expect("close again");
        assert_eq!(web.closes(), 1);
        assert!(!session.is_launched().await);
    }
}
