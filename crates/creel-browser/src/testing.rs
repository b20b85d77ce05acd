//! Scriptable in-process web for exercising sessions and scrapers without
//! a real browser.
//!
//! ```
//! use creel_browser::testing::{FakePage, FakeWeb};
//!
//! let web = FakeWeb::new()
//!     .with_page("https://shop.com", FakePage::html("<a href=\"/cart\">Cart</a>"))
//!     .with_page("https://blocked.com", FakePage::status(403, "Access Denied"));
//! assert_eq!(web.visits("https://shop.com"), 0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{BrowserContext, BrowserDriver, LaunchOptions, PageDriver};
use crate::error::{BrowserError, Result};
use crate::filter::RequestFilter;

/// Scripted response for one URL.
#[derive(Debug, Clone)]
pub struct FakePage {
    status: u16,
    body: String,
    failures: usize,
    hang: bool,
    delay: Option<Duration>,
}

impl FakePage {
    /// A 200 page.
    pub fn html(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            failures: 0,
            hang: false,
            delay: None,
        }
    }

    /// A page that never finishes loading.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::html("")
        }
    }

    /// Fail the first `n` navigations with a network error.
    #[must_use]
    pub fn fail_first(mut self, n: usize) -> Self {
        self.failures = n;
        self
    }

    /// Take `delay` to respond.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct WebState {
    pages: Mutex<HashMap<String, FakePage>>,
    visits: Mutex<HashMap<String, usize>>,
    launches: AtomicUsize,
    closes: AtomicUsize,
    open_pages: AtomicUsize,
    peak_open_pages: AtomicUsize,
    mouse_moves: AtomicUsize,
}

/// A fake browser driver serving scripted pages.
#[derive(Debug, Clone, Default)]
pub struct FakeWeb {
    state: Arc<WebState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` at `url`. A trailing slash is not significant.
    #[must_use]
    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.set_page(url, page);
        self
    }

    /// Serve `page` at `url` after construction.
    pub fn set_page(&self, url: &str, page: FakePage) {
        lock(&self.state.pages).insert(key(url), page);
    }

    /// Number of navigations to `url` so far.
    pub fn visits(&self, url: &str) -> usize {
        lock(&self.state.visits)
            .get(&key(url))
            .copied()
            .unwrap_or(0)
    }

    /// Total navigations across all URLs.
    pub fn total_visits(&self) -> usize {
        lock(&self.state.visits).values().sum()
    }

    pub fn launches(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Pages opened and not yet closed.
    pub fn open_pages(&self) -> usize {
        self.state.open_pages.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open pages.
    pub fn peak_open_pages(&self) -> usize {
        self.state.peak_open_pages.load(Ordering::SeqCst)
    }

    pub fn mouse_moves(&self) -> usize {
        self.state.mouse_moves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserDriver for FakeWeb {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Arc<dyn BrowserContext>> {
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeContext {
            state: self.state.clone(),
        }))
    }
}

struct FakeContext {
    state: Arc<WebState>,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self, _filter: &RequestFilter) -> Result<Box<dyn PageDriver>> {
        let open = self.state.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_open_pages.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(FakePageDriver {
            state: self.state.clone(),
            current: Mutex::new(None),
            closed: AtomicUsize::new(0),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePageDriver {
    state: Arc<WebState>,
    current: Mutex<Option<(String, String)>>,
    closed: AtomicUsize,
}

impl FakePageDriver {
    fn next_response(&self, url: &str) -> Result<FakePage> {
        let url_key = key(url);
        *lock(&self.state.visits).entry(url_key.clone()).or_insert(0) += 1;

        let mut pages = lock(&self.state.pages);
        match pages.get_mut(&url_key) {
            Some(page) if page.failures > 0 => {
                page.failures -= 1;
                Err(BrowserError::Page("net::ERR_CONNECTION_RESET".to_string()))
            }
            Some(page) => Ok(page.clone()),
            None => Err(BrowserError::Page("net::ERR_NAME_NOT_RESOLVED".to_string())),
        }
    }
}

#[async_trait]
impl PageDriver for FakePageDriver {
    async fn goto(&self, url: &str) -> Result<Option<u16>> {
        let page = self.next_response(url)?;

        if page.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = page.delay {
            tokio::time::sleep(delay).await;
        }

        *lock(&self.current) = Some((url.to_string(), page.body));
        Ok(Some(page.status))
    }

    async fn content(&self) -> Result<String> {
        Ok(lock(&self.current)
            .as_ref()
            .map(|(_, body)| body.clone())
            .unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(lock(&self.current)
            .as_ref()
            .map_or_else(|| "about:blank".to_string(), |(url, _)| url.clone()))
    }

    async fn move_mouse(&self, _x: f64, _y: f64) -> Result<()> {
        self.state.mouse_moves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.fetch_add(1, Ordering::SeqCst) == 0 {
            self.state.open_pages.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
