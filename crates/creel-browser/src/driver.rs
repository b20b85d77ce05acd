//! Seam between the session policy and a concrete browser.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::RequestFilter;
use crate::fingerprint::Fingerprint;

/// Options for starting a browser and its shared context.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
    pub fingerprint: Fingerprint,
}

/// Starts browsers.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch a browser and open one isolated context with `options.fingerprint`.
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserContext>>;
}

/// A browser context shared by every page of a pipeline phase.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Open a page whose subresource requests pass through `filter`.
    async fn new_page(&self, filter: &RequestFilter) -> Result<Box<dyn PageDriver>>;

    /// Close the context and its browser.
    async fn close(&self) -> Result<()>;
}

/// A single tab.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the document. Returns the main response status
    /// when one was observed.
    async fn goto(&self, url: &str) -> Result<Option<u16>>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> Result<String>;

    /// URL of the current document.
    async fn current_url(&self) -> Result<String>;

    async fn move_mouse(&self, x: f64, y: f64) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
