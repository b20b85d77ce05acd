//! Chromium driver over the DevTools protocol.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetTimezoneOverrideParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::driver::{BrowserContext, BrowserDriver, LaunchOptions, PageDriver};
use crate::error::{BrowserError, Result};
use crate::filter::{RequestFilter, ResourceKind};
use crate::fingerprint::Fingerprint;

fn cdp(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Chromium(e.to_string())
}

/// Launches a local Chromium through `chromiumoxide`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumDriver;

impl ChromiumDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserContext>> {
        let viewport = options.fingerprint.viewport;
        let mut builder = ChromiumConfig::builder()
            .args(options.args.clone())
            .window_size(viewport.width, viewport.height);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Chromium)?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        let context_id = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(cdp)?;

        Ok(Arc::new(ChromiumContext {
            browser: Mutex::new(browser),
            context_id,
            fingerprint: options.fingerprint.clone(),
            handler,
        }))
    }
}

struct ChromiumContext {
    browser: Mutex<Browser>,
    context_id: BrowserContextId,
    fingerprint: Fingerprint,
    handler: JoinHandle<()>,
}

async fn apply_fingerprint(page: &Page, fingerprint: &Fingerprint) -> Result<()> {
    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(fingerprint.user_agent.clone())
        .accept_language(fingerprint.accept_language())
        .build()
        .map_err(BrowserError::Chromium)?;
    page.execute(user_agent).await.map_err(cdp)?;

    page.execute(SetTimezoneOverrideParams::new(fingerprint.timezone.clone()))
        .await
        .map_err(cdp)?;
    page.execute(
        SetLocaleOverrideParams::builder()
            .locale(fingerprint.locale.clone())
            .build(),
    )
    .await
    .map_err(cdp)?;
    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(fingerprint.viewport.width),
        i64::from(fingerprint.viewport.height),
        1.0,
        fingerprint.is_mobile(),
    ))
    .await
    .map_err(cdp)?;
    Ok(())
}

fn resource_kind(resource: &ResourceType) -> ResourceKind {
    match resource {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}

/// Pause every request and answer it according to `filter`.
async fn install_filter(page: &Page, filter: RequestFilter) -> Result<JoinHandle<()>> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(cdp)?;

    let pattern = RequestPattern::builder()
        .url_pattern("*")
        .request_stage(RequestStage::Request)
        .build();
    page.execute(EnableParams::builder().pattern(pattern).build())
        .await
        .map_err(cdp)?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let kind = resource_kind(&event.resource_type);
            let outcome = if filter.should_block(kind, &event.request.url) {
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = outcome {
                tracing::debug!("Request interception for {} failed: {}", event.request.url, e);
            }
        }
    }))
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn new_page(&self, filter: &RequestFilter) -> Result<Box<dyn PageDriver>> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context_id.clone())
            .build()
            .map_err(BrowserError::Chromium)?;
        let page = self.browser.lock().await.new_page(params).await.map_err(cdp)?;

        apply_fingerprint(&page, &self.fingerprint).await?;
        let interceptor = if filter.is_passthrough() {
            None
        } else {
            Some(install_filter(&page, filter.clone()).await?)
        };

        Ok(Box::new(ChromiumPage { page, interceptor }))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.dispose_browser_context(self.context_id.clone()).await {
            tracing::debug!("Failed to dispose browser context: {}", e);
        }
        browser.close().await.map_err(cdp)?;
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
    interceptor: Option<JoinHandle<()>>,
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<Option<u16>> {
        self.page.goto(url).await.map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let request = self.page.wait_for_navigation_response().await.map_err(cdp)?;
        Ok(request
            .and_then(|request| request.response.as_ref().map(|response| response.status))
            .and_then(|status| u16::try_from(status).ok()))
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.map_err(cdp)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(cdp)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        self.page.move_mouse(Point { x, y }).await.map_err(cdp)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await.map_err(cdp)
    }
}
