use std::sync::Arc;

use creel_browser::testing::{FakePage, FakeWeb};
use creel_browser::{BrowserSession, ChromiumDriver};
use creel_core::BrowserConfig;

#[tokio::test]
async fn test_pages_share_one_context() {
    let web = FakeWeb::new()
        .with_page("https://a.com", FakePage::html("a"))
        .with_page("https://b.com", FakePage::html("b"));
    let session = BrowserSession::new(Arc::new(web.clone()), BrowserConfig::default());
    session.launch().await.expect("launch");

    let first = session.new_page().await.expect("page");
    let second = session.new_page().await.expect("page");
    session.load(first.as_ref(), "https://a.com").await.expect("load a");
    session.load(second.as_ref(), "https://b.com").await.expect("load b");

    assert_eq!(first.content().await.expect("content"), "a");
    assert_eq!(second.content().await.expect("content"), "b");
    assert_eq!(web.peak_open_pages(), 2);

    first.close().await.expect("close");
    second.close().await.expect("close");
    assert_eq!(web.open_pages(), 0);
    assert_eq!(web.launches(), 1);
    session.close().await.expect("close session");
}

#[tokio::test]
async fn test_unknown_host_fails_after_retries() {
    let web = FakeWeb::new();
    let config = BrowserConfig {
        retry_backoff_ms: 0,
        ..BrowserConfig::default()
    };
    let session = BrowserSession::new(Arc::new(web.clone()), config);
    session.launch().await.expect("launch");
    let page = session.new_page().await.expect("page");

    let err = session
        .load(page.as_ref(), "https://nowhere.invalid")
        .await
        .expect_err("unresolvable");
    assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    assert_eq!(web.visits("https://nowhere.invalid"), 2);
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_chromium_loads_example() {
    let session = BrowserSession::new(Arc::new(ChromiumDriver::new()), BrowserConfig::default());
    session.launch().await.expect("launch chromium");

    let page = session.new_page().await.expect("page");
    let status = session
        .load(page.as_ref(), "https://example.com")
        .await
        .expect("load example.com");
    assert_eq!(status, Some(200));
    assert!(page.content().await.expect("content").contains("Example Domain"));

    page.close().await.expect("close page");
    session.close().await.expect("close session");
}
