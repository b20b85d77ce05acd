use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use creel_browser::testing::{FakePage, FakeWeb};
use creel_browser::BrowserSession;
use creel_core::{BrowserConfig, JobId, JobKind};
use creel_jobs::{
    Cancellable, FileSlot, Job, JobError, JobStatus, JobStore, JobSummary, MemoryJobStore, Task,
};
use creel_scanner::details::{ERROR_EMAIL, ERROR_LOAD_FAILED, NO_EMAIL};
use creel_scanner::{DetailScraper, ShopDetails, Signal};

const SHOP_HOME: &str = r#"
    <body>
      <a href="/store">Shop Flies</a>
      <a href="https://instagram.com/flyshop">IG</a>
      <a href="/contact">Contact</a>
      <p>Open daily</p>
    </body>
"#;

async fn setup(web: &FakeWeb, concurrency: usize) -> (Arc<MemoryJobStore>, Task, DetailScraper) {
    let store = Arc::new(MemoryJobStore::new());
    let job = store.create(JobKind::ShopReel).await.expect("create job");
    let task = Task::new(store.clone(), job.id);

    let session = Arc::new(BrowserSession::new(
        Arc::new(web.clone()),
        BrowserConfig::default(),
    ));
    session.launch().await.expect("launch");

    let scraper = DetailScraper::new(session, task.clone(), concurrency);
    (store, task, scraper)
}

fn site(url: &str) -> Option<String> {
    Some(url.to_string())
}

#[tokio::test]
async fn test_contact_page_email() {
    let web = FakeWeb::new()
        .with_page("https://flyshop.com", FakePage::html(SHOP_HOME))
        .with_page(
            "https://flyshop.com/contact",
            FakePage::html(r#"<body><a href="mailto:tight@lines.com?subject=hi">Mail</a></body>"#),
        );
    let (_store, _task, scraper) = setup(&web, 2).await;

    let details = scraper
        .details_for(Some("https://flyshop.com/"))
        .await
        .expect("details");

    assert_eq!(
        details,
        ShopDetails {
            email: "tight@lines.com".to_string(),
            sells_online: Signal::Found(true),
            fishing_report: Signal::Found(false),
            socials: vec!["Instagram".to_string()],
        }
    );
    assert_eq!(web.visits("https://flyshop.com/contact"), 1);
}

#[tokio::test]
async fn test_contact_hop_is_limited_to_one() {
    let web = FakeWeb::new()
        .with_page("https://flyshop.com", FakePage::html(SHOP_HOME))
        .with_page(
            "https://flyshop.com/contact",
            FakePage::html(r#"<body><a href="/contact-form">Contact form</a></body>"#),
        )
        .with_page(
            "https://flyshop.com/contact-form",
            FakePage::html("<body>form@flyshop.com</body>"),
        );
    let (_store, _task, scraper) = setup(&web, 2).await;

    let details = scraper
        .details_for(site("https://flyshop.com").as_deref())
        .await
        .expect("details");

    assert_eq!(details.email, NO_EMAIL);
    assert_eq!(web.visits("https://flyshop.com/contact-form"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_broken_contact_page_reports_email_error() {
    let web = FakeWeb::new().with_page("https://flyshop.com", FakePage::html(SHOP_HOME));
    let (_store, _task, scraper) = setup(&web, 2).await;

    let details = scraper
        .details_for(Some("https://flyshop.com"))
        .await
        .expect("details");

    assert_eq!(details.email, ERROR_EMAIL);
    assert_eq!(details.sells_online, Signal::Found(true));
}

#[tokio::test(start_paused = true)]
async fn test_results_align_with_input_and_use_fallbacks() {
    let web = FakeWeb::new()
        .with_page(
            "https://slow.com",
            FakePage::html(r#"<body><a href="mailto:slow@slow.com">m</a><a href="/r">River Report</a></body>"#)
                .delayed(Duration::from_secs(3)),
        )
        .with_page("https://fast.com", FakePage::html("<body>hi@fast.com</body>"))
        .with_page("https://denied.com", FakePage::status(403, "<h1>Access Denied</h1>"))
        .with_page("https://limited.com", FakePage::status(429, "<p>slow down</p>"));
    let (store, task, scraper) = setup(&web, 2).await;

    let websites = vec![
        site("https://slow.com"),
        None,
        site("https://fast.com"),
        site("https://denied.com"),
        site("https://gone.com"),
        site("https://limited.com"),
        Some("   ".to_string()),
    ];
    let details = scraper.scrape_all(&websites).await.expect("scrape");

    assert_eq!(details.len(), websites.len());
    assert_eq!(details[0].email, "slow@slow.com");
    assert_eq!(details[0].fishing_report, Signal::Found(true));
    assert_eq!(details[1], ShopDetails::none());
    assert_eq!(details[2].email, "hi@fast.com");
    assert_eq!(details[3], ShopDetails::blocked(403));
    assert_eq!(details[4].email, ERROR_LOAD_FAILED);
    assert_eq!(details[4], ShopDetails::timeout());
    assert_eq!(details[5], ShopDetails::blocked(429));
    assert_eq!(details[6], ShopDetails::none());

    assert!(web.peak_open_pages() <= 2);
    assert_eq!(web.open_pages(), 0);

    let job = store
        .find_by_id(task.job_id())
        .await
        .expect("find")
        .expect("job");
    assert_eq!(job.messages, vec!["Scraping Complete"]);
}

#[tokio::test]
async fn test_unauthorized_block_page_uses_load_failed_fallback() {
    let web = FakeWeb::new().with_page(
        "https://members.com",
        FakePage::status(401, "<h1>Access Denied</h1>"),
    );
    let (_store, _task, scraper) = setup(&web, 1).await;

    let details = scraper
        .scrape_all(&[site("https://members.com")])
        .await
        .expect("scrape");

    assert_eq!(details, vec![ShopDetails::timeout()]);
    assert_eq!(details[0].email, ERROR_LOAD_FAILED);
    assert_eq!(web.visits("https://members.com"), 1);
}

#[tokio::test]
async fn test_shared_website_is_scraped_once() {
    let web = FakeWeb::new().with_page("https://flyshop.com", FakePage::html("<body>a@b.co</body>"));
    let (_store, _task, scraper) = setup(&web, 4).await;

    let websites = vec![
        site("https://flyshop.com"),
        site("https://flyshop.com/?utm=maps"),
        site("https://flyshop.com/#top"),
    ];
    let details = scraper.scrape_all(&websites).await.expect("scrape");

    assert_eq!(web.visits("https://flyshop.com"), 1);
    assert!(details.iter().all(|d| d.email == "a@b.co"));
    assert_eq!(scraper.cache().len(), 1);
}

#[tokio::test]
async fn test_cancellation_aborts_enrichment() {
    let web = FakeWeb::new().with_page("https://flyshop.com", FakePage::html(SHOP_HOME));
    let (store, task, scraper) = setup(&web, 2).await;

    store
        .set_status(task.job_id(), JobStatus::Canceled)
        .await
        .expect("cancel");

    let err = scraper
        .scrape_all(&[site("https://flyshop.com")])
        .await
        .expect_err("should abort");
    assert!(err.is_cancellation());
    assert_eq!(web.total_visits(), 0);
    assert!(scraper.cache().is_empty());
}

/// Store that refuses progress counter updates.
struct NoProgressStore(MemoryJobStore);

#[async_trait]
impl JobStore for NoProgressStore {
    async fn create(&self, kind: JobKind) -> creel_jobs::Result<Job> {
        self.0.create(kind).await
    }

    async fn find_by_id(&self, id: &JobId) -> creel_jobs::Result<Option<Job>> {
        self.0.find_by_id(id).await
    }

    async fn set_status(&self, id: &JobId, status: JobStatus) -> creel_jobs::Result<()> {
        self.0.set_status(id, status).await
    }

    async fn append_message(&self, id: &JobId, message: &str) -> creel_jobs::Result<()> {
        self.0.append_message(id, message).await
    }

    async fn replace_last_message(&self, id: &JobId, message: &str) -> creel_jobs::Result<()> {
        if message.starts_with("Scraping shops (") {
            return Err(JobError::Decode("message log unavailable".to_string()));
        }
        self.0.replace_last_message(id, message).await
    }

    async fn attach_file(&self, id: &JobId, slot: FileSlot, bytes: Vec<u8>) -> creel_jobs::Result<()> {
        self.0.attach_file(id, slot, bytes).await
    }

    async fn list(&self) -> creel_jobs::Result<Vec<JobSummary>> {
        self.0.list().await
    }

    async fn delete(&self, id: &JobId) -> creel_jobs::Result<bool> {
        self.0.delete(id).await
    }
}

#[tokio::test]
async fn test_progress_write_failure_keeps_details() {
    let web = FakeWeb::new().with_page("https://flyshop.com", FakePage::html("<body>a@b.co</body>"));
    let store = Arc::new(NoProgressStore(MemoryJobStore::new()));
    let job = store.create(JobKind::ShopReel).await.expect("create job");
    let task = Task::new(store.clone(), job.id);
    let session = Arc::new(BrowserSession::new(
        Arc::new(web.clone()),
        BrowserConfig::default(),
    ));
    session.launch().await.expect("launch");
    let scraper = DetailScraper::new(session, task.clone(), 1);

    let details = scraper
        .scrape_all(&[site("https://flyshop.com")])
        .await
        .expect("scrape");

    assert_eq!(details[0].email, "a@b.co");
    assert_ne!(details[0], ShopDetails::error());
}
