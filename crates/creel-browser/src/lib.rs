//! Browser sessions for crawling sites that push back on automation.
//!
//! A [`BrowserSession`] owns one browser and one shared context with a
//! randomized identity, hands out filtered pages, and loads URLs with bounded
//! retries and block detection. The browser itself sits behind the
//! [`BrowserDriver`] seam: [`ChromiumDriver`] in production and
//! [`testing::FakeWeb`] in tests.

pub mod chromium;
pub mod driver;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod session;
pub mod testing;

pub use chromium::ChromiumDriver;
pub use driver::{BrowserContext, BrowserDriver, LaunchOptions, PageDriver};
pub use error::{BrowserError, Result};
pub use filter::{RequestFilter, ResourceKind};
pub use fingerprint::{Fingerprint, Viewport};
pub use session::{looks_blocked, BrowserSession};
