//! Page fetch tiers: a plain HTTP session first, a headless browser second.

pub mod browser;
pub mod session;

use async_trait::async_trait;

use crate::error::FetchError;

pub use browser::BrowserFetcher;
pub use session::SessionFetcher;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this tier renders JavaScript.
    fn renders_js(&self) -> bool {
        false
    }

    /// The page's HTML after loading `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
