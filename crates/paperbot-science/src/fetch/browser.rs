use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use paperbot_core::config::FetchConfig;

use super::PageFetcher;
use crate::error::FetchError;

/// Headless Chromium. One browser is launched per fetch and always torn down.
pub struct BrowserFetcher {
    executable: Option<String>,
    page_load_timeout: Duration,
    quit_timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            executable: config.browser_path.clone(),
            page_load_timeout: config.page_load_timeout(),
            quit_timeout: config.quit_timeout(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.page_load_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(FetchError::Other)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn renders_js(&self) -> bool {
        true
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| FetchError::Other(format!("browser launch failed: {e}")))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let rendered = tokio::time::timeout(self.page_load_timeout, render(&browser, url)).await;

        match tokio::time::timeout(self.quit_timeout, browser.close()).await {
            Ok(Ok(_)) => {
                let _ = tokio::time::timeout(self.quit_timeout, browser.wait()).await;
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "browser close failed, killing");
                let _ = browser.kill().await;
            }
            Err(_) => {
                tracing::debug!("browser did not quit in time, killing");
                let _ = browser.kill().await;
            }
        }
        events.abort();

        match rendered {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.page_load_timeout)),
        }
    }
}

async fn render(browser: &Browser, url: &str) -> Result<String, FetchError> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;
    let html = page
        .content()
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;
    let _ = page.close().await;
    Ok(html)
}
