use async_trait::async_trait;
use paperbot_core::config::FetchConfig;

use super::PageFetcher;
use crate::error::{FetchError, Result, ScienceError};
use crate::http::{HttpClient, HttpOptions};

/// Plain HTTP GET, no JavaScript. The fast path.
pub struct SessionFetcher {
    client: HttpClient,
}

impl SessionFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = HttpClient::new(HttpOptions {
            user_agent: config.user_agent.clone(),
            connect_timeout: config.connect_timeout(),
            timeout: config.page_load_timeout(),
            retries: config.retries,
            retry_interval: config.retry_interval(),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for SessionFetcher {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.client.get_text(url).await.map_err(|e| match e {
            ScienceError::ApiError(_, ref msg) => msg
                .strip_prefix("HTTP ")
                .and_then(|rest| rest.get(..3))
                .and_then(|code| code.parse().ok())
                .map(FetchError::Status)
                .unwrap_or_else(|| FetchError::Other(e.to_string())),
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher() -> SessionFetcher {
        SessionFetcher::new(&FetchConfig {
            retry_interval_secs: 0,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_html() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/article/1")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<p id=\"abs\">Hello</p>")
            .create_async()
            .await;

        let html = fetcher().fetch(&format!("{}/article/1", server.url())).await.unwrap();
        assert!(html.contains("Hello"));
    }

    #[tokio::test]
    async fn forbidden_is_status_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/blocked")
            .with_status(403)
            .create_async()
            .await;

        let err = fetcher().fetch(&format!("{}/blocked", server.url())).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(403)));
    }
}
