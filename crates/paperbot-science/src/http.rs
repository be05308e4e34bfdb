use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::error::{Result, ScienceError};

const MAX_RETRY_AFTER_SECS: u64 = 60;

// ─── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Extra attempts after the first one, for connect/timeout errors and 429s.
    pub retries: u32,
    pub retry_interval: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: "paperbot/0.1".to_string(),
            connect_timeout: Duration::from_secs(3),
            timeout: Duration::from_secs(15),
            retries: 1,
            retry_interval: Duration::from_secs(1),
        }
    }
}

// ─── HttpClient ───────────────────────────────────────────────────────────────

/// A `reqwest` client with bounded retries at a fixed interval.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retries: u32,
    retry_interval: Duration,
}

impl HttpClient {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent)
            .gzip(true)
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .build()?;
        Ok(Self {
            client,
            retries: options.retries,
            retry_interval: options.retry_interval,
        })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.execute(url, |c| c.get(url)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get_text(url).await?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }

    pub async fn post_json_with_headers<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<R> {
        let text = self
            .execute(url, |c| c.post(url).headers(headers.clone()).json(body))
            .await?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }

    async fn execute<F>(&self, url: &str, build: F) -> Result<String>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            match build(&self.client).send().await {
                Ok(r) if r.status() == 429 => {
                    let wait = retry_after(r.headers()).unwrap_or(self.retry_interval.as_secs().max(1));
                    if attempt >= self.retries {
                        return Err(ScienceError::RateLimit(host_of(url), wait));
                    }
                    tracing::warn!(url, wait, "rate limited, waiting");
                    sleep(Duration::from_secs(wait.min(MAX_RETRY_AFTER_SECS))).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ScienceError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {}", truncate(&body, 200)),
                    ));
                }
                Ok(r) => return r.text().await.map_err(|e| classify(url, e)),
                Err(e) if attempt < self.retries && (e.is_connect() || e.is_timeout()) => {
                    tracing::debug!(url, attempt, error = %e, "request failed, retrying");
                    sleep(self.retry_interval).await;
                    attempt += 1;
                }
                Err(e) => return Err(classify(url, e)),
            }
        }
    }
}

fn classify(url: &str, e: reqwest::Error) -> ScienceError {
    if e.is_timeout() {
        ScienceError::Timeout(url.to_string())
    } else {
        ScienceError::Http(e)
    }
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToOwned::to_owned))
        .unwrap_or_else(|| url.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client(retries: u32) -> HttpClient {
        HttpClient::new(HttpOptions {
            retries,
            retry_interval: Duration::from_millis(10),
            ..HttpOptions::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn get_text_returns_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let body = client(0).get_text(&format!("{}/page", server.url())).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_is_api_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("nope")
            .create_async()
            .await;

        let err = client(0)
            .get_text(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        match err {
            ScienceError::ApiError(_, msg) => assert!(msg.starts_with("HTTP 404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_is_retried_then_reported() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/busy")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(2)
            .create_async()
            .await;

        let err = client(1)
            .get_text(&format!("{}/busy", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScienceError::RateLimit(_, 0)));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/json")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let err = client(0)
            .get_json::<serde_json::Value>(&format!("{}/json", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScienceError::Parse(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
