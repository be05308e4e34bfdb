use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use paperbot_core::config::{TelegramConfig, secret_from_env};
use paperbot_core::storage::RecordStore;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{NotifyError, Result};

/// Telegram's limit on `sendMessage` text, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramBot {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    max_retries: u32,
}

impl TelegramBot {
    /// Token and chat id come from the environment variables the config names.
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = secret_from_env(&config.bot_token_env)?;
        let chat_id = secret_from_env(&config.chat_id_env)?;
        Self::with_params(&config.api_base, token, chat_id, config.max_retries)
    }

    pub fn with_params(api_base: &str, token: String, chat_id: String, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            chat_id,
            max_retries,
        })
    }

    /// Post one plain-text message. On 429 this waits out the server's
    /// `retry_after` (plus a second) and returns [`NotifyError::RateLimited`].
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: truncate_chars(text, MAX_MESSAGE_CHARS),
        };
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status().as_u16();

        if status == 429 {
            let payload: Value = resp.json().await.unwrap_or_default();
            let retry_after = payload["parameters"]["retry_after"].as_u64().unwrap_or(1);
            warn!(retry_after, "telegram: rate limited");
            tokio::time::sleep(Duration::from_secs(retry_after + 1)).await;
            return Err(NotifyError::RateLimited(retry_after));
        }
        if !resp.status().is_success() {
            let payload: Value = resp.json().await.unwrap_or_default();
            let description = payload["description"].as_str().unwrap_or("").to_string();
            return Err(NotifyError::Api(status, description));
        }
        Ok(())
    }

    /// [`send_message`](Self::send_message), resending after rate limiting
    /// up to the configured number of times.
    pub async fn send_with_retry(&self, text: &str) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            match self.send_message(text).await {
                Err(NotifyError::RateLimited(_)) if attempt < self.max_retries => attempt += 1,
                other => return other,
            }
        }
    }

    /// Send the contents of every record file written on `day`.
    /// Individual failures are logged and skipped. Returns the number sent.
    pub async fn forward_records(&self, store: &RecordStore, day: NaiveDate) -> Result<usize> {
        let files = store.written_on(day)?;
        let mut sent = 0;
        for path in &files {
            match self.forward_file(path).await {
                Ok(()) => {
                    info!(file = %path.display(), "telegram: sent");
                    sent += 1;
                }
                Err(e) => warn!(file = %path.display(), error = %e, "telegram: not sent"),
            }
        }
        Ok(sent)
    }

    async fn forward_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path).await?;
        self.send_with_retry(&content).await
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tempfile::TempDir;

    fn bot(server: &Server, max_retries: u32) -> TelegramBot {
        TelegramBot::with_params(&server.url(), "TOKEN".to_string(), "42".to_string(), max_retries).unwrap()
    }

    #[tokio::test]
    async fn send_posts_chat_id_and_text() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::Json(json!({"chat_id": "42", "text": "hello"})))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        bot(&server, 0).send_message("hello").await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_waits_and_reports() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(429)
            .with_body(r#"{"ok": false, "error_code": 429, "parameters": {"retry_after": 0}}"#)
            .create_async()
            .await;

        let err = bot(&server, 0).send_message("hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::RateLimited(0)));
    }

    #[tokio::test]
    async fn rate_limited_send_is_resent() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(429)
            .with_body(r#"{"ok": false, "parameters": {"retry_after": 0}}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .expect(1)
            .create_async()
            .await;

        bot(&server, 1).send_with_retry("hello").await.unwrap();
        limited.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(429)
            .with_body(r#"{"ok": false, "parameters": {"retry_after": 0}}"#)
            .expect(2)
            .create_async()
            .await;

        let err = bot(&server, 1).send_with_retry("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::RateLimited(0)));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_carries_description() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok": false, "description": "Bad Request: chat not found"}"#)
            .create_async()
            .await;

        match bot(&server, 0).send_message("hi").await.unwrap_err() {
            NotifyError::Api(400, d) => assert!(d.contains("chat not found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_messages_are_truncated() {
        let mut server = Server::new_async().await;
        let expected = "é".repeat(MAX_MESSAGE_CHARS);
        let m = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::PartialJson(json!({"text": expected})))
            .with_status(200)
            .create_async()
            .await;

        bot(&server, 0).send_message(&"é".repeat(MAX_MESSAGE_CHARS + 10)).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn forwards_only_todays_records() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Link: https://a.org/1\n\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Link: https://a.org/2\n\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "skip").unwrap();

        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let store = RecordStore::new(dir.path());
        let b = bot(&server, 1);
        let today = Local::now().date_naive();
        assert_eq!(b.forward_records(&store, today).await.unwrap(), 2);
        m.assert_async().await;

        let yesterday = today.pred_opt().unwrap();
        assert_eq!(b.forward_records(&store, yesterday).await.unwrap(), 0);
    }

    #[test]
    fn missing_token_is_config_error() {
        let config = TelegramConfig {
            bot_token_env: "PAPERBOT_TEST_UNSET_TOKEN".to_string(),
            ..TelegramConfig::default()
        };
        assert!(matches!(TelegramBot::from_config(&config), Err(NotifyError::Core(_))));
    }
}
