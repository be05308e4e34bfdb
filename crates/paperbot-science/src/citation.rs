use std::time::Duration;

use async_trait::async_trait;
use paperbot_core::config::CrossrefConfig;
use paperbot_core::models::{CitationRecord, doi_url};
use serde_json::Value;

use crate::error::{CitationError, Result};
use crate::formats::apa::{ApaFields, format_apa};
use crate::http::{HttpClient, HttpOptions};

/// Looks up bibliographic metadata for a DOI on the Crossref REST API.
pub struct CitationResolver {
    client: HttpClient,
    base_url: String,
}

impl CitationResolver {
    pub fn new(config: &CrossrefConfig) -> Result<Self> {
        let user_agent = match &config.polite_email {
            Some(email) => format!("paperbot/0.1 (mailto:{email})"),
            None => "paperbot/0.1".to_string(),
        };
        let client = HttpClient::new(HttpOptions {
            user_agent,
            timeout: Duration::from_secs(config.timeout_secs),
            ..HttpOptions::default()
        })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&CrossrefConfig {
            base_url: base_url.to_string(),
            ..CrossrefConfig::default()
        })
    }

    /// Resolve `doi` (bare, no scheme), reporting why it failed.
    pub async fn try_resolve(&self, doi: &str) -> std::result::Result<CitationRecord, CitationError> {
        let doi = doi.trim();
        let url = format!("{}/works/{}", self.base_url, doi);
        let val: Value = self.client.get_json(&url).await?;
        citation_from_json(doi, &val)
    }

    /// Resolve `doi`, degrading to an all-"Unknown" record on any failure.
    pub async fn resolve(&self, doi: &str) -> CitationRecord {
        match self.try_resolve(doi).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(doi, error = %e, "citation lookup failed");
                CitationRecord::unknown(doi)
            }
        }
    }
}

/// Source of citation metadata for the dispatcher. Never fails.
#[async_trait]
pub trait CitationLookup: Send + Sync {
    async fn lookup(&self, doi: &str) -> CitationRecord;
}

#[async_trait]
impl CitationLookup for CitationResolver {
    async fn lookup(&self, doi: &str) -> CitationRecord {
        self.resolve(doi).await
    }
}

fn citation_from_json(doi: &str, val: &Value) -> std::result::Result<CitationRecord, CitationError> {
    let item = val
        .get("message")
        .filter(|m| m.is_object())
        .ok_or_else(|| CitationError::MalformedResponse("missing `message` object".to_string()))?;

    let authors = item["author"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(author_name)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let title = first_str(&item["title"]);
    let journal = first_str(&item["container-title"]);
    let year = item["created"]["date-parts"][0][0]
        .as_i64()
        .map(|y| y.to_string())
        .unwrap_or_default();
    let volume = string_field(&item["volume"]);
    let issue = string_field(&item["issue"]);
    let pages = string_field(&item["page"]);
    let doi = doi_url(doi);

    let apa_citation = format_apa(&ApaFields {
        authors: &authors,
        year: &year,
        title: &title,
        journal: &journal,
        volume: &volume,
        issue: &issue,
        pages: &pages,
        doi_url: &doi,
    });

    Ok(CitationRecord {
        authors,
        title,
        journal,
        year,
        volume,
        issue,
        pages,
        doi,
        apa_citation,
    })
}

fn author_name(author: &Value) -> Option<String> {
    let given = author["given"].as_str().unwrap_or("").trim();
    let family = author["family"].as_str().unwrap_or("").trim();
    let joined = format!("{given} {family}").trim().to_string();
    if !joined.is_empty() {
        return Some(joined);
    }
    author["name"].as_str().map(|n| n.trim().to_string())
}

fn first_str(v: &Value) -> String {
    v[0].as_str().unwrap_or("").trim().to_string()
}

fn string_field(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use paperbot_core::models::UNKNOWN;

    const WORK: &str = r#"{
        "status": "ok",
        "message": {
            "DOI": "10.1000/test",
            "title": ["T"],
            "author": [{"given": "A", "family": "B"}],
            "container-title": ["J"],
            "created": {"date-parts": [[2020, 3, 1]]},
            "volume": "5",
            "page": "1-10"
        }
    }"#;

    #[tokio::test]
    async fn resolves_and_formats_apa() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.1000/test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORK)
            .create_async()
            .await;

        let resolver = CitationResolver::with_base_url(&server.url()).unwrap();
        let c = resolver.try_resolve("10.1000/test").await.unwrap();

        assert_eq!(c.authors, "A B");
        assert_eq!(c.year, "2020");
        assert_eq!(c.issue, "");
        assert_eq!(c.doi, "https://doi.org/10.1000/test");
        assert_eq!(c.apa_citation, "A B (2020). T. *J*, *5*, 1-10. https://doi.org/10.1000/test");
    }

    #[tokio::test]
    async fn multiple_authors_are_comma_joined() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.1000/two")
            .with_status(200)
            .with_body(
                r#"{"message": {"author": [
                    {"given": "Ada", "family": "Lovelace"},
                    {"given": "Charles", "family": "Babbage"},
                    {"name": "Engine Consortium"}
                ], "issue": "2"}}"#,
            )
            .create_async()
            .await;

        let resolver = CitationResolver::with_base_url(&server.url()).unwrap();
        let c = resolver.try_resolve("10.1000/two").await.unwrap();
        assert_eq!(c.authors, "Ada Lovelace, Charles Babbage, Engine Consortium");
        assert_eq!(c.issue, "2");
        assert_eq!(c.title, "");
    }

    #[tokio::test]
    async fn not_found_is_typed_and_resolve_degrades() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.1000/missing")
            .with_status(404)
            .with_body("Resource not found.")
            .expect_at_least(1)
            .create_async()
            .await;

        let resolver = CitationResolver::with_base_url(&server.url()).unwrap();
        let err = resolver.try_resolve("10.1000/missing").await.unwrap_err();
        assert!(matches!(err, CitationError::NotFound(_)));

        let c = resolver.resolve("10.1000/missing").await;
        assert_eq!(c, CitationRecord::unknown("10.1000/missing"));
        assert_eq!(c.authors, UNKNOWN);
        assert_eq!(c.apa_citation, UNKNOWN);
    }

    #[tokio::test]
    async fn server_error_and_bad_json_degrade_to_unknown() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("GET", "/works/10.1000/down")
            .with_status(503)
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/works/10.1000/garbled")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let resolver = CitationResolver::with_base_url(&server.url()).unwrap();
        assert!(matches!(
            resolver.try_resolve("10.1000/down").await,
            Err(CitationError::ServiceUnavailable(_))
        ));
        assert!(matches!(
            resolver.try_resolve("10.1000/garbled").await,
            Err(CitationError::MalformedResponse(_))
        ));
        assert!(resolver.resolve("10.1000/down").await.is_unknown());
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_unknown() {
        let resolver = CitationResolver::with_base_url("http://127.0.0.1:9").unwrap();
        let c = resolver.resolve("10.1000/offline").await;
        assert!(c.is_unknown());
        assert_eq!(c.doi, "https://doi.org/10.1000/offline");
    }
}
