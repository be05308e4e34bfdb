use std::collections::HashSet;
use std::sync::Arc;

use paperbot_core::AppConfig;
use paperbot_core::models::{ArticleRecord, CandidateLink};
use paperbot_core::storage::RetryList;
use tracing::{debug, info, warn};

use crate::citation::{CitationLookup, CitationResolver};
use crate::error::{ExtractionFailure, FetchError, Result};
use crate::fetch::{BrowserFetcher, PageFetcher, SessionFetcher};
use crate::publishers::{PageExtract, PublisherRule, rule_for};
use crate::translate::{OpenAiTranslator, Translator};

/// Rewrite the first `/pdf/` path segment to `/full/`; PDF views carry no HTML abstract.
pub fn normalize_url(url: &str) -> String {
    url.trim().replacen("/pdf/", "/full/", 1)
}

/// Routes article URLs to publisher rules and assembles records.
pub struct Dispatcher {
    fetchers: Vec<Arc<dyn PageFetcher>>,
    citations: Arc<dyn CitationLookup>,
    translator: Arc<dyn Translator>,
    retry: RetryList,
}

impl Dispatcher {
    /// `fetchers` are tried in order, cheapest first.
    pub fn new(
        fetchers: Vec<Arc<dyn PageFetcher>>,
        citations: Arc<dyn CitationLookup>,
        translator: Arc<dyn Translator>,
        retry: RetryList,
    ) -> Self {
        Self {
            fetchers,
            citations,
            translator,
            retry,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut fetchers: Vec<Arc<dyn PageFetcher>> = vec![Arc::new(SessionFetcher::new(&config.fetch)?)];
        if config.fetch.browser_enabled {
            fetchers.push(Arc::new(BrowserFetcher::new(&config.fetch)));
        }
        Ok(Self::new(
            fetchers,
            Arc::new(CitationResolver::new(&config.crossref)?),
            Arc::new(OpenAiTranslator::new(&config.translator)?),
            RetryList::new(config.retry_file()),
        ))
    }

    pub fn retry_list(&self) -> &RetryList {
        &self.retry
    }

    /// Extract one article. Every failure, and every record lacking an
    /// abstract, puts `url` on the retry list.
    pub async fn extract(
        &self,
        url: &str,
        title_hint: Option<&str>,
    ) -> std::result::Result<ArticleRecord, ExtractionFailure> {
        let result = self.extract_unrecorded(url, title_hint).await;
        match &result {
            Ok(record) if record.abstract_text.is_none() => {
                self.remember(url, &ExtractionFailure::AbstractNotFound(record.source_url.clone()));
            }
            Ok(_) => {}
            Err(failure) => self.remember(url, failure),
        }
        result
    }

    /// [`extract`](Self::extract) without touching the retry list.
    pub async fn extract_unrecorded(
        &self,
        url: &str,
        title_hint: Option<&str>,
    ) -> std::result::Result<ArticleRecord, ExtractionFailure> {
        let url = normalize_url(url);
        match reqwest::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ExtractionFailure::InvalidUrl(url)),
        }

        let rule = rule_for(&url).ok_or_else(|| ExtractionFailure::UnsupportedPublisher(url.clone()))?;
        debug!(url = %url, publisher = rule.name, "dispatch");

        let page = self.fetch_best(rule, &url).await?;
        let Some(doi) = page.doi else {
            return Err(ExtractionFailure::DoiNotFound(url));
        };

        let translation = match &page.abstract_text {
            Some(text) => self.translator.translate(text).await,
            None => {
                warn!(url = %url, publisher = rule.name, "abstract not found");
                None
            }
        };
        let citation = self.citations.lookup(&doi.normalized).await;

        let title_hint = title_hint.or(page.title.as_deref());
        info!(url = %url, doi = %doi, "article extracted");
        Ok(ArticleRecord::from_citation(
            url.as_str(),
            title_hint,
            citation,
            page.abstract_text,
            translation,
        ))
    }

    /// Extract candidates one after another, returning what could be assembled.
    /// Repeated URLs are attempted once.
    pub async fn extract_batch(&self, links: &[CandidateLink]) -> Vec<ArticleRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for link in links {
            if !seen.insert(normalize_url(&link.url)) {
                continue;
            }
            match self.extract(&link.url, link.title.as_deref()).await {
                Ok(record) => records.push(record),
                Err(failure) => info!(source = %link.source, "{failure}"),
            }
        }
        records
    }

    async fn fetch_best(
        &self,
        rule: &PublisherRule,
        url: &str,
    ) -> std::result::Result<PageExtract, ExtractionFailure> {
        let mut best: Option<PageExtract> = None;
        let mut last_error: Option<FetchError> = None;

        for fetcher in &self.fetchers {
            if rule.requires_browser && !fetcher.renders_js() {
                continue;
            }
            match fetcher.fetch(url).await {
                Ok(html) => {
                    let page = rule.extract(&html);
                    debug!(url, tier = fetcher.name(), score = page.score(), "page parsed");
                    if page.is_complete() {
                        return Ok(page);
                    }
                    if best.as_ref().is_none_or(|b| page.score() > b.score()) {
                        best = Some(page);
                    }
                }
                Err(e) => {
                    warn!(url, tier = fetcher.name(), error = %e, "fetch failed");
                    last_error = Some(e);
                }
            }
        }

        match (best, last_error) {
            (Some(page), _) => Ok(page),
            (None, Some(FetchError::Timeout(_))) => Err(ExtractionFailure::FetchTimeout(url.to_string())),
            (None, Some(e)) => Err(ExtractionFailure::FetchFailed(url.to_string(), e.to_string())),
            (None, None) => Err(ExtractionFailure::FetchFailed(
                url.to_string(),
                "no fetch tier available".to_string(),
            )),
        }
    }

    fn remember(&self, url: &str, failure: &ExtractionFailure) {
        warn!(url, "{failure}");
        if let Err(e) = self.retry.record(url) {
            warn!(url, error = %e, "could not write retry list");
        }
    }
}
