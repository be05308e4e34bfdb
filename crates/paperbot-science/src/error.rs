use std::time::Duration;

use paperbot_core::PaperbotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error(transparent)]
    Core(#[from] PaperbotError),
}

impl ScienceError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ScienceError::Timeout(_) => true,
            ScienceError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;

/// Why a URL produced no article record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no publisher rule for {0}")]
    UnsupportedPublisher(String),

    #[error("abstract not found on {0}")]
    AbstractNotFound(String),

    #[error("DOI not found on {0}")]
    DoiNotFound(String),

    #[error("fetching {0} timed out")]
    FetchTimeout(String),

    #[error("fetching {0} failed: {1}")]
    FetchFailed(String, String),
}

/// Why a DOI could not be resolved to citation metadata.
#[derive(Debug, Error)]
pub enum CitationError {
    #[error("citation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("DOI not registered: {0}")]
    NotFound(String),

    #[error("malformed citation response: {0}")]
    MalformedResponse(String),

    #[error("citation request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

impl From<ScienceError> for CitationError {
    fn from(e: ScienceError) -> Self {
        if e.is_timeout() {
            return CitationError::Timeout;
        }
        match e {
            ScienceError::ApiError(url, msg) if msg.starts_with("HTTP 404") => {
                CitationError::NotFound(url)
            }
            ScienceError::ApiError(_, msg) => CitationError::ServiceUnavailable(msg),
            ScienceError::RateLimit(host, secs) => {
                CitationError::ServiceUnavailable(format!("{host} rate limited for {secs}s"))
            }
            ScienceError::Parse(msg) => CitationError::MalformedResponse(msg),
            other => CitationError::Network(other.to_string()),
        }
    }
}

/// Why the language-model endpoint returned nothing usable.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("API key not configured ({0})")]
    MissingApiKey(String),

    #[error("translation service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("completion was empty")]
    EmptyResponse,
}

impl From<ScienceError> for TranslationError {
    fn from(e: ScienceError) -> Self {
        match e {
            ScienceError::Parse(msg) => TranslationError::MalformedResponse(msg),
            other => TranslationError::Unavailable(other.to_string()),
        }
    }
}

/// Failure of a single page fetch tier.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

impl From<ScienceError> for FetchError {
    fn from(e: ScienceError) -> Self {
        match e {
            ScienceError::Timeout(_) => FetchError::Timeout(Duration::ZERO),
            ScienceError::Http(ref err) if err.is_timeout() => FetchError::Timeout(Duration::ZERO),
            other => FetchError::Other(other.to_string()),
        }
    }
}
