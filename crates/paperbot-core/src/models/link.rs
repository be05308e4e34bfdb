use serde::{Deserialize, Serialize};

/// Which alert service a candidate link came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    GoogleScholar,
    Wiley,
    Stork,
    #[default]
    Manual,
}

impl std::fmt::Display for AlertSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertSource::GoogleScholar => "scholar",
            AlertSource::Wiley => "wiley",
            AlertSource::Stork => "stork",
            AlertSource::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AlertSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scholar" | "google" | "google_scholar" => Ok(AlertSource::GoogleScholar),
            "wiley" | "hippocampus" => Ok(AlertSource::Wiley),
            "stork" => Ok(AlertSource::Stork),
            "manual" => Ok(AlertSource::Manual),
            other => Err(format!("unknown alert source: {other}")),
        }
    }
}

/// One (URL, title) pair handed to the extraction dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub source: AlertSource,
}

impl CandidateLink {
    pub fn new(url: impl Into<String>, title: Option<String>, source: AlertSource) -> Self {
        Self {
            url: url.into(),
            title,
            source,
        }
    }

    /// Parse a `url<TAB>title` line; the title part is optional.
    /// Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (url, title) = match line.split_once('\t') {
            Some((url, title)) => (url.trim(), Some(title.trim().to_string())),
            None => (line, None),
        };
        Some(Self::new(
            url,
            title.filter(|t| !t.is_empty()),
            AlertSource::Manual,
        ))
    }
}
