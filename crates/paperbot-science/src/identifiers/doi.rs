use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

static DOI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+[A-Z0-9/]").unwrap()
});

const PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "https://psycnet.apa.org/doi/",
    "doi.org/",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let mut stripped = PREFIXES
            .iter()
            .find_map(|p| input.strip_prefix(p))
            .unwrap_or(input);
        for label in ["doi:", "DOI:", "doi", "DOI"] {
            if let Some(rest) = stripped.strip_prefix(label) {
                stripped = rest.trim_start_matches(':').trim_start();
                break;
            }
        }

        if !stripped.starts_with("10.") {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ScienceError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].trim().is_empty() || stripped.contains(char::is_whitespace) {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_lowercase();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// First DOI-looking token in free text, trailing punctuation removed.
pub fn find_doi(text: &str) -> Option<Doi> {
    DOI_REGEX.find_iter(text).find_map(|m| {
        let candidate = m.as_str().trim_end_matches(['.', ',', ';', ')']);
        Doi::parse(candidate).ok()
    })
}
