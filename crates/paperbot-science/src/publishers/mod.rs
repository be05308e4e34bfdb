//! Per-publisher extraction rules and the pure HTML → [`PageExtract`] step.

mod rules;

use scraper::{ElementRef, Html};

use crate::html::{element_text, parse_selector};
use crate::identifiers::{Doi, find_doi};

pub use rules::RULES;

/// Where a publisher page keeps its DOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoiLocator {
    /// `href` of the matched element.
    Href(&'static str),
    /// Text of the matched element.
    Text(&'static str),
    /// Text of the first matched element whose text contains the needle.
    TextContaining(&'static str, &'static str),
    /// First link pointing at a DOI resolver.
    FirstDoiLink,
    /// Last link pointing at a DOI resolver.
    LastDoiLink,
}

/// Extraction strategy for one publisher's page layout.
#[derive(Debug)]
pub struct PublisherRule {
    pub name: &'static str,
    /// URL substrings claiming this rule.
    pub matchers: &'static [&'static str],
    /// Tried in order; the first selector with non-empty text wins.
    pub abstract_selectors: &'static [&'static str],
    pub doi: DoiLocator,
    pub title_selector: Option<&'static str>,
    /// Skip the plain HTTP tier; the page only renders with JavaScript.
    pub requires_browser: bool,
}

/// What one fetched page yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtract {
    pub abstract_text: Option<String>,
    pub doi: Option<Doi>,
    pub title: Option<String>,
}

impl PageExtract {
    pub fn is_complete(&self) -> bool {
        self.abstract_text.is_some() && self.doi.is_some()
    }

    /// Ranking for picking the best partial result across fetch tiers.
    pub fn score(&self) -> u8 {
        u8::from(self.doi.is_some()) * 2 + u8::from(self.abstract_text.is_some())
    }
}

/// First rule whose matcher occurs in `url`.
pub fn rule_for(url: &str) -> Option<&'static PublisherRule> {
    RULES.iter().find(|rule| rule.matches(url))
}

impl PublisherRule {
    pub fn matches(&self, url: &str) -> bool {
        self.matchers.iter().any(|m| url.contains(m))
    }

    pub fn extract(&self, html: &str) -> PageExtract {
        let document = Html::parse_document(html);
        PageExtract {
            abstract_text: self.extract_abstract(&document),
            doi: self.extract_doi(&document),
            title: self
                .title_selector
                .and_then(|sel| first_text(&document, sel)),
        }
    }

    pub fn extract_abstract(&self, document: &Html) -> Option<String> {
        self.abstract_selectors
            .iter()
            .find_map(|sel| first_text(document, sel))
    }

    pub fn extract_doi(&self, document: &Html) -> Option<Doi> {
        match self.doi {
            DoiLocator::Href(sel) => select(document, sel)
                .filter_map(|el| el.value().attr("href"))
                .find_map(doi_from),
            DoiLocator::Text(sel) => select(document, sel).find_map(|el| doi_from(&element_text(&el))),
            DoiLocator::TextContaining(sel, needle) => select(document, sel)
                .map(|el| element_text(&el))
                .filter(|text| text.to_lowercase().contains(needle))
                .find_map(|text| doi_from(&text)),
            DoiLocator::FirstDoiLink => doi_links(document).into_iter().next(),
            DoiLocator::LastDoiLink => doi_links(document).into_iter().last(),
        }
    }
}

fn select<'a>(document: &'a Html, selector: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let parsed = match parse_selector(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "publishers: bad selector");
            None
        }
    };
    parsed
        .into_iter()
        .flat_map(move |s| document.select(&s).collect::<Vec<_>>())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    select(document, selector)
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty())
}

fn doi_links(document: &Html) -> Vec<Doi> {
    select(document, "a[href]")
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains("doi.org/") || href.contains("/doi/"))
        .filter_map(doi_from)
        .collect()
}

fn doi_from(value: &str) -> Option<Doi> {
    Doi::parse(value).ok().or_else(|| find_doi(value))
}
