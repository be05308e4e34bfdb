//! Candidate links from the HTML bodies of alert e-mails.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use paperbot_core::models::{AlertSource, CandidateLink};
use regex::Regex;
use scraper::Html;

use crate::dispatcher::normalize_url;
use crate::html::{element_text, parse_selector};

static STORK_PUBLISHER_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"url=\[pubmed[^\]]+\](https?://[^?\s&]+)").unwrap());
static STORK_PAPER_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"url=(https?://[^\s]+)").unwrap());

/// Substrings of links that never lead to an extractable article page.
pub const EXCLUDED: &[&str] = &[
    "book",
    "search.proquest.com",
    "www.rivisteweb.it",
    "jov.arvojournals.org",
    "acoustics.org",
    "www.researchgate.net",
];

pub fn is_excluded(url: &str) -> bool {
    EXCLUDED.iter().any(|s| url.contains(s))
}

/// Parse one alert body. Excluded and repeated links are dropped; order is kept.
pub fn extract_links(source: AlertSource, html: &str) -> Vec<CandidateLink> {
    let document = Html::parse_document(html);
    let found = match source {
        AlertSource::GoogleScholar => scholar_links(&document),
        AlertSource::Wiley => wiley_links(&document),
        AlertSource::Stork => stork_links(&document),
        AlertSource::Manual => Vec::new(),
    };

    let mut seen = HashSet::new();
    let links: Vec<CandidateLink> = found
        .into_iter()
        .filter(|(url, _)| !is_excluded(url))
        .filter(|(url, _)| seen.insert(url.clone()))
        .map(|(url, title)| CandidateLink::new(url, title, source))
        .collect();
    tracing::info!(source = %source, count = links.len(), "alerts: links extracted");
    links
}

fn wiley_links(document: &Html) -> Vec<(String, Option<String>)> {
    let (Ok(anchor), Ok(heading)) = (parse_selector("a.issue-item__title[href]"), parse_selector("h5")) else {
        return Vec::new();
    };
    document
        .select(&anchor)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim().to_string();
            let title = a
                .select(&heading)
                .next()
                .map(|h| element_text(&h))
                .filter(|t| !t.is_empty());
            Some((href, title))
        })
        .collect()
}

fn stork_links(document: &Html) -> Vec<(String, Option<String>)> {
    let Ok(anchor) = parse_selector("div[id] a[href]") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for a in document.select(&anchor) {
        let Some(href) = a.value().attr("href") else { continue };
        if !href.starts_with("https://www.storkapp.me") {
            continue;
        }
        if let Some(m) = STORK_PUBLISHER_LINK.captures(href) {
            let title = Some(element_text(&a)).filter(|t| !t.is_empty());
            out.push((normalize_url(&m[1]), title));
        } else if let Some(m) = STORK_PAPER_LINK.captures(href) {
            out.push((m[1].to_string(), None));
        }
    }
    out
}

fn scholar_links(document: &Html) -> Vec<(String, Option<String>)> {
    let Ok(anchor) = parse_selector("a.gse_alrt_title[href]") else {
        return Vec::new();
    };
    document
        .select(&anchor)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let target = scholar_target(href)?;
            let title = Some(element_text(&a)).filter(|t| !t.is_empty());
            Some((target, title))
        })
        .collect()
}

/// The publisher URL behind a Scholar redirect (`...scholar_url?url=<target>&...`).
fn scholar_target(href: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(href).ok()?;
    let target = parsed
        .query_pairs()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v.into_owned());
    match target {
        Some(t) => Some(t),
        None if parsed.host_str().is_some_and(|h| !h.contains("scholar.google")) => Some(href.to_string()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiley_toc_links_with_titles() {
        let html = r#"
            <table><tr><td>
              <a class="issue-item__title" style="x" href="https://onlinelibrary.wiley.com/doi/10.1002/hipo.1">
                <h5 style="y">Place cells  remap</h5>
              </a>
              <a class="issue-item__title" style="x" href="https://onlinelibrary.wiley.com/doi/10.1002/hipo.2"></a>
              <a class="other" href="https://onlinelibrary.wiley.com/unsubscribe">Unsubscribe</a>
            </td></tr></table>
        "#;
        let links = extract_links(AlertSource::Wiley, html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title.as_deref(), Some("Place cells remap"));
        assert_eq!(links[1].title, None);
        assert_eq!(links[0].source, AlertSource::Wiley);
    }

    #[test]
    fn stork_publisher_and_paper_links() {
        let html = r#"
            <div id="p1"><a target="_blank" href="https://www.storkapp.me/r?id=1&amp;url=[pubmed 123]https://www.tandfonline.com/doi/pdf/10.1080/1?ref=x">Emotion and memory</a></div>
            <div id="p2"><a href="https://www.storkapp.me/r?url=https://www.storkapp.me/paper/showPaper.php?id=42">Stork page</a></div>
            <div id="p3"><a href="https://www.storkapp.me/r?url=[pubmed 9]https://www.researchgate.net/x">Excluded</a></div>
            <div id="p4"><a href="https://elsewhere.example/?url=https://x.org">Not stork</a></div>
        "#;
        let links = extract_links(AlertSource::Stork, html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://www.tandfonline.com/doi/full/10.1080/1");
        assert_eq!(links[0].title.as_deref(), Some("Emotion and memory"));
        assert_eq!(links[1].url, "https://www.storkapp.me/paper/showPaper.php?id=42");
        assert_eq!(links[1].title, None);
    }

    #[test]
    fn scholar_redirect_target_is_decoded() {
        let html = r#"
            <h3><a class="gse_alrt_title" href="https://scholar.google.com/scholar_url?url=https%3A%2F%2Fwww.frontiersin.org%2Farticles%2F10.3389%2Ffpsyg.2024.1&amp;hl=en">Frontiers paper</a></h3>
            <h3><a class="gse_alrt_title" href="https://scholar.google.com/scholar_url?url=https://books.google.com/books?id=1&amp;hl=en">A book</a></h3>
            <h3><a class="gse_alrt_title" href="https://scholar.google.com/scholar_url?url=https%3A%2F%2Fwww.frontiersin.org%2Farticles%2F10.3389%2Ffpsyg.2024.1&amp;hl=de">Same paper</a></h3>
        "#;
        let links = extract_links(AlertSource::GoogleScholar, html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://www.frontiersin.org/articles/10.3389/fpsyg.2024.1");
        assert_eq!(links[0].title.as_deref(), Some("Frontiers paper"));
    }

    #[test]
    fn excluded_substrings() {
        assert!(is_excluded("https://www.researchgate.net/publication/1"));
        assert!(is_excluded("https://jov.arvojournals.org/article.aspx"));
        assert!(!is_excluded("https://www.nature.com/articles/s1"));
    }
}
