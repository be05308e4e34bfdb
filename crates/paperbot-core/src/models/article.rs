use serde::{Deserialize, Serialize};

/// Placeholder for bibliographic fields the citation service could not supply.
pub const UNKNOWN: &str = "Unknown";

/// How an optional text field is rendered when nothing was extracted.
pub const ABSENT: &str = "None";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    #[default]
    Html,
    Pdf,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordKind::Html => "HTML",
            RecordKind::Pdf => "PDF",
        };
        write!(f, "{s}")
    }
}

/// Bibliographic metadata for one DOI, as returned by the citation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub authors: String,
    pub title: String,
    pub journal: String,
    pub year: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    /// Canonical `https://doi.org/<id>` form.
    pub doi: String,
    pub apa_citation: String,
}

impl CitationRecord {
    /// A record with every field set to [`UNKNOWN`] except the DOI link.
    pub fn unknown(doi: &str) -> Self {
        Self {
            authors: UNKNOWN.to_string(),
            title: UNKNOWN.to_string(),
            journal: UNKNOWN.to_string(),
            year: UNKNOWN.to_string(),
            volume: UNKNOWN.to_string(),
            issue: UNKNOWN.to_string(),
            pages: UNKNOWN.to_string(),
            doi: doi_url(doi),
            apa_citation: UNKNOWN.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.apa_citation == UNKNOWN && self.title == UNKNOWN
    }
}

/// One fully or partially resolved article. Built once, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub source_url: String,
    pub kind: RecordKind,
    pub title: String,
    pub authors: String,
    pub abstract_text: Option<String>,
    pub abstract_translated: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub journal: String,
    pub year: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    pub doi: String,
    pub apa_citation: String,
}

impl ArticleRecord {
    /// Merge scraped text with citation metadata. A non-empty `title_hint`
    /// (usually the alert e-mail's link text) wins over the citation title.
    pub fn from_citation(
        source_url: impl Into<String>,
        title_hint: Option<&str>,
        citation: CitationRecord,
        abstract_text: Option<String>,
        abstract_translated: Option<String>,
    ) -> Self {
        let title = title_hint
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or(citation.title);

        Self {
            source_url: source_url.into(),
            kind: RecordKind::Html,
            title,
            authors: citation.authors,
            abstract_text,
            abstract_translated,
            keywords: None,
            journal: citation.journal,
            year: citation.year,
            volume: citation.volume,
            issue: citation.issue,
            pages: citation.pages,
            doi: citation.doi,
            apa_citation: citation.apa_citation,
        }
    }

    /// A record with no citation data, used for PDF ingestion.
    pub fn unresolved(source_url: impl Into<String>, kind: RecordKind, title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            kind,
            title: title.into(),
            authors: UNKNOWN.to_string(),
            abstract_text: None,
            abstract_translated: None,
            keywords: None,
            journal: UNKNOWN.to_string(),
            year: UNKNOWN.to_string(),
            volume: UNKNOWN.to_string(),
            issue: UNKNOWN.to_string(),
            pages: UNKNOWN.to_string(),
            doi: UNKNOWN.to_string(),
            apa_citation: UNKNOWN.to_string(),
        }
    }

    /// Key/value pairs in the order they are written to record files.
    /// Every key is always present.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Link", self.source_url.clone()),
            ("type", self.kind.to_string()),
            ("title", self.title.clone()),
            ("Authors", self.authors.clone()),
            ("Abstract(cn)", or_absent(self.abstract_translated.as_deref())),
            ("Abstract", or_absent(self.abstract_text.as_deref())),
            (
                "Keywords",
                self.keywords
                    .as_ref()
                    .filter(|k| !k.is_empty())
                    .map(|k| k.join(", "))
                    .unwrap_or_else(|| ABSENT.to_string()),
            ),
            ("Journal", self.journal.clone()),
            ("Year", self.year.clone()),
            ("Volume", self.volume.clone()),
            ("Issue", self.issue.clone()),
            ("pages", self.pages.clone()),
            ("DOI", self.doi.clone()),
            ("APA Citation", self.apa_citation.clone()),
        ]
    }
}

/// Canonical resolver link for a bare DOI.
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi.trim())
}

fn or_absent(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ABSENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation() -> CitationRecord {
        CitationRecord {
            authors: "Ada Lovelace".to_string(),
            title: "Notes on the Engine".to_string(),
            journal: "Memory".to_string(),
            year: "1843".to_string(),
            volume: "1".to_string(),
            issue: String::new(),
            pages: "1-10".to_string(),
            doi: doi_url("10.1000/engine"),
            apa_citation: "Ada Lovelace (1843). Notes on the Engine.".to_string(),
        }
    }

    #[test]
    fn unknown_citation_keeps_doi_link() {
        let c = CitationRecord::unknown("10.1000/x");
        assert_eq!(c.doi, "https://doi.org/10.1000/x");
        assert_eq!(c.authors, UNKNOWN);
        assert_eq!(c.year, UNKNOWN);
        assert!(c.is_unknown());
    }

    #[test]
    fn title_hint_wins_over_citation_title() {
        let r = ArticleRecord::from_citation("https://x.org/a", Some(" Alert title "), citation(), None, None);
        assert_eq!(r.title, "Alert title");

        let r = ArticleRecord::from_citation("https://x.org/a", Some("   "), citation(), None, None);
        assert_eq!(r.title, "Notes on the Engine");
    }

    #[test]
    fn fields_are_complete_and_ordered() {
        let r = ArticleRecord::from_citation(
            "https://x.org/a",
            None,
            citation(),
            Some("An abstract.".to_string()),
            None,
        );
        let keys: Vec<_> = r.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "Link", "type", "title", "Authors", "Abstract(cn)", "Abstract", "Keywords",
                "Journal", "Year", "Volume", "Issue", "pages", "DOI", "APA Citation"
            ]
        );
        let fields = r.fields();
        assert_eq!(fields[1].1, "HTML");
        assert_eq!(fields[4].1, ABSENT);
        assert_eq!(fields[5].1, "An abstract.");
        assert_eq!(fields[6].1, ABSENT);
        assert_eq!(fields[10].1, "");
    }
}
