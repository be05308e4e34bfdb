use std::path::Path;
use std::sync::Arc;

use lopdf::Document;
use paperbot_core::models::{ArticleRecord, RecordKind, UNKNOWN};
use paperbot_core::storage::RecordStore;

use crate::error::{Result, ScienceError};
use crate::identifiers::find_doi;
use crate::translate::Translator;

/// Pages kept before and after the first page mentioning the keyword.
const PAGES_BEFORE: usize = 1;
const PAGES_AFTER: usize = 3;

pub trait PdfPageSource: Send + Sync {
    /// Plain text of every page, in page order.
    fn page_texts(&self, pdf_path: &Path) -> Result<Vec<String>>;
}

pub struct LopdfPageSource;

impl PdfPageSource for LopdfPageSource {
    fn page_texts(&self, pdf_path: &Path) -> Result<Vec<String>> {
        let document = Document::load(pdf_path).map_err(|err| {
            ScienceError::PdfExtraction(format!(
                "lopdf failed to open {}: {err}",
                pdf_path.display()
            ))
        })?;

        document
            .get_pages()
            .keys()
            .map(|&n| {
                document.extract_text(&[n]).map_err(|err| {
                    ScienceError::PdfExtraction(format!(
                        "lopdf failed to extract page {n} of {}: {err}",
                        pdf_path.display()
                    ))
                })
            })
            .collect()
    }
}

/// The page containing `keyword` plus its neighbours, each under a
/// `# Page N` header. `None` if no page mentions the keyword.
pub fn select_relevant_pages(pages: &[String], keyword: &str) -> Option<String> {
    let hit = pages.iter().position(|p| p.contains(keyword))?;
    let start = hit.saturating_sub(PAGES_BEFORE);
    let end = (hit + PAGES_AFTER).min(pages.len());

    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate().take(end).skip(start) {
        out.push_str(&format!("# Page {}\n", idx + 1));
        out.push_str(page);
        out.push('\n');
    }
    Some(out)
}

pub fn extract_relevant_pages(pdf_path: &Path, keyword: &str) -> Result<Option<String>> {
    let pages = LopdfPageSource.page_texts(pdf_path)?;
    Ok(select_relevant_pages(&pages, keyword))
}

/// Turns a local PDF into a saved `PDF` record via the structured extraction call.
pub struct PdfIngestor {
    pages: Box<dyn PdfPageSource>,
    translator: Arc<dyn Translator>,
    store: RecordStore,
    keyword: String,
}

impl PdfIngestor {
    pub fn new(translator: Arc<dyn Translator>, store: RecordStore) -> Self {
        Self::with_page_source(Box::new(LopdfPageSource), translator, store)
    }

    pub fn with_page_source(
        pages: Box<dyn PdfPageSource>,
        translator: Arc<dyn Translator>,
        store: RecordStore,
    ) -> Self {
        Self {
            pages,
            translator,
            store,
            keyword: "Abstract".to_string(),
        }
    }

    pub async fn ingest(&self, pdf_path: &Path) -> Option<ArticleRecord> {
        let pages = match self.pages.page_texts(pdf_path) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(path = %pdf_path.display(), error = %e, "pdf: could not read");
                return None;
            }
        };
        let Some(excerpt) = select_relevant_pages(&pages, &self.keyword) else {
            tracing::info!(path = %pdf_path.display(), keyword = %self.keyword, "pdf: keyword not found");
            return None;
        };

        let extraction = self.translator.extract_structured(&excerpt).await?;

        let file_name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| pdf_path.display().to_string());
        let title = if extraction.title.trim().is_empty() {
            file_name.trim_end_matches(".pdf").to_string()
        } else {
            extraction.title.trim().to_string()
        };

        let mut record = ArticleRecord::unresolved(file_name, RecordKind::Pdf, title);
        if !extraction.authors.is_empty() {
            record.authors = extraction.authors.join(", ");
        }
        record.abstract_text = Some(extraction.abstract_text).filter(|s| !s.trim().is_empty());
        record.abstract_translated = Some(extraction.translation).filter(|s| !s.trim().is_empty());
        record.keywords = Some(extraction.keywords).filter(|k| !k.is_empty());
        record.doi = find_doi(&excerpt)
            .map(|d| d.url)
            .unwrap_or_else(|| UNKNOWN.to_string());

        match self.store.save(&record) {
            Ok(path) => tracing::info!(path = %path.display(), "pdf: record saved"),
            Err(e) => {
                tracing::warn!(error = %e, "pdf: could not save record");
                return None;
            }
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::StructuredExtraction;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixturePages(Vec<String>);

    impl PdfPageSource for FixturePages {
        fn page_texts(&self, _pdf_path: &Path) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct FixtureTranslator(Option<StructuredExtraction>);

    #[async_trait]
    impl Translator for FixtureTranslator {
        async fn translate(&self, _text: &str) -> Option<String> {
            None
        }

        async fn extract_structured(&self, _text: &str) -> Option<StructuredExtraction> {
            self.0.clone()
        }
    }

    fn pages(n: usize, hit: usize) -> Vec<String> {
        (0..n)
            .map(|i| if i == hit { "Abstract: text".to_string() } else { format!("body {i}") })
            .collect()
    }

    #[test]
    fn window_around_keyword_page() {
        let excerpt = select_relevant_pages(&pages(8, 2), "Abstract").unwrap();
        assert!(excerpt.starts_with("# Page 2\nbody 1\n"));
        assert!(excerpt.contains("# Page 3\nAbstract: text\n"));
        assert!(excerpt.contains("# Page 5\n"));
        assert!(!excerpt.contains("# Page 6\n"));
    }

    #[test]
    fn window_is_clamped_at_edges() {
        let excerpt = select_relevant_pages(&pages(2, 0), "Abstract").unwrap();
        assert!(excerpt.starts_with("# Page 1\n"));
        assert!(excerpt.contains("# Page 2\n"));
        assert!(select_relevant_pages(&pages(3, 99), "Abstract").is_none());
    }

    #[tokio::test]
    async fn ingest_saves_pdf_record() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        let mut source = pages(4, 0);
        source[0].push_str(" https://doi.org/10.1037/xge0001234");

        let translator = Arc::new(FixtureTranslator(Some(StructuredExtraction {
            title: "Decision Processes".to_string(),
            authors: vec!["A. One".to_string(), "B. Two".to_string()],
            abstract_text: "We study recall.".to_string(),
            translation: "我们研究回忆。".to_string(),
            keywords: vec!["memory".to_string()],
        })));
        let ingestor = PdfIngestor::with_page_source(Box::new(FixturePages(source)), translator, store);

        let record = ingestor.ingest(Path::new("papers/decision.pdf")).await.unwrap();
        assert_eq!(record.kind, RecordKind::Pdf);
        assert_eq!(record.source_url, "decision.pdf");
        assert_eq!(record.authors, "A. One, B. Two");
        assert_eq!(record.doi, "https://doi.org/10.1037/xge0001234");
        assert!(dir.path().join("Decision Processes.txt").exists());
    }

    #[tokio::test]
    async fn ingest_without_extraction_is_none() {
        let dir = TempDir::new().unwrap();
        let ingestor = PdfIngestor::with_page_source(
            Box::new(FixturePages(pages(3, 1))),
            Arc::new(FixtureTranslator(None)),
            RecordStore::new(dir.path()),
        );
        assert!(ingestor.ingest(Path::new("x.pdf")).await.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
