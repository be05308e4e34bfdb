//! Paperbot Science: publisher extraction, Crossref citations, translation, retry reconciliation.

pub mod alerts;
pub mod citation;
pub mod dispatcher;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod http;
pub mod identifiers;
pub mod pdf;
pub mod publishers;
pub mod reconcile;
pub mod translate;

mod html;

pub use citation::{CitationLookup, CitationResolver};
pub use dispatcher::{Dispatcher, normalize_url};
pub use error::{CitationError, ExtractionFailure, FetchError, Result, ScienceError, TranslationError};
pub use pdf::PdfIngestor;
pub use reconcile::Reconciler;
pub use translate::{OpenAiTranslator, Translator};
