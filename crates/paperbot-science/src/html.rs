use scraper::{ElementRef, Selector};

use crate::error::{Result, ScienceError};

pub(crate) fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input).map_err(|e| ScienceError::Parse(format!("invalid selector {input}: {e}")))
}

pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
