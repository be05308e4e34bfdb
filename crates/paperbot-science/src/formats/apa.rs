/// The pieces of an APA-style journal reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApaFields<'a> {
    pub authors: &'a str,
    pub year: &'a str,
    pub title: &'a str,
    pub journal: &'a str,
    pub volume: &'a str,
    pub issue: &'a str,
    pub pages: &'a str,
    /// Canonical `https://doi.org/...` link.
    pub doi_url: &'a str,
}

/// `Authors (Year). Title. *Journal*, *Volume*(Issue), Pages. DOI`
///
/// The `(Issue)` part is left out entirely when the issue is empty.
pub fn format_apa(f: &ApaFields<'_>) -> String {
    let mut out = format!(
        "{} ({}). {}. *{}*, *{}*",
        f.authors, f.year, f.title, f.journal, f.volume
    );
    if !f.issue.is_empty() {
        out.push('(');
        out.push_str(f.issue);
        out.push(')');
    }
    out.push_str(", ");
    out.push_str(f.pages);
    out.push_str(". ");
    out.push_str(f.doi_url);
    out
}
