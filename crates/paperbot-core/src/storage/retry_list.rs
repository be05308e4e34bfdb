use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// The persisted list of URLs whose extraction failed, one per line.
#[derive(Debug, Clone)]
pub struct RetryList {
    path: PathBuf,
}

impl RetryList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `url` unless it is already listed.
    pub fn record(&self, url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() || self.pending()?.contains(url) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{url}")?;
        tracing::info!(url, "added to retry list");
        Ok(())
    }

    /// Distinct non-blank lines of the list. Order is not preserved.
    pub fn pending(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }

    /// Replace the list with exactly `urls`. An empty set leaves an empty file.
    pub fn rewrite<'a, I>(&self, urls: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut sorted: Vec<&String> = urls.into_iter().collect();
        sorted.sort();

        let mut body = String::new();
        for url in sorted {
            body.push_str(url);
            body.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
