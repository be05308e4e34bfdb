use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};

use crate::error::Result;
use crate::models::ArticleRecord;

const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|', '&', ';'];

/// File-name stem budget in bytes, leaving room for `-<hash>.txt` under the 255-byte limit.
const MAX_STEM_BYTES: usize = 200;

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_filename(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return "unknown_title".to_string();
    }
    title
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

/// Flat `key: value` record files, one per article.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a record as `{dir}/{sanitized title}.txt`.
    ///
    /// Saving the same article again overwrites its file. A different article
    /// whose title sanitizes to the same name gets a `-<hash>` suffix instead.
    pub fn save(&self, record: &ArticleRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let sanitized = sanitize_filename(&record.title);
        let stem = truncate_bytes(&sanitized, MAX_STEM_BYTES);
        let mut path = self.dir.join(format!("{stem}.txt"));
        if let Some(existing) = link_of(&path)? {
            if existing != record.source_url {
                path = self
                    .dir
                    .join(format!("{stem}-{:016x}.txt", url_hash(&record.source_url)));
            }
        }

        fs::write(&path, render(record))?;
        tracing::debug!(path = %path.display(), "record saved");
        Ok(path)
    }

    /// All `.txt` record files last modified on `date` (local time).
    pub fn written_on(&self, date: NaiveDate) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "txt") {
                continue;
            }
            let modified: DateTime<Local> = entry.metadata()?.modified()?.into();
            if modified.date_naive() == date {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Render the record body: one `key: value` line per field, then a blank line.
pub fn render(record: &ArticleRecord) -> String {
    let mut out = String::new();
    for (key, value) in record.fields() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&value);
        out.push('\n');
    }
    out.push('\n');
    out
}

fn link_of(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .find_map(|line| line.strip_prefix("Link: "))
        .map(|url| url.trim().to_string()))
}

/// Longest prefix of `s` within `max` bytes, cut on a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// 64-bit FNV-1a over the URL bytes.
fn url_hash(url: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    url.bytes()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
