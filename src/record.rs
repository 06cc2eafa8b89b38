//! Run-scoped mapping from remote image URL to the local path it was
//! rewritten to.
//!
//! Created empty at the start of a run and dropped at the end; nothing is
//! persisted. Processing is sequential, so plain `&mut` access is enough to
//! guarantee a URL is fetched at most once.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct DownloadRecord {
    entries: HashMap<String, String>,
    failed: HashSet<String>,
}

impl DownloadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local path recorded for `url`, if it was fetched successfully.
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    pub fn insert(&mut self, url: &str, local_path: String) {
        self.failed.remove(url);
        self.entries.insert(url.to_string(), local_path);
    }

    /// Remember that fetching `url` failed so later positions skip it.
    pub fn mark_failed(&mut self, url: &str) {
        self.failed.insert(url.to_string());
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    /// Number of distinct URLs with a local path.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
