/// Mock fetcher for testing purposes.
///
/// Writes a fixed payload instead of touching the network and records every
/// URL it was asked for.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{AssetFetcher, FetchError};

pub struct MockFetcher {
    payload: Vec<u8>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Create a mock that writes `payload` for every successful fetch.
    #[must_use]
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every fetch of `url` fail with a 404.
    #[must_use]
    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new(b"\x89PNG\r\n\x1a\nmock")
    }
}

impl AssetFetcher for MockFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }

        if self.failing.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }

        fs::write(dest, &self.payload).map_err(|source| FetchError::Write {
            url: url.to_string(),
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_payload_and_records_calls() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("a.png");
        let fetcher = MockFetcher::new(b"bytes");

        let written = fetcher.fetch("https://example.com/a.png", &dest).unwrap();
        assert_eq!(written, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"bytes");
        assert_eq!(fetcher.calls(), vec!["https://example.com/a.png"]);
    }

    #[test]
    fn test_failing_url() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("b.png");
        let fetcher = MockFetcher::default().failing_on("https://example.com/b.png");

        let err = fetcher.fetch("https://example.com/b.png", &dest).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!dest.exists());
        assert_eq!(fetcher.call_count(), 1);
    }
}
