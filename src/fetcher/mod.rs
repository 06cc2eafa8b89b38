//! Asset fetcher trait and shared error type.
//!
//! A fetch is a blocking call: it returns once the bytes for `url` are
//! persisted at the destination, or reports why they are not.

pub mod http;
pub mod mock;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while fetching an image.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {url} to {}: {source}", .path.display())]
    Write {
        url: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Retrieves a remote resource and persists it at a local path.
///
/// Implementations must not leave a file at `dest` when they return an error.
pub trait AssetFetcher {
    /// Download `url` into `dest`, returning the written path.
    fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError>;
}
