//! Per-file rewrite pipeline: parse, walk, classify, fetch, splice, write.

pub mod core;
pub mod document;
pub mod languages;
pub mod walker;

use std::path::PathBuf;

use thiserror::Error;

use self::document::DocumentError;

pub use self::core::{FileReport, RewriteOptions, Rewriter};

/// Errors that stop one file from being processed. None of them are fatal
/// to a run.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type: {}", .path.display())]
    UnsupportedLanguage { path: PathBuf },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("rewritten source for {} no longer parses: {source}", .path.display())]
    Regenerate {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
