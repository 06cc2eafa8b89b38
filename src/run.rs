//! Run driver: enumerate source files, rewrite them one after another, and
//! accumulate a [`RunSummary`].

use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::Config;
use crate::fetcher::AssetFetcher;
use crate::record::DownloadRecord;
use crate::rewriter::{FileReport, RewriteOptions, Rewriter};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_rewritten: usize,
    pub files_failed: usize,
    pub urls_found: usize,
    pub dynamic_detections: usize,
    /// Distinct URLs that ended up with a local path.
    pub unique_images: usize,
    pub downloaded: usize,
    pub reused: usize,
    /// Distinct URLs a dry run would fetch. Always zero on a real run.
    pub would_download: usize,
    pub failed_downloads: usize,
    pub output_dir: PathBuf,
}

impl RunSummary {
    fn absorb(&mut self, report: &FileReport) {
        self.urls_found += report.urls_found;
        self.dynamic_detections += report.dynamic;
        self.downloaded += report.downloaded;
        self.reused += report.reused;
        self.would_download += report.would_download;
        self.failed_downloads += report.failed;
        if report.written {
            self.files_rewritten += 1;
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "- Files scanned: {}", self.files_scanned)?;
        writeln!(f, "- Files rewritten: {}", self.files_rewritten)?;
        writeln!(f, "- Files skipped with errors: {}", self.files_failed)?;
        writeln!(f, "- Image URLs found: {}", self.urls_found)?;
        writeln!(f, "- Template literals flagged: {}", self.dynamic_detections)?;
        writeln!(f, "- Unique images downloaded: {}", self.unique_images)?;
        writeln!(f, "  (fetched: {}, already present: {})", self.downloaded, self.reused)?;
        if self.would_download > 0 {
            writeln!(f, "- Images a real run would download: {}", self.would_download)?;
        }
        writeln!(f, "- Failed downloads: {}", self.failed_downloads)?;
        write!(f, "- Images location: {}", self.output_dir.display())
    }
}

/// Process every source file selected by `config`.
///
/// Per-file failures are logged and counted; only failing to enumerate the
/// file set or to create the output directory aborts the run.
pub fn run<F: AssetFetcher + ?Sized>(
    config: &Config,
    fetcher: &F,
    options: RewriteOptions,
) -> Result<RunSummary> {
    let files = config.source_files().context("failed to enumerate source files")?;
    info!("Found {} files to analyze", files.len());

    if !options.dry_run && !config.output_dir.is_dir() {
        fs::create_dir_all(&config.output_dir).with_context(|| {
            format!(
                "failed to create output directory: {}",
                config.output_dir.display()
            )
        })?;
        info!("Created directory: {}", config.output_dir.display());
    }

    let mut record = DownloadRecord::new();
    let mut summary = RunSummary {
        output_dir: config.output_dir.clone(),
        ..RunSummary::default()
    };

    {
        let mut rewriter = Rewriter::new(fetcher, &mut record, config, options);
        for file in &files {
            summary.files_scanned += 1;
            match rewriter.process_file(file) {
                Ok(report) => summary.absorb(&report),
                Err(e) => {
                    error!("{e}");
                    summary.files_failed += 1;
                }
            }
        }
    }

    summary.unique_images = record.len();
    Ok(summary)
}
