use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::RewriteError;
use super::document::{LiteralSlot, SourceDocument};
use super::languages::SourceLanguage;
use crate::classifier::ImageUrlClassifier;
use crate::config::Config;
use crate::fetcher::AssetFetcher;
use crate::filename::FilenameDeriver;
use crate::record::DownloadRecord;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Classify and report only: nothing is fetched and no file is written.
    pub dry_run: bool,
    /// Fetch again even when the destination file already exists.
    pub force: bool,
}

/// What happened to one source file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Rewritable positions holding an image URL.
    pub urls_found: usize,
    /// Template literals that look like image URLs but were left alone.
    pub dynamic: usize,
    pub downloaded: usize,
    pub reused: usize,
    /// Distinct URLs a dry run would have fetched.
    pub would_download: usize,
    pub failed: usize,
    /// Positions whose literal now points at a local path.
    pub rewritten: usize,
    pub written: bool,
}

/// Rewrites image URLs in one file at a time, sharing a [`DownloadRecord`]
/// across files.
pub struct Rewriter<'a, F: AssetFetcher + ?Sized> {
    fetcher: &'a F,
    record: &'a mut DownloadRecord,
    /// Dry-run only: local paths planned for URLs that were never fetched.
    planned: HashMap<String, String>,
    classifier: ImageUrlClassifier,
    deriver: FilenameDeriver,
    output_dir: PathBuf,
    url_prefix: String,
    options: RewriteOptions,
}

impl<'a, F: AssetFetcher + ?Sized> Rewriter<'a, F> {
    pub fn new(
        fetcher: &'a F,
        record: &'a mut DownloadRecord,
        config: &Config,
        options: RewriteOptions,
    ) -> Self {
        Self {
            fetcher,
            record,
            planned: HashMap::new(),
            classifier: ImageUrlClassifier::from_config(config),
            deriver: FilenameDeriver::from_config(config),
            output_dir: config.output_dir.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            options,
        }
    }

    /// Process one source file end to end.
    ///
    /// The file on disk is replaced as a whole, and only when at least one
    /// literal was rewritten.
    pub fn process_file(&mut self, path: &Path) -> Result<FileReport, RewriteError> {
        let text = fs::read_to_string(path).map_err(|source| RewriteError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let language =
            SourceLanguage::for_path(path).ok_or_else(|| RewriteError::UnsupportedLanguage {
                path: path.to_path_buf(),
            })?;

        let mut document =
            SourceDocument::parse(text, &language).map_err(|source| RewriteError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut report = FileReport::default();
        let mut targets: Vec<(String, LiteralSlot)> = Vec::new();

        for candidate in document.candidates() {
            if !self.classifier.is_image_url(&candidate.value) {
                continue;
            }
            match candidate.slot {
                Some(slot) => targets.push((candidate.value, slot)),
                None => {
                    report.dynamic += 1;
                    warn!(
                        "Possible image URL in template literal at {}:{}: {}",
                        path.display(),
                        candidate.line,
                        candidate.value
                    );
                }
            }
        }

        report.urls_found = targets.len();
        if targets.is_empty() {
            debug!("No image URLs in {}", path.display());
            return Ok(report);
        }
        info!("Found {} image URLs in {}", targets.len(), path.display());

        for (url, slot) in &targets {
            let Some(local) = self.resolve(url, &mut report) else {
                continue;
            };
            document.set_literal(slot, &local);
            report.rewritten += 1;
        }

        if !document.is_modified() {
            return Ok(report);
        }

        let output = document
            .render()
            .map_err(|source| RewriteError::Regenerate {
                path: path.to_path_buf(),
                source,
            })?;

        if self.options.dry_run {
            info!("Would update file: {}", path.display());
            return Ok(report);
        }

        write_atomic(path, &output).map_err(|source| RewriteError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        report.written = true;
        info!("Updated file: {}", path.display());

        Ok(report)
    }

    /// Local path for `url`, fetching it on first sight.
    ///
    /// Returns `None` when the fetch fails, now or earlier in the run.
    fn resolve(&mut self, url: &str, report: &mut FileReport) -> Option<String> {
        if let Some(local) = self.record.get(url) {
            return Some(local.to_string());
        }
        if let Some(local) = self.planned.get(url) {
            return Some(local.clone());
        }
        if self.record.has_failed(url) {
            debug!("Skipping previously failed URL: {url}");
            return None;
        }

        let filename = self.deriver.derive(url);
        let dest = self.output_dir.join(&filename);
        let local = format!("{}/{filename}", self.url_prefix);

        if self.options.dry_run {
            info!("Would download {url} -> {}", dest.display());
            report.would_download += 1;
            self.planned.insert(url.to_string(), local.clone());
            return Some(local);
        }

        if !self.options.force && is_nonempty_file(&dest) {
            info!("Already downloaded: {url} -> {}", dest.display());
            report.reused += 1;
        } else {
            match self.fetcher.fetch(url, &dest) {
                Ok(written) => {
                    info!("Downloaded {url} -> {}", written.display());
                    report.downloaded += 1;
                }
                Err(e) => {
                    error!("Could not download {url}: {e}");
                    self.record.mark_failed(url);
                    report.failed += 1;
                    return None;
                }
            }
        }

        self.record.insert(url, local.clone());
        Some(local)
    }
}

fn is_nonempty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Replace `path` with `contents` via a sibling temp file and a rename.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".image-localizer.tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents)?;
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&tmp, meta.permissions());
    }
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::MockFetcher;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        _temp: TempDir,
        src: PathBuf,
        config: Config,
    }

    fn fixture() -> Fixture {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let output_dir = temp.path().join("public/images");
        fs::create_dir_all(&output_dir).unwrap();
        let config = Config {
            source_dir: src.clone(),
            output_dir,
            ..Config::default()
        };
        Fixture {
            _temp: temp,
            src,
            config,
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_rewrites_plain_literal() {
        let fx = fixture();
        let url = "https://images.pexels.com/photos/1/pic.jpg";
        let file = write(&fx.src, "hero.ts", &format!("const hero = \"{url}\";\n"));

        let fetcher = MockFetcher::default();
        let mut record = DownloadRecord::new();
        let mut rewriter = Rewriter::new(&fetcher, &mut record, &fx.config, RewriteOptions::default());
        let report = rewriter.process_file(&file).unwrap();

        let filename = FilenameDeriver::default().derive(url);
        assert!(filename.ends_with("-pic.jpg"));
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            format!("const hero = \"/images/{filename}\";\n")
        );
        assert!(fx.config.output_dir.join(&filename).is_file());
        assert_eq!(report.urls_found, 1);
        assert_eq!(report.downloaded, 1);
        assert!(report.written);
    }

    #[test]
    fn test_jsx_attribute_rewritten_alt_untouched() {
        let fx = fixture();
        let file = write(
            &fx.src,
            "Card.jsx",
            "export const Card = () => <img src=\"https://example.com/foo.png\" alt=\"x\"/>;\n",
        );

        let fetcher = MockFetcher::default();
        let mut record = DownloadRecord::new();
        let report = Rewriter::new(&fetcher, &mut record, &fx.config, RewriteOptions::default())
            .process_file(&file)
            .unwrap();

        let filename = FilenameDeriver::default().derive("https://example.com/foo.png");
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            format!("export const Card = () => <img src=\"/images/{filename}\" alt=\"x\"/>;\n")
        );
        // Attribute match and bare literal match on the same position.
        assert_eq!(report.urls_found, 2);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[test]
    fn test_template_literal_left_alone() {
        let fx = fixture();
        let src = "const u = (id: string) => `https://cdn.example.com/${id}.png`;\n";
        let file = write(&fx.src, "dyn.ts", src);

        let fetcher = MockFetcher::default();
        let mut record = DownloadRecord::new();
        let report = Rewriter::new(&fetcher, &mut record, &fx.config, RewriteOptions::default())
            .process_file(&file)
            .unwrap();

        assert_eq!(report.dynamic, 1);
        assert_eq!(report.urls_found, 0);
        assert!(!report.written);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(fs::read_to_string(&file).unwrap(), src);
    }

    #[test]
    fn test_failed_fetch_leaves_literal() {
        let fx = fixture();
        let good = "https://example.com/good.png";
        let bad = "https://example.com/bad.png";
        let file = write(
            &fx.src,
            "mixed.ts",
            &format!("const a = '{bad}';\nconst b = '{good}';\nconst c = '{bad}';\n"),
        );

        let fetcher = MockFetcher::default().failing_on(bad);
        let mut record = DownloadRecord::new();
        let report = Rewriter::new(&fetcher, &mut record, &fx.config, RewriteOptions::default())
            .process_file(&file)
            .unwrap();

        let good_name = FilenameDeriver::default().derive(good);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            format!("const a = '{bad}';\nconst b = '/images/{good_name}';\nconst c = '{bad}';\n")
        );
        assert_eq!(report.failed, 1);
        assert_eq!(report.rewritten, 1);
        // The failing URL is not retried for its second position.
        assert_eq!(fetcher.calls(), vec![bad.to_string(), good.to_string()]);
        assert!(record.get(bad).is_none());
        assert!(!fx.config.output_dir.join(FilenameDeriver::default().derive(bad)).exists());
    }

    #[test]
    fn test_existing_file_is_reused_unless_forced() {
        let fx = fixture();
        let url = "https://example.com/cached.png";
        let filename = FilenameDeriver::default().derive(url);
        fs::write(fx.config.output_dir.join(&filename), b"old").unwrap();

        let fetcher = MockFetcher::new(b"new");
        let mut record = DownloadRecord::new();
        let file = write(&fx.src, "a.ts", &format!("export default '{url}';\n"));
        let report = Rewriter::new(&fetcher, &mut record, &fx.config, RewriteOptions::default())
            .process_file(&file)
            .unwrap();
        assert_eq!(report.reused, 1);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(fs::read(fx.config.output_dir.join(&filename)).unwrap(), b"old");

        let mut record = DownloadRecord::new();
        let file = write(&fx.src, "b.ts", &format!("export default '{url}';\n"));
        let forced = RewriteOptions {
            force: true,
            ..RewriteOptions::default()
        };
        Rewriter::new(&fetcher, &mut record, &fx.config, forced)
            .process_file(&file)
            .unwrap();
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(fs::read(fx.config.output_dir.join(&filename)).unwrap(), b"new");
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let fx = fixture();
        let src = "const img = { src: 'https://example.com/a.png' };\n";
        let file = write(&fx.src, "obj.ts", src);

        let fetcher = MockFetcher::default();
        let mut record = DownloadRecord::new();
        let options = RewriteOptions {
            dry_run: true,
            ..RewriteOptions::default()
        };
        let report = Rewriter::new(&fetcher, &mut record, &fx.config, options)
            .process_file(&file)
            .unwrap();

        assert_eq!(report.urls_found, 2);
        assert_eq!(report.rewritten, 2);
        assert!(!report.written);
        assert_eq!(report.would_download, 1);
        assert_eq!(report.downloaded, 0);
        assert_eq!(fetcher.call_count(), 0);
        assert!(record.is_empty());
        assert_eq!(fs::read_to_string(&file).unwrap(), src);
    }

    #[test]
    fn test_parse_failure_is_an_error() {
        let fx = fixture();
        let file = write(&fx.src, "broken.ts", "const = = 'https://example.com/a.png';\n");

        let fetcher = MockFetcher::default();
        let mut record = DownloadRecord::new();
        let err = Rewriter::new(&fetcher, &mut record, &fx.config, RewriteOptions::default())
            .process_file(&file)
            .unwrap_err();

        assert!(matches!(err, RewriteError::Parse { .. }), "{err}");
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "f.ts", "old");
        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
