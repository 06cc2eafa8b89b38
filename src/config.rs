/// Configuration module for image-localizer.
///
/// Handles loading, validating, and providing default configuration values,
/// and enumerates the source files a run should visit.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "image-localizer.json";

// ── Default value functions ──────────────────────────────────────────

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/images")
}

fn default_url_prefix() -> String {
    "/images".to_string()
}

fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx"].map(String::from).to_vec()
}

fn default_exclude_dirs() -> Vec<String> {
    ["node_modules", ".next"].map(String::from).to_vec()
}

fn default_image_domains() -> Vec<String> {
    [
        "ext.same-assets.com",
        "cloudinary.com",
        "amazonaws.com",
        "imgix.net",
        "unsplash.com",
        "googleusercontent.com",
        "githubusercontent.com",
        "cloudfront.net",
        "images.pexels.com",
        "img.youtube.com",
        "media.giphy.com",
    ]
    .map(String::from)
    .to_vec()
}

fn default_image_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".avif"]
        .map(String::from)
        .to_vec()
}

fn default_fallback_extension() -> String {
    ".jpg".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root directory scanned for source files.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory downloaded images are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Web-root path the rewritten literals point at.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// Source file extensions, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names never descended into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Extra glob patterns (relative to `source_dir`) to skip.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_image_domains")]
    pub image_domains: Vec<String>,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_fallback_extension")]
    pub default_extension: String,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Draw a byte progress bar while streaming each image.
    #[serde(default)]
    pub progress: bool,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            url_prefix: default_url_prefix(),
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            exclude_patterns: Vec::new(),
            image_domains: default_image_domains(),
            image_extensions: default_image_extensions(),
            default_extension: default_fallback_extension(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            progress: false,
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_FILE`].
    /// A missing file yields the default config; invalid JSON is reported
    /// and also falls back to defaults.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_FILE
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            debug!("{path} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.extensions.is_empty(),
            "at least one source extension must be specified"
        );
        anyhow::ensure!(self.fetch.timeout_secs > 0, "fetch.timeout_secs must be positive");
        anyhow::ensure!(
            self.url_prefix.starts_with('/'),
            "url_prefix must start with '/': {}",
            self.url_prefix
        );
        for ext in self.image_extensions.iter().chain([&self.default_extension]) {
            anyhow::ensure!(
                ext.starts_with('.') && ext.len() > 1,
                "image extension must look like \".png\": {ext}"
            );
        }
        self.exclude_globs()?;
        Ok(())
    }

    /// Enumerate every source file under `source_dir`, sorted by path.
    ///
    /// Dot-files and dot-directories below the root are skipped. `.gitignore`
    /// rules are not consulted.
    ///
    /// Any failure here (missing root, unreadable directory, bad exclude
    /// pattern) is returned to the caller: without the file set there is
    /// nothing meaningful to do.
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        let root = &self.source_dir;
        anyhow::ensure!(
            root.is_dir(),
            "source directory not found: {}",
            root.display()
        );

        let excludes = self.exclude_globs()?;
        let exclude_dirs = self.exclude_dirs.clone();

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && exclude_dirs
                        .iter()
                        .any(|d| entry.file_name() == std::ffi::OsStr::new(d)))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .with_context(|| format!("failed to walk source directory: {}", root.display()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if !self.extensions.iter().any(|e| e == ext) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            if excludes.is_match(relative) {
                debug!("Excluded by pattern: {}", path.display());
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    fn exclude_globs(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            let glob =
                Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {pattern}"))?;
            builder.add(glob);
        }
        builder.build().context("failed to build exclude patterns")
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source_dir, PathBuf::from("src"));
        assert_eq!(config.output_dir, PathBuf::from("public/images"));
        assert_eq!(config.url_prefix, "/images");
        assert_eq!(config.extensions, vec!["js", "jsx", "ts", "tsx"]);
        assert_eq!(config.exclude_dirs, vec!["node_modules", ".next"]);
        assert_eq!(config.image_domains.len(), 11);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.user_agent.contains("Chrome"));
        assert!(!config.fetch.progress);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"source_dir": "app", "fetch": {"timeout_secs": 5}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("app"));
        assert_eq!(config.fetch.timeout_secs, 5);
        // Other fields should have defaults
        assert_eq!(config.url_prefix, "/images");
        assert!(config.fetch.user_agent.contains("Mozilla"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("absent.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.url_prefix, "/images");
        assert!(!path.exists(), "loading must not create the file");
    }

    #[test]
    fn test_load_invalid_json_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("src"));
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("cfg.json");
        let mut config = Config::default();
        config.url_prefix = "/static/img".to_string();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.url_prefix, "/static/img");
        assert_eq!(loaded.image_extensions, config.image_extensions);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.url_prefix = "images".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.image_extensions.push("png".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.exclude_patterns.push("[".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_files_skips_excluded() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("components")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".next/cache")).unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();

        fs::write(root.join("index.ts"), "").unwrap();
        fs::write(root.join("components/Hero.tsx"), "").unwrap();
        fs::write(root.join("components/styles.css"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();
        fs::write(root.join(".next/cache/chunk.js"), "").unwrap();
        fs::write(root.join("generated/api.ts"), "").unwrap();

        let config = Config {
            source_dir: root.to_path_buf(),
            exclude_patterns: vec!["generated/**".to_string()],
            ..Config::default()
        };

        let files = config.source_files().unwrap();
        assert_eq!(
            files,
            vec![root.join("components/Hero.tsx"), root.join("index.ts")]
        );
    }

    #[test]
    fn test_source_files_skips_hidden_entries() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("src");
        fs::create_dir_all(root.join(".storybook")).unwrap();
        fs::create_dir_all(root.join("pages")).unwrap();

        fs::write(root.join(".storybook/preview.ts"), "").unwrap();
        fs::write(root.join(".eslintrc.js"), "").unwrap();
        fs::write(root.join("pages/home.tsx"), "").unwrap();

        let config = Config {
            source_dir: root.clone(),
            ..Config::default()
        };

        assert_eq!(config.source_files().unwrap(), vec![root.join("pages/home.tsx")]);
    }

    #[test]
    fn test_source_files_missing_root_is_error() {
        let temp = tempdir().unwrap();
        let config = Config {
            source_dir: temp.path().join("nope"),
            ..Config::default()
        };
        assert!(config.source_files().is_err());
    }
}
