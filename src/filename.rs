//! Deterministic local filenames for downloaded images.
//!
//! Shape: `<hash>-<stem><extension>`, where `hash` is the first 8 hex chars of
//! the SHA-256 of the full URL. The same URL always maps to the same file, so
//! reruns land on files that already exist.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::Config;

const HASH_LEN: usize = 8;
const MAX_STEM_LEN: usize = 30;
const EMPTY_STEM: &str = "image";

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());

#[derive(Debug, Clone)]
pub struct FilenameDeriver {
    image_extensions: Vec<String>,
    default_extension: String,
}

impl Default for FilenameDeriver {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FilenameDeriver {
    pub fn new(image_extensions: Vec<String>, default_extension: String) -> Self {
        Self {
            image_extensions,
            default_extension,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.image_extensions.clone(),
            config.default_extension.clone(),
        )
    }

    /// Compute the local filename for `url`.
    pub fn derive(&self, url: &str) -> String {
        let hash = url_hash(url);
        let name = last_segment(url);

        let (stem, own_ext) = match name.rsplit_once('.') {
            Some((stem, ext))
                if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                (stem, Some(ext))
            }
            _ => (name.as_str(), None),
        };

        let extension = match own_ext {
            Some(ext) => format!(".{ext}"),
            None => self.guess_extension(url),
        };

        let mut stem: String = NON_ALNUM
            .replace_all(stem, "")
            .chars()
            .take(MAX_STEM_LEN)
            .collect();
        if stem.is_empty() {
            stem = EMPTY_STEM.to_string();
        }

        format!("{hash}-{stem}{extension}")
    }

    /// First known image extension mentioned anywhere in the URL, else the fallback.
    fn guess_extension(&self, url: &str) -> String {
        let lower = url.to_ascii_lowercase();
        self.image_extensions
            .iter()
            .find(|ext| lower.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(&self.default_extension)
            .clone()
    }
}

/// Shorthand for [`FilenameDeriver::derive`] with the default extension lists.
pub fn derive_filename(url: &str) -> String {
    FilenameDeriver::default().derive(url)
}

fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(HASH_LEN);
    hex
}

/// Last non-empty path segment, without query string or fragment.
fn last_segment(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string();
    }
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
