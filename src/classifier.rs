//! Heuristic detection of externally hosted image URLs.
//!
//! The classifier is an OR of cheap signals: a known image/CDN host, an image
//! file extension on the path, an `images`/`img`/`photos` path segment, or an
//! image-ish query marker. It is deliberately approximate. A URL such as
//! `https://cdn.example.com/images/report.pdf` is accepted (false positive) and
//! `https://example.com/avatar?id=3` is missed (false negative); both are
//! accepted risk rather than bugs.

use url::Url;

use crate::config::Config;

/// Path segments that mark a URL as image-bearing.
const IMAGE_PATH_SEGMENTS: &[&str] = &["images", "img", "photos"];

/// Query-style markers that mark a URL as image-bearing.
const IMAGE_QUERY_MARKERS: &[&str] = &["image=", "picture=", "photo="];

#[derive(Debug, Clone)]
pub struct ImageUrlClassifier {
    domains: Vec<String>,
    extensions: Vec<String>,
}

impl Default for ImageUrlClassifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ImageUrlClassifier {
    /// Build a classifier from a host allow-list and dotted image extensions.
    pub fn new(domains: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            domains: domains.into_iter().map(|d| d.to_ascii_lowercase()).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.image_domains.clone(), config.image_extensions.clone())
    }

    /// Decide whether `value` denotes an external image resource.
    pub fn is_image_url(&self, value: &str) -> bool {
        if value.is_empty() || !has_http_scheme(value) {
            return false;
        }

        let Ok(url) = Url::parse(value) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if let Some(host) = url.host_str() {
            if self.is_known_host(host) {
                return true;
            }
        }

        let path = url.path().to_ascii_lowercase();
        if self.extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
            return true;
        }

        if url
            .path_segments()
            .is_some_and(|mut segments| segments.any(|s| IMAGE_PATH_SEGMENTS.contains(&s)))
        {
            return true;
        }

        IMAGE_QUERY_MARKERS.iter().any(|m| value.contains(m))
    }

    fn is_known_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// `data:` URIs and relative paths fail here before any parsing happens.
fn has_http_scheme(value: &str) -> bool {
    let head: String = value.chars().take(8).collect::<String>().to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}
