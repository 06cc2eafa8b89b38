//! HTTP(S) image download.
//!
//! Streams the response body into a `.part` sibling of the destination and
//! renames it into place only after the copy has been flushed, so a failed
//! transfer never leaves a file that looks complete.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client, ClientBuilder};
use tracing::debug;

use super::{AssetFetcher, FetchError};
use crate::config::FetchConfig;

pub struct HttpFetcher {
    client: Client,
    progress: bool,
}

impl HttpFetcher {
    /// Build a fetcher with the configured timeout and `User-Agent`.
    pub fn new(settings: &FetchConfig) -> Result<Self, FetchError> {
        let client = client_builder(settings)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            progress: settings.progress,
        })
    }

    /// Wrap an already configured client.
    #[must_use]
    pub fn with_client(client: Client, progress: bool) -> Self {
        Self { client, progress }
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        match total {
            Some(total) if total > 0 => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("  {bar:40.cyan/blue} {percent}% ({bytes}/{total_bytes}) {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                pb
            }
            _ => ProgressBar::new_spinner(),
        }
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let pb = self.progress_bar(resp.content_length());
        let part = part_path(dest);

        let result = stream_to_file(pb.wrap_read(resp), &part).and_then(|bytes| {
            fs::rename(&part, dest).map_err(StreamError::Write)?;
            Ok(bytes)
        });
        pb.finish_and_clear();

        match result {
            Ok(bytes) => {
                debug!("Wrote {bytes} bytes to {}", dest.display());
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(match e {
                    StreamError::Read(source) => FetchError::Body {
                        url: url.to_string(),
                        source,
                    },
                    StreamError::Write(source) => FetchError::Write {
                        url: url.to_string(),
                        path: dest.to_path_buf(),
                        source,
                    },
                })
            }
        }
    }
}

/// Client settings shared by every request: timeout and browser `User-Agent`.
fn client_builder(settings: &FetchConfig) -> ClientBuilder {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(settings.user_agent.as_str())
}

/// Which side of the copy failed.
enum StreamError {
    Read(io::Error),
    Write(io::Error),
}

/// Copy `reader` into a fresh file at `path`, returning the byte count.
fn stream_to_file(mut reader: impl Read, path: &Path) -> Result<u64, StreamError> {
    let file = fs::File::create(path).map_err(StreamError::Write)?;
    let mut writer = BufWriter::new(file);
    let mut buf = [0u8; 16 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(StreamError::Write)?;
        total += n as u64;
    }
    writer.flush().map_err(StreamError::Write)?;
    Ok(total)
}

/// Temporary path the body is streamed into before the final rename.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
