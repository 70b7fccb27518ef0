//! Streaming download of a single dataset file

use crate::error::{DownloadError, Error, Result};
use crate::types::{Credential, Event, RemoteFile};
use futures::TryStreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio_util::io::StreamReader;
use tracing::{debug, info, trace};

/// Size of each read from the response body
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Join a remote relative path onto the working directory
///
/// Rejects paths that are empty, absolute, or climb out with `..`.
pub fn safe_join(working_dir: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let mut joined = working_dir.to_path_buf();
    let mut pushed = false;

    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DownloadError::UnsafePath {
                    path: relative.to_string(),
                }
                .into());
            }
        }
    }

    if !pushed {
        return Err(DownloadError::UnsafePath {
            path: relative.to_string(),
        }
        .into());
    }
    Ok(joined)
}

/// Tracks bytes written against the declared length and reports percentage steps
///
/// Percentages are computed in tenths of a percent with integer math, so they never
/// decrease and only reach 100.0 once every declared byte has been written.
#[derive(Debug)]
pub struct ProgressTracker {
    total: Option<u64>,
    downloaded: u64,
    last_tenths: Option<u64>,
}

impl ProgressTracker {
    /// Start tracking; a missing or zero `total` disables percentage reporting
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            downloaded: 0,
            last_tenths: None,
        }
    }

    /// Bytes recorded so far
    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Declared length, if known and non-zero
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Record `bytes` more; returns the new percentage if it advanced
    pub fn advance(&mut self, bytes: u64) -> Option<f32> {
        self.downloaded += bytes;
        let total = self.total?;
        let tenths = (self.downloaded.saturating_mul(1000) / total).min(1000);
        if self.last_tenths.is_some_and(|last| tenths <= last) {
            return None;
        }
        self.last_tenths = Some(tenths);
        Some(tenths as f32 / 10.0)
    }
}

/// Downloads dataset files one at a time
#[derive(Clone, Debug)]
pub struct FileDownloader {
    http_client: reqwest::Client,
    event_tx: broadcast::Sender<Event>,
}

impl FileDownloader {
    /// Create a downloader publishing progress on `event_tx`
    pub fn new(http_client: reqwest::Client, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            http_client,
            event_tx,
        }
    }

    fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Stream `file` to `destination`, returning the number of bytes written
    ///
    /// A non-success status fails before the destination is created. Failures after
    /// that leave whatever was written in place; the partial file is not removed.
    pub async fn download(
        &self,
        file: &RemoteFile,
        destination: &Path,
        credential: &Credential,
    ) -> Result<u64> {
        let url = file.download_url();
        debug!(%url, ?destination, "starting download");

        let response = self
            .http_client
            .get(url.clone())
            .header(AUTHORIZATION, credential.bearer())
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| DownloadError::Transfer {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let mut progress = ProgressTracker::new(response.content_length());

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| local_write(parent, e))?;
        }
        let mut out = tokio::fs::File::create(destination)
            .await
            .map_err(|e| local_write(destination, e))?;

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = std::pin::pin!(StreamReader::new(stream));
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| DownloadError::Transfer {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])
                .await
                .map_err(|e| local_write(destination, e))?;

            if let Some(percent) = progress.advance(n as u64) {
                trace!(path = %file.path, percent, "progress");
                self.emit_event(Event::Downloading {
                    path: file.path.clone(),
                    percent,
                    bytes_downloaded: progress.downloaded(),
                    total_bytes: progress.total().unwrap_or_default(),
                });
            }
        }

        out.flush().await.map_err(|e| local_write(destination, e))?;

        let bytes = progress.downloaded();
        info!(path = %file.path, bytes, "downloaded file");
        self.emit_event(Event::FileComplete {
            path: file.path.clone(),
            bytes,
        });
        Ok(bytes)
    }
}

fn local_write(path: &Path, source: std::io::Error) -> Error {
    DownloadError::LocalWrite {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
