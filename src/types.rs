//! Core types for dryad-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Bearer credential with an absolute expiry
///
/// This is also the on-disk format of the token cache:
/// `{"token": "...", "expiry": "2026-10-16T22:59:00Z"}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque bearer token
    pub token: String,
    /// Instant after which the token must not be used to start a run
    pub expiry: DateTime<Utc>,
}

impl Credential {
    /// Whether the credential may still be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// Keep tokens out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Locator of one immutable dataset version, as returned by the service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionLocator(pub Url);

impl VersionLocator {
    /// URL of the file listing for this version
    pub fn files_url(&self) -> Url {
        append_path(&self.0, "/files")
    }
}

impl fmt::Display for VersionLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file belonging to a dataset version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    /// Self-locator of the file resource
    pub locator: Url,
    /// Path of the file relative to the dataset root
    pub path: String,
}

impl RemoteFile {
    /// URL that streams the file contents
    pub fn download_url(&self) -> Url {
        append_path(&self.locator, "/download")
    }
}

fn append_path(url: &Url, suffix: &str) -> Url {
    let mut url = url.clone();
    let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
    url.set_path(&path);
    url
}

/// Events published while a run progresses
///
/// Subscribe via [`crate::Orchestrator::subscribe`]. Every event is also logged.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A credential is available for the run
    Authenticated {
        /// True if the credential came from the token cache
        cached: bool,
    },

    /// The latest version of a dataset was found
    VersionResolved {
        /// Dataset identifier
        identifier: String,
        /// Version locator
        version: String,
    },

    /// The file listing of a dataset was retrieved
    FilesListed {
        /// Dataset identifier
        identifier: String,
        /// Number of files in the listing
        count: usize,
    },

    /// Download progress of a single file
    ///
    /// Only emitted when the server declared a content length.
    Downloading {
        /// Path of the file relative to the dataset root
        path: String,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
        /// Bytes written so far
        bytes_downloaded: u64,
        /// Declared content length
        total_bytes: u64,
    },

    /// A file was written completely
    FileComplete {
        /// Path of the file relative to the dataset root
        path: String,
        /// Bytes written
        bytes: u64,
    },

    /// A file could not be downloaded
    FileFailed {
        /// Path of the file relative to the dataset root
        path: String,
        /// Error message
        error: String,
    },

    /// A dataset archive was written
    Archived {
        /// Dataset identifier
        identifier: String,
        /// Archive path
        path: PathBuf,
    },

    /// A dataset was abandoned
    DatasetFailed {
        /// Dataset identifier
        identifier: String,
        /// Error message
        error: String,
    },
}

/// Outcome of fetching one dataset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetOutcome {
    /// Archive written
    Archived {
        /// Archive path
        archive: PathBuf,
        /// Files written successfully
        files_downloaded: usize,
        /// Files that failed to download
        files_failed: usize,
    },
    /// Dataset abandoned before an archive was written
    Failed {
        /// Error message
        error: String,
    },
}

/// Per-identifier entry of a [`RunSummary`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetReport {
    /// Dataset identifier as given on the command line
    pub identifier: String,
    /// What happened
    pub outcome: DatasetOutcome,
}

/// Result of a whole run, one report per identifier in input order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Reports in input order
    pub datasets: Vec<DatasetReport>,
}

impl RunSummary {
    /// Number of datasets that produced an archive
    pub fn archived(&self) -> usize {
        self.datasets
            .iter()
            .filter(|d| matches!(d.outcome, DatasetOutcome::Archived { .. }))
            .count()
    }

    /// Number of datasets that were abandoned
    pub fn failed(&self) -> usize {
        self.datasets.len() - self.archived()
    }
}
