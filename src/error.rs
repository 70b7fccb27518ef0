//! Error types for dryad-dl
//!
//! Errors are grouped by the scope they are fatal for:
//! - configuration and authentication problems stop the whole run
//! - version resolution, file listing and archiving problems abandon one dataset
//! - download problems only affect the file being transferred

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dryad-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dryad-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration value is missing or empty
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "CLIENT_ID")
        key: Option<String>,
    },

    /// Credential exchange rejected by the remote service
    #[error("authentication failed with status {status}: {body}")]
    Auth {
        /// HTTP status code returned by the token endpoint
        status: u16,
        /// Response body returned by the token endpoint
        body: String,
    },

    /// Transport-level failure (connection refused, reset, TLS, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote service answered, but not with what was expected
    #[error("unexpected response from {url} (status {status}): {body}")]
    UnexpectedResponse {
        /// Requested URL
        url: String,
        /// HTTP status code of the response
        status: u16,
        /// Response body, or a description of what was malformed
        body: String,
    },

    /// No published version of the dataset could be resolved
    #[error("no published version found for dataset '{identifier}'")]
    VersionNotFound {
        /// Dataset identifier
        identifier: String,
    },

    /// Identifier cannot be used as a local directory name
    #[error("invalid dataset identifier '{0}'")]
    InvalidIdentifier(String),

    /// Failure retrieving a single file
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Failure creating the compressed output
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The download endpoint answered with a non-success status
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// HTTP status code of the response
        status: u16,
    },

    /// The response body stream failed mid-transfer
    #[error("transfer of {url} interrupted: {reason}")]
    Transfer {
        /// Requested URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Writing the local file failed
    #[error("failed to write {path}: {source}")]
    LocalWrite {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The listed relative path would escape the working directory
    #[error("refusing unsafe file path {path:?}")]
    UnsafePath {
        /// Path as declared by the remote listing
        path: String,
    },
}

/// Archive creation errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be created
    #[error("failed to create archive {path}: {reason}")]
    Create {
        /// Archive path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Adding an entry or finalizing the archive failed
    #[error("failed to write archive {path}: {reason}")]
    Write {
        /// Archive path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The archive was written but the source directory could not be removed
    #[error("archive written but failed to remove {path}: {source}")]
    Cleanup {
        /// Source directory that was left behind
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// How far an error propagates before it is recovered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorScope {
    /// Nothing else can proceed; the run stops
    Run,
    /// The current dataset is abandoned; the run continues with the next identifier
    Dataset,
    /// Only the current file failed; the dataset continues
    File,
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Classify this error by the scope it is fatal for
    pub fn scope(&self) -> ErrorScope {
        match self {
            Error::Config { key, .. } if key.as_deref() == Some(crate::config::PARENT_DIRECTORY_KEY) => {
                ErrorScope::Dataset
            }
            Error::Config { .. } | Error::Auth { .. } => ErrorScope::Run,
            Error::Download(_) => ErrorScope::File,
            Error::Network(_)
            | Error::UnexpectedResponse { .. }
            | Error::VersionNotFound { .. }
            | Error::InvalidIdentifier(_)
            | Error::Archive(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorScope::Dataset,
        }
    }
}
