//! Run orchestration: authenticate once, then fetch each dataset in turn
//!
//! Per identifier the pipeline is resolve → list → download every file → archive.
//! Identifiers are independent: a failure abandons that dataset only. Inside a
//! dataset, file downloads are best-effort and archiving runs over whatever was
//! written. Nothing is retried and nothing runs concurrently.

use crate::archive::Archiver;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::downloader::{FileDownloader, safe_join};
use crate::dryad::DryadClient;
use crate::error::{ArchiveError, Error, ErrorScope, Result};
use crate::token_cache::TokenCache;
use crate::types::{Credential, DatasetOutcome, DatasetReport, Event, RunSummary};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Suffix of the transient per-dataset working directory
pub const WORKING_DIR_SUFFIX: &str = "_data";

/// Working directory for `identifier` under `parent`
pub fn working_dir(parent: &Path, identifier: &str) -> PathBuf {
    parent.join(format!("{}{}", identifier, WORKING_DIR_SUFFIX))
}

/// Final output directory for `identifier` under `parent`
pub fn output_dir(parent: &Path, identifier: &str) -> PathBuf {
    parent.join(identifier)
}

/// Reject identifiers that cannot name a single local directory
fn validate_identifier(identifier: &str) -> Result<()> {
    let invalid = identifier.trim().is_empty()
        || identifier == "."
        || identifier == ".."
        || identifier.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// Accept a packaging result whose only failure was removing the source directory
///
/// The archive is already in place at that point, so the dataset counts as archived.
fn keep_archive_on_cleanup_failure(result: Result<PathBuf>, archive: PathBuf) -> Result<PathBuf> {
    match result {
        Err(Error::Archive(ArchiveError::Cleanup { path, source })) => {
            warn!(path = ?path, error = %source, "archive written but working directory was not removed");
            Ok(archive)
        }
        other => other,
    }
}

/// Sequences authentication and per-dataset retrieval for one run
pub struct Orchestrator {
    config: Config,
    authenticator: Authenticator,
    client: DryadClient,
    downloader: FileDownloader,
    event_tx: broadcast::Sender<Event>,
}

impl Orchestrator {
    /// Build all components from `config`
    ///
    /// One HTTP client is shared by every component. No request timeout is set.
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("dryad-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Buffer 1000 events so slow subscribers don't miss progress updates
        let (event_tx, _rx) = broadcast::channel(1000);

        let authenticator = Authenticator::new(
            http_client.clone(),
            config.token_url()?,
            TokenCache::new(config.token_cache_path.clone()),
        );
        let client = DryadClient::new(http_client.clone(), &config)?;
        let downloader = FileDownloader::new(http_client, event_tx.clone());

        Ok(Self {
            config,
            authenticator,
            client,
            downloader,
            event_tx,
        })
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Obtain the run's credential (cached or fresh)
    ///
    /// The credential is used for the rest of the run without re-checking expiry.
    pub async fn authenticate(&self) -> Result<Credential> {
        self.config.validate_credentials()?;
        let obtained = self
            .authenticator
            .obtain_token(&self.config.client_id, &self.config.client_secret)
            .await?;
        self.emit_event(Event::Authenticated {
            cached: obtained.cached,
        });
        Ok(obtained.credential)
    }

    /// Fetch every identifier in order
    ///
    /// # Errors
    /// Only run-scoped errors (configuration of the credential pair, authentication)
    /// are returned. Dataset-scoped failures are logged and recorded in the summary.
    pub async fn run(&self, identifiers: &[String]) -> Result<RunSummary> {
        let credential = self.authenticate().await.map_err(|e| {
            error!(error = %e, "failed to obtain authentication token");
            e
        })?;

        let mut summary = RunSummary::default();
        for identifier in identifiers {
            info!(identifier = %identifier, "downloading dataset");
            let outcome = match self.fetch_dataset(identifier, &credential).await {
                Ok(outcome) => outcome,
                Err(e) if e.scope() == ErrorScope::Run => {
                    error!(identifier = %identifier, error = %e, "run aborted");
                    return Err(e);
                }
                Err(e) => {
                    error!(identifier = %identifier, error = %e, "dataset failed");
                    self.emit_event(Event::DatasetFailed {
                        identifier: identifier.clone(),
                        error: e.to_string(),
                    });
                    DatasetOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            summary.datasets.push(DatasetReport {
                identifier: identifier.clone(),
                outcome,
            });
        }

        info!(
            archived = summary.archived(),
            failed = summary.failed(),
            "run finished"
        );
        Ok(summary)
    }

    /// Resolve, list, download and archive one dataset
    pub async fn fetch_dataset(
        &self,
        identifier: &str,
        credential: &Credential,
    ) -> Result<DatasetOutcome> {
        let parent = self.config.parent_directory()?;
        validate_identifier(identifier)?;

        let working = working_dir(parent, identifier);
        // Leftovers from an earlier failed run must not end up in this archive
        match tokio::fs::remove_dir_all(&working).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to clear working directory '{}': {}",
                        working.display(),
                        e
                    ),
                )));
            }
        }
        tokio::fs::create_dir_all(&working).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create working directory '{}': {}",
                    working.display(),
                    e
                ),
            ))
        })?;
        info!(identifier, path = ?working, "working directory ready");

        let version = self
            .client
            .resolve_latest_version(identifier, credential)
            .await?
            .ok_or_else(|| Error::VersionNotFound {
                identifier: identifier.to_string(),
            })?;
        self.emit_event(Event::VersionResolved {
            identifier: identifier.to_string(),
            version: version.to_string(),
        });

        let files = self.client.list_files(&version, credential).await?;
        self.emit_event(Event::FilesListed {
            identifier: identifier.to_string(),
            count: files.len(),
        });

        let mut files_downloaded = 0;
        let mut files_failed = 0;
        for file in &files {
            let result = match safe_join(&working, &file.path) {
                Ok(destination) => {
                    self.downloader
                        .download(file, &destination, credential)
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(_) => files_downloaded += 1,
                Err(e) if e.scope() == ErrorScope::File => {
                    files_failed += 1;
                    warn!(identifier, path = %file.path, error = %e, "error downloading file");
                    self.emit_event(Event::FileFailed {
                        path: file.path.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let output = output_dir(parent, identifier);
        tokio::fs::create_dir_all(&output).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create output directory '{}': {}",
                    output.display(),
                    e
                ),
            ))
        })?;

        let archive_path = output.join(&self.config.archive_name);
        let archive = keep_archive_on_cleanup_failure(
            Archiver::package_async(working, output, self.config.archive_name.clone(), true)
                .await,
            archive_path,
        )?;

        info!(
            identifier,
            archive = ?archive,
            files_downloaded,
            files_failed,
            "dataset archived"
        );
        self.emit_event(Event::Archived {
            identifier: identifier.to_string(),
            path: archive.clone(),
        });

        Ok(DatasetOutcome::Archived {
            archive,
            files_downloaded,
            files_failed,
        })
    }
}
