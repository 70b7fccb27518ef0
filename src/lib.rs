//! # dryad-dl
//!
//! Fetch the latest version of Dryad datasets and package each one as a zip archive.
//!
//! ## Pipeline
//!
//! For a run over a list of dataset identifiers:
//! - **Authenticate once** - a cached bearer token is reused until it expires,
//!   otherwise an OAuth client-credentials grant is exchanged and cached
//! - **Resolve** - the newest published version of each dataset is looked up
//! - **List** - the files of that version are enumerated
//! - **Download** - each file is streamed to `{PARENT_DIRECTORY}/{id}_data/`
//! - **Archive** - the working directory is zipped to `{PARENT_DIRECTORY}/{id}/dataset.zip`
//!   and removed
//!
//! Everything runs sequentially. A failed file does not stop its dataset, and a
//! failed dataset does not stop the run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dryad_dl::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         client_id: "my-client".to_string(),
//!         client_secret: "my-secret".to_string(),
//!         parent_directory: Some("downloads".into()),
//!         ..Default::default()
//!     };
//!
//!     let orchestrator = Orchestrator::new(config)?;
//!
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = orchestrator.run(&["x3ffbg7m".to_string()]).await?;
//!     println!("{} archived, {} failed", summary.archived(), summary.failed());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Zip packaging of download directories
pub mod archive;
/// OAuth authentication
pub mod auth;
/// Configuration types
pub mod config;
/// Single-file streaming downloads
pub mod downloader;
/// Dryad API client
pub mod dryad;
/// Error types
pub mod error;
/// Run orchestration
pub mod orchestrator;
/// Token cache
pub mod token_cache;
/// Core types
pub mod types;

pub use archive::Archiver;
pub use auth::Authenticator;
pub use config::Config;
pub use downloader::FileDownloader;
pub use dryad::DryadClient;
pub use error::{ArchiveError, DownloadError, Error, ErrorScope, Result};
pub use orchestrator::Orchestrator;
pub use token_cache::TokenCache;
pub use types::{
    Credential, DatasetOutcome, DatasetReport, Event, RemoteFile, RunSummary, VersionLocator,
};
