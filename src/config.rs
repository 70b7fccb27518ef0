//! Configuration types for dryad-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment key holding the OAuth client ID
pub const CLIENT_ID_KEY: &str = "CLIENT_ID";
/// Environment key holding the OAuth client secret
pub const CLIENT_SECRET_KEY: &str = "CLIENT_SECRET";
/// Environment key holding the base path for working and output directories
pub const PARENT_DIRECTORY_KEY: &str = "PARENT_DIRECTORY";
/// Environment key overriding the API host
pub const API_HOST_KEY: &str = "DRYAD_API_HOST";
/// Environment key overriding the token cache location
pub const TOKEN_CACHE_KEY: &str = "DRYAD_TOKEN_CACHE";

/// Default Dryad host
pub const DEFAULT_API_HOST: &str = "https://datadryad.org";

/// Main configuration for a fetch run
///
/// Built once at startup and passed by reference to every component that needs it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// OAuth client ID (required)
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret (required)
    #[serde(default)]
    pub client_secret: String,

    /// Base path under which `{identifier}_data` and `{identifier}` are created
    #[serde(default)]
    pub parent_directory: Option<PathBuf>,

    /// Dryad host; API and OAuth endpoints are derived from it (default: "https://datadryad.org")
    #[serde(default = "default_api_host")]
    pub api_host: Url,

    /// Token cache file (default: ".token_cache.json")
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: PathBuf,

    /// Name of the archive written into each output directory (default: "dataset.zip")
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            parent_directory: None,
            api_host: default_api_host(),
            token_cache_path: default_token_cache_path(),
            archive_name: default_archive_name(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Missing credentials are not rejected here; see [`Config::validate_credentials`].
    /// An unparseable `DRYAD_API_HOST` is.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config {
            client_id: lookup(CLIENT_ID_KEY).unwrap_or_default(),
            client_secret: lookup(CLIENT_SECRET_KEY).unwrap_or_default(),
            parent_directory: lookup(PARENT_DIRECTORY_KEY)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ..Default::default()
        };

        if let Some(host) = lookup(API_HOST_KEY).filter(|h| !h.trim().is_empty()) {
            config.api_host = Url::parse(host.trim())
                .map_err(|e| Error::config(API_HOST_KEY, format!("invalid URL '{}': {}", host, e)))?;
        }

        if let Some(path) = lookup(TOKEN_CACHE_KEY).filter(|p| !p.trim().is_empty()) {
            config.token_cache_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Ensure the credential-exchange pair is present
    pub fn validate_credentials(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::config(CLIENT_ID_KEY, "CLIENT_ID is not set"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::config(CLIENT_SECRET_KEY, "CLIENT_SECRET is not set"));
        }
        Ok(())
    }

    /// The configured parent directory, or a per-dataset configuration error
    pub fn parent_directory(&self) -> Result<&Path> {
        match self.parent_directory.as_deref() {
            Some(p) if !p.as_os_str().is_empty() => Ok(p),
            _ => Err(Error::config(
                PARENT_DIRECTORY_KEY,
                "PARENT_DIRECTORY is not set",
            )),
        }
    }

    /// Base URL of the dataset collection (`{host}/api/v2/datasets/`)
    pub fn datasets_url(&self) -> Result<Url> {
        self.join_host("/api/v2/datasets/")
    }

    /// OAuth token endpoint (`{host}/oauth/token`)
    pub fn token_url(&self) -> Result<Url> {
        self.join_host("/oauth/token")
    }

    fn join_host(&self, path: &str) -> Result<Url> {
        self.api_host.join(path).map_err(|e| {
            Error::config(
                API_HOST_KEY,
                format!("cannot join '{}' onto {}: {}", path, self.api_host, e),
            )
        })
    }
}

// Constant is a valid absolute URL
#[allow(clippy::expect_used)]
fn default_api_host() -> Url {
    Url::parse(DEFAULT_API_HOST).expect("default API host is a valid URL")
}

fn default_token_cache_path() -> PathBuf {
    PathBuf::from(".token_cache.json")
}

fn default_archive_name() -> String {
    "dataset.zip".to_string()
}
