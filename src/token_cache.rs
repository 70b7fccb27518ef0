//! Single-entry, file-backed cache for the bearer credential
//!
//! The cache holds at most one [`Credential`]. Saving replaces the file through a
//! rename so a crash mid-write never leaves a truncated record behind. There is no
//! locking: two concurrent runs sharing one cache file are not supported.

use crate::error::{Error, Result};
use crate::types::Credential;
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted credential store
#[derive(Clone, Debug)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Create a cache backed by `path`; nothing is read until [`TokenCache::load`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached credential if it has not expired
    ///
    /// An expired record is deleted. A record that cannot be read or parsed is
    /// reported as a miss and left to be overwritten by the next save.
    pub async fn load(&self) -> Result<Option<Credential>> {
        self.load_at(Utc::now()).await
    }

    /// [`TokenCache::load`] against an explicit clock
    pub async fn load_at(&self, now: DateTime<Utc>) -> Result<Option<Credential>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no cached token");
                return Ok(None);
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read token cache, treating as miss");
                return Ok(None);
            }
        };

        let credential: Credential = match serde_json::from_slice(&content) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "malformed token cache, treating as miss");
                return Ok(None);
            }
        };

        if credential.is_valid_at(now) {
            info!(expiry = %credential.expiry, "token cache hit");
            return Ok(Some(credential));
        }

        info!(expiry = %credential.expiry, "token cache miss: cached token expired");
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
        }
        Ok(None)
    }

    /// Persist `token`, valid for `lifetime_hours` minus one minute of margin
    pub async fn save(&self, token: &str, lifetime_hours: i64) -> Result<Credential> {
        self.save_at(token, lifetime_hours, Utc::now()).await
    }

    /// [`TokenCache::save`] against an explicit clock
    pub async fn save_at(
        &self,
        token: &str,
        lifetime_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Credential> {
        let credential = Credential {
            token: token.to_string(),
            expiry: now + Duration::minutes(lifetime_hours * 60 - 1),
        };

        let json = serde_json::to_vec(&credential)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &json).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to write token cache '{}': {}", tmp_path.display(), e),
            ))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to replace token cache '{}': {}", self.path.display(), e),
            ))
        })?;

        debug!(path = ?self.path, expiry = %credential.expiry, "token cached");
        Ok(credential)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token_cache".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
