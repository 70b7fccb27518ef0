//! Dryad API client: version resolution and file listing
//!
//! Both endpoints answer with HAL documents. The versions listing is assumed to be
//! in ascending chronological order, so the newest version is the last embedded
//! entry. Responses are not paginated further.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Credential, RemoteFile, VersionLocator};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

mod locator;

pub use locator::{DOI_PREFIX, encode_locator};

#[derive(Debug, Default, Deserialize)]
struct Link {
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(rename = "self", default)]
    self_link: Option<Link>,
}

impl Links {
    fn self_href(&self) -> Option<&str> {
        self.self_link
            .as_ref()
            .and_then(|l| l.href.as_deref())
            .filter(|h| !h.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct VersionsEmbedded {
    #[serde(rename = "stash:versions", default)]
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionsPage {
    #[serde(default)]
    count: Option<u64>,
    #[serde(rename = "_embedded")]
    embedded: Option<VersionsEmbedded>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct FilesEmbedded {
    #[serde(rename = "stash:files", default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FilesPage {
    #[serde(rename = "_embedded")]
    embedded: Option<FilesEmbedded>,
}

/// Pick the self link of the newest (last) version, if any
fn latest_version_href(page: &VersionsPage) -> Option<&str> {
    page.embedded
        .as_ref()
        .and_then(|e| e.versions.last())
        .and_then(|v| v.links.self_href())
}

/// Authenticated client for the Dryad dataset API
#[derive(Clone, Debug)]
pub struct DryadClient {
    http_client: reqwest::Client,
    api_host: Url,
    datasets_url: Url,
}

impl DryadClient {
    /// Create a client for the host named in `config`
    pub fn new(http_client: reqwest::Client, config: &Config) -> Result<Self> {
        Ok(Self {
            http_client,
            api_host: config.api_host.clone(),
            datasets_url: config.datasets_url()?,
        })
    }

    fn resolve_href(&self, href: &str) -> Result<Url> {
        self.api_host.join(href).map_err(|e| Error::UnexpectedResponse {
            url: self.api_host.to_string(),
            status: 200,
            body: format!("invalid link '{}': {}", href, e),
        })
    }

    async fn get_json(&self, url: &Url, credential: &Credential) -> Result<(u16, String)> {
        let response = self
            .http_client
            .get(url.clone())
            .header(AUTHORIZATION, credential.bearer())
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "request failed");
                Error::Network(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            warn!(%url, status, error = %e, "failed to read response body");
            Error::Network(e)
        })?;
        Ok((status, body))
    }

    /// Find the newest published version of a dataset
    ///
    /// Returns `Ok(None)` if the service answers with a non-200 status, with an
    /// empty version list, or with a newest entry lacking a self link. Each of those
    /// is logged; callers treat `None` as "resolution failed".
    ///
    /// # Errors
    /// [`Error::Network`] on transport failure, [`Error::UnexpectedResponse`] if a
    /// 200 body is not a versions document.
    pub async fn resolve_latest_version(
        &self,
        identifier: &str,
        credential: &Credential,
    ) -> Result<Option<VersionLocator>> {
        let url = encode_locator(&self.datasets_url, identifier, "/versions")?;
        debug!(identifier, %url, "resolving latest version");

        let (status, body) = self.get_json(&url, credential).await?;
        if status != 200 {
            warn!(identifier, %url, status, %body, "version resolution failed");
            return Ok(None);
        }

        let page: VersionsPage =
            serde_json::from_str(&body).map_err(|e| Error::UnexpectedResponse {
                url: url.to_string(),
                status,
                body: format!("malformed versions listing: {}", e),
            })?;

        let listed = page.embedded.as_ref().map_or(0, |e| e.versions.len());
        if let Some(count) = page.count
            && count as usize != listed
        {
            warn!(identifier, count, listed, "version count disagrees with embedded list");
        }

        let Some(href) = latest_version_href(&page) else {
            warn!(identifier, listed, "no usable version in listing");
            return Ok(None);
        };

        let version = VersionLocator(self.resolve_href(href)?);
        info!(identifier, %version, "resolved latest version");
        Ok(Some(version))
    }

    /// List the files of a dataset version, in the order the service returns them
    ///
    /// Entries without a path or self link cannot be downloaded and are skipped
    /// with a warning.
    ///
    /// # Errors
    /// [`Error::Network`] on transport failure, [`Error::UnexpectedResponse`] on a
    /// non-200 status or a body that is not a files document.
    pub async fn list_files(
        &self,
        version: &VersionLocator,
        credential: &Credential,
    ) -> Result<Vec<RemoteFile>> {
        let url = version.files_url();
        debug!(%url, "listing files");

        let (status, body) = self.get_json(&url, credential).await?;
        if status != 200 {
            warn!(%url, status, %body, "file listing failed");
            return Err(Error::UnexpectedResponse {
                url: url.to_string(),
                status,
                body,
            });
        }

        let page: FilesPage = serde_json::from_str(&body).map_err(|e| Error::UnexpectedResponse {
            url: url.to_string(),
            status,
            body: format!("malformed files listing: {}", e),
        })?;

        let Some(embedded) = page.embedded else {
            return Err(Error::UnexpectedResponse {
                url: url.to_string(),
                status,
                body: "files listing has no _embedded section".to_string(),
            });
        };

        let mut files = Vec::with_capacity(embedded.files.len());
        for entry in embedded.files {
            let (Some(path), Some(href)) = (entry.path.as_deref(), entry.links.self_href()) else {
                warn!(?entry, "skipping file entry without path or self link");
                continue;
            };
            files.push(RemoteFile {
                locator: self.resolve_href(href)?,
                path: path.to_string(),
            });
        }

        info!(%url, count = files.len(), "listed files");
        Ok(files)
    }
}

#[cfg(test)]
mod tests;
