//! Mock Dryad service and configuration fixtures

use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use dryad_dl::Config;
use dryad_dl::dryad::DOI_PREFIX;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token the mock OAuth endpoint hands out
pub const ISSUED_TOKEN: &str = "issued-token";

/// One file of a mock dataset
pub struct MockFile {
    /// Numeric file id used in the file locator
    pub id: u32,
    /// Relative path declared in the listing
    pub path: &'static str,
    /// Body served by the download endpoint; `Err(status)` serves an error instead
    pub body: Result<Vec<u8>, u16>,
}

impl MockFile {
    /// A healthy file
    pub fn ok(id: u32, path: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            path,
            body: Ok(body.into()),
        }
    }

    /// A file whose download endpoint answers with `status`
    pub fn failing(id: u32, path: &'static str, status: u16) -> Self {
        Self {
            id,
            path,
            body: Err(status),
        }
    }
}

/// Percent-encoded versions path for `identifier`
pub fn versions_path(identifier: &str) -> String {
    let doi = format!("{}{}", DOI_PREFIX, identifier);
    format!("/api/v2/datasets/{}/versions", urlencoding::encode(&doi))
}

/// Configuration pointing at `server`, writing under `root`
pub fn config_for(server: &MockServer, root: &TempDir) -> Config {
    Config {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        parent_directory: Some(root.path().join("out")),
        api_host: Url::parse(&server.uri()).unwrap(),
        token_cache_path: root.path().join(".token_cache.json"),
        ..Default::default()
    }
}

/// Mount a token endpoint that issues [`ISSUED_TOKEN`]
pub async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ISSUED_TOKEN,
                "token_type": "Bearer",
                "expires_in": 36000
            })),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mount a dataset with versions `1..=versions` whose newest version holds `files`
///
/// Older versions have no file listing mounted, so selecting one would fail.
pub async fn mount_dataset(
    server: &MockServer,
    token: &str,
    identifier: &str,
    dataset_id: u32,
    versions: u32,
    files: &[MockFile],
) {
    let bearer = format!("Bearer {}", token);
    let version_links: Vec<_> = (1..=versions)
        .map(|v| json!({"_links": {"self": {"href": format!("/api/v2/versions/{}{:02}", dataset_id, v)}}}))
        .collect();

    Mock::given(method("GET"))
        .and(path(versions_path(identifier)))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": versions,
            "_embedded": {"stash:versions": version_links}
        })))
        .mount(server)
        .await;

    let latest = format!("/api/v2/versions/{}{:02}", dataset_id, versions);
    let file_entries: Vec<_> = files
        .iter()
        .map(|f| json!({"path": f.path, "_links": {"self": {"href": format!("/api/v2/files/{}", f.id)}}}))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("{}/files", latest)))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"stash:files": file_entries}
        })))
        .mount(server)
        .await;

    for file in files {
        let template = match &file.body {
            Ok(body) => ResponseTemplate::new(200).set_body_bytes(body.clone()),
            Err(status) => ResponseTemplate::new(*status).set_body_string("download failed"),
        };
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/files/{}/download", file.id)))
            .and(header("authorization", bearer.as_str()))
            .respond_with(template)
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Mount a versions endpoint for `identifier` answering with `status`
pub async fn mount_versions_status(server: &MockServer, identifier: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(versions_path(identifier)))
        .respond_with(ResponseTemplate::new(status).set_body_string("no such dataset"))
        .mount(server)
        .await;
}

/// Seed the token cache at `path` with a valid token
pub async fn seed_token_cache(path: &Path, token: &str) {
    dryad_dl::TokenCache::new(path)
        .save(token, 10)
        .await
        .unwrap();
}
