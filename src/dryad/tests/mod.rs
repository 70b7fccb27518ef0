use super::*;
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERSIONS_PATH: &str = "/api/v2/datasets/doi%3A10.5061%2Fdryad.abcd1234/versions";

fn credential() -> Credential {
    Credential {
        token: "test-token".to_string(),
        expiry: Utc::now() + Duration::hours(1),
    }
}

fn client_for(server: &MockServer) -> DryadClient {
    let config = Config {
        api_host: Url::parse(&server.uri()).unwrap(),
        ..Default::default()
    };
    DryadClient::new(reqwest::Client::new(), &config).unwrap()
}

fn versions_body(hrefs: &[&str]) -> serde_json::Value {
    let versions: Vec<_> = hrefs
        .iter()
        .map(|h| json!({"_links": {"self": {"href": h}}}))
        .collect();
    json!({
        "count": hrefs.len(),
        "_embedded": {"stash:versions": versions}
    })
}

// ---------------------------------------------------------------------------
// Version selection
// ---------------------------------------------------------------------------

#[test]
fn test_latest_version_is_last_element() {
    for n in 1..=5 {
        let hrefs: Vec<String> = (0..n).map(|i| format!("/api/v2/versions/{}", i)).collect();
        let refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
        let page: VersionsPage = serde_json::from_value(versions_body(&refs)).unwrap();
        assert_eq!(
            latest_version_href(&page),
            Some(hrefs[n - 1].as_str()),
            "n = {}",
            n
        );
    }
}

#[test]
fn test_empty_version_list_is_absent() {
    let page: VersionsPage = serde_json::from_value(versions_body(&[])).unwrap();
    assert_eq!(latest_version_href(&page), None);

    let page: VersionsPage = serde_json::from_value(json!({"count": 0})).unwrap();
    assert_eq!(latest_version_href(&page), None);
}

#[test]
fn test_last_version_without_href_is_absent() {
    let page: VersionsPage = serde_json::from_value(json!({
        "count": 2,
        "_embedded": {"stash:versions": [
            {"_links": {"self": {"href": "/api/v2/versions/1"}}},
            {"_links": {"self": {"href": ""}}}
        ]}
    }))
    .unwrap();
    assert_eq!(latest_version_href(&page), None);
}

// ---------------------------------------------------------------------------
// resolve_latest_version
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_resolve_latest_version_sends_bearer_and_picks_last() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERSIONS_PATH))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(versions_body(&[
            "/api/v2/versions/10",
            "/api/v2/versions/11",
            "/api/v2/versions/12",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = client
        .resolve_latest_version("abcd1234", &credential())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        version.0.as_str(),
        format!("{}/api/v2/versions/12", server.uri())
    );
}

#[tokio::test]
async fn test_resolve_non_200_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERSIONS_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = client
        .resolve_latest_version("abcd1234", &credential())
        .await
        .unwrap();
    assert!(version.is_none());
}

#[tokio::test]
async fn test_resolve_empty_listing_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERSIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(versions_body(&[])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = client
        .resolve_latest_version("abcd1234", &credential())
        .await
        .unwrap();
    assert!(version.is_none());
}

#[tokio::test]
async fn test_resolve_malformed_body_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERSIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .resolve_latest_version("abcd1234", &credential())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { status: 200, .. }));
}

#[tokio::test]
async fn test_resolve_transport_failure_is_network_error() {
    // Reserve a port, then release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = Config {
        api_host: Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap(),
        ..Default::default()
    };
    let client = DryadClient::new(reqwest::Client::new(), &config).unwrap();

    let err = client
        .resolve_latest_version("abcd1234", &credential())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}

// ---------------------------------------------------------------------------
// list_files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_files_preserves_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/versions/12/files"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"stash:files": [
                {"path": "README.md", "_links": {"self": {"href": "/api/v2/files/1"}}},
                {"path": "data/raw.csv", "_links": {"self": {"href": "/api/v2/files/2"}}},
                {"path": "code.R", "_links": {"self": {"href": "/api/v2/files/3"}}}
            ]}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = VersionLocator(Url::parse(&format!("{}/api/v2/versions/12", server.uri())).unwrap());
    let files = client.list_files(&version, &credential()).await.unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "data/raw.csv", "code.R"]);
    assert_eq!(
        files[1].download_url().as_str(),
        format!("{}/api/v2/files/2/download", server.uri())
    );
}

#[tokio::test]
async fn test_list_files_skips_incomplete_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/versions/12/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"stash:files": [
                {"path": "ok.csv", "_links": {"self": {"href": "/api/v2/files/1"}}},
                {"_links": {"self": {"href": "/api/v2/files/2"}}},
                {"path": "nolink.csv"}
            ]}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = VersionLocator(Url::parse(&format!("{}/api/v2/versions/12", server.uri())).unwrap());
    let files = client.list_files(&version, &credential()).await.unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "ok.csv");
}

#[tokio::test]
async fn test_list_files_non_200_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/versions/12/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = VersionLocator(Url::parse(&format!("{}/api/v2/versions/12", server.uri())).unwrap());
    let err = client.list_files(&version, &credential()).await.unwrap_err();

    match err {
        Error::UnexpectedResponse { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected unexpected response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_files_without_embedded_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/versions/12/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let version = VersionLocator(Url::parse(&format!("{}/api/v2/versions/12", server.uri())).unwrap());
    let err = client.list_files(&version, &credential()).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { .. }));
}
