//! Content store behavior against a mock HTTP server.

use std::time::Duration;

use archive_harvest::scrapers::HttpClient;
use archive_harvest::storage::{compute_digest, sidecar_path, ContentStore, FetchError};
use tempfile::tempdir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &[u8] = b"%PDF-1.7 annual report body";

fn store(root: &std::path::Path) -> ContentStore {
    let client = HttpClient::new(Duration::from_secs(5), None).expect("client");
    ContentStore::new(root, client)
}

fn url(server: &MockServer, file: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), file)).expect("mock url")
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let store = store(dir.path());
    let target = url(&server, "/media/report.pdf");

    let first = store.fetch(&target, "report.pdf").await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.local_filename, "report.pdf");
    assert_eq!(first.content_digest, compute_digest(BODY));

    let second = store.fetch(&target, "report.pdf").await.unwrap();
    assert!(second.cached);
    assert_eq!(second.content_digest, first.content_digest);

    let stored = dir.path().join("report.pdf");
    assert_eq!(std::fs::read(&stored).unwrap(), BODY);
    assert_eq!(
        std::fs::read_to_string(sidecar_path(&stored)).unwrap(),
        first.content_digest
    );
    assert!(!dir.path().join("report.pdf.part").exists());
    // The mock verifies `.expect(1)` on drop.
}

#[tokio::test]
async fn test_tampered_file_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let store = store(dir.path());
    let target = url(&server, "/r.pdf");

    store.fetch(&target, "r.pdf").await.unwrap();
    std::fs::write(dir.path().join("r.pdf"), b"truncated").unwrap();

    let again = store.fetch(&target, "r.pdf").await.unwrap();
    assert!(!again.cached);
    assert_eq!(std::fs::read(dir.path().join("r.pdf")).unwrap(), BODY);
}

#[tokio::test]
async fn test_error_status_leaves_no_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let err = store(dir.path())
        .fetch(&url(&server, "/missing.pdf"), "missing.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!dir.path().join("missing.pdf").exists());
    assert!(!dir.path().join("missing.pdf.part").exists());
    assert!(!dir.path().join("missing.pdf.sha256").exists());
}

#[tokio::test]
async fn test_unwritable_store_is_write_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    // A regular file where the store directory should be.
    let blocked = dir.path().join("store");
    std::fs::write(&blocked, b"").unwrap();

    let err = store(&blocked)
        .fetch(&url(&server, "/r.pdf"), "r.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Write { .. }));
}

#[tokio::test]
async fn test_transport_error() {
    let dir = tempdir().unwrap();
    // Nothing listens on the discard port.
    let target = Url::parse("http://127.0.0.1:9/r.pdf").unwrap();
    let err = store(dir.path()).fetch(&target, "r.pdf").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
}

#[tokio::test]
async fn test_desired_name_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let stored = store(dir.path())
        .fetch(&url(&server, "/x"), "../Annual Report 2021.pdf")
        .await
        .unwrap();

    assert_eq!(stored.local_filename, "Annual_Report_2021.pdf");
    assert!(dir.path().join("Annual_Report_2021.pdf").is_file());
}
