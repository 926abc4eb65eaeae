//! Transport engine tests against a local mock server
//!
//! Covers throttle retry bounds, status classification, JSON decoding,
//! payload re-encoding on retry and cancellation.

use reqwest::Method;
use std::io::{Cursor, Write};
use std::time::Duration;
use ucare_client::{
    CancellationSignal, Client, ClientError, Config, Endpoint, FileParams, ListParams, Ordering,
    StoreMode,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MAX_RETRIES: u32 = 3;

fn config_for(server: &MockServer) -> Config {
    Config::new("demopublickey", "demosecretkey")
        .with_rest_api_base(server.uri())
        .with_upload_api_base(server.uri())
        .with_throttle_retries(MAX_RETRIES, Duration::from_millis(10))
}

fn client_for(server: &MockServer) -> Client {
    Client::new(config_for(server)).unwrap()
}

fn upload(data: &'static [u8]) -> FileParams<Cursor<&'static [u8]>> {
    FileParams::new(Cursor::new(data), "hello.txt")
}

async fn mount_throttled(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/base/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(times)
        .with_priority(1)
        .mount(server)
        .await;
}

async fn mount_uploaded(server: &MockServer, file: &str) {
    Mock::given(method("POST"))
        .and(path("/base/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "file": file })))
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

/// Multipart body with its random boundary replaced, for comparing attempts
fn normalized_body(request: &wiremock::Request) -> String {
    let content_type = request
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    let boundary = content_type.split("boundary=").nth(1).unwrap();
    String::from_utf8_lossy(&request.body).replace(boundary, "BOUNDARY")
}

#[tokio::test]
async fn test_throttled_then_success() {
    for k in 0..MAX_RETRIES {
        let server = MockServer::start().await;
        if k > 0 {
            mount_throttled(&server, k as u64).await;
        }
        mount_uploaded(&server, "abc-123").await;

        let id = client_for(&server).upload_file(upload(b"hello")).await.unwrap();
        assert_eq!(id, "abc-123");
        assert_eq!(request_count(&server).await, k as usize + 1);
    }
}

#[tokio::test]
async fn test_throttled_until_budget_exhausted() {
    let server = MockServer::start().await;
    mount_throttled(&server, 100).await;
    mount_uploaded(&server, "never").await;

    let err = client_for(&server).upload_file(upload(b"hello")).await.unwrap_err();
    assert!(matches!(err, ClientError::Throttled { attempts } if attempts == MAX_RETRIES + 1));
    assert!(err.is_retryable());
    assert_eq!(request_count(&server).await, MAX_RETRIES as usize + 1);
}

#[tokio::test]
async fn test_throttled_max_retries_times_then_success() {
    let server = MockServer::start().await;
    mount_throttled(&server, MAX_RETRIES as u64).await;
    mount_uploaded(&server, "last-chance").await;

    let id = client_for(&server).upload_file(upload(b"hello")).await.unwrap();
    assert_eq!(id, "last-chance");
    assert_eq!(request_count(&server).await, MAX_RETRIES as usize + 1);
}

#[tokio::test]
async fn test_throttled_one_past_budget() {
    let server = MockServer::start().await;
    mount_throttled(&server, MAX_RETRIES as u64 + 1).await;
    mount_uploaded(&server, "late").await;

    let err = client_for(&server).upload_file(upload(b"hello")).await.unwrap_err();
    assert!(matches!(err, ClientError::Throttled { .. }));
    assert_eq!(request_count(&server).await, MAX_RETRIES as usize + 1);
}

#[tokio::test]
async fn test_bad_request_maps_to_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad field"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).upload_file(upload(b"hello")).await.unwrap_err();
    match err {
        ClientError::Validation { message } => assert_eq!(message, "bad field"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_passes_message_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string(r#"{"detail":"Simple authentication over HTTP is forbidden."}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).list_files(ListParams::new()).await.unwrap_err();
    match err {
        ClientError::Forbidden { message } => {
            assert_eq!(message, r#"{"detail":"Simple authentication over HTTP is forbidden."}"#)
        }
        other => panic!("expected forbidden error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_payload_too_large() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413).set_body_string("ignored"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).upload_file(upload(b"hello")).await.unwrap_err();
    assert!(matches!(err, ClientError::FileTooLarge));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unlisted_status_is_treated_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({ "file": "odd" })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server).upload_file(upload(b"hello")).await.unwrap();
    assert_eq!(id, "odd");
}

#[tokio::test]
async fn test_malformed_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).upload_file(upload(b"hello")).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_upload_form_fields() {
    let server = MockServer::start().await;
    mount_uploaded(&server, "abc-123").await;

    let params = upload(b"file body").with_store(StoreMode::Always);
    client_for(&server).upload_file(params).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(body.contains("name=\"UPLOADCARE_PUB_KEY\"\r\n\r\ndemopublickey"));
    assert!(body.contains("name=\"UPLOADCARE_STORE\"\r\n\r\n1"));
    assert!(body.contains("name=\"file\"; filename=\"hello.txt\""));
    assert!(body.contains("Content-Type: text/plain"));
    assert!(body.contains("file body"));
    assert!(!body.contains("name=\"signature\""));
    assert!(!body.contains("name=\"expire\""));
}

#[tokio::test]
async fn test_seekable_stream_resent_identically() {
    let server = MockServer::start().await;
    mount_throttled(&server, 1).await;
    mount_uploaded(&server, "abc-123").await;

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(b"contents of a seekable file").unwrap();

    let id = client_for(&server)
        .upload_file(FileParams::new(&mut file, "notes.txt"))
        .await
        .unwrap();
    assert_eq!(id, "abc-123");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first = normalized_body(&requests[0]);
    assert!(first.contains("contents of a seekable file"));
    assert_eq!(first, normalized_body(&requests[1]));
}

#[tokio::test]
async fn test_signed_upload_carries_fresh_token_each_attempt() {
    let server = MockServer::start().await;
    mount_throttled(&server, 1).await;
    mount_uploaded(&server, "signed").await;

    let client = Client::new(config_for(&server).with_signed_uploads()).unwrap();
    client.upload_file(upload(b"hello")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("name=\"signature\""));
        assert!(body.contains("name=\"expire\""));
    }
}

#[tokio::test]
async fn test_list_files_query_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/"))
        .and(query_param("stored", "false"))
        .and(query_param("ordering", "-datetime_uploaded"))
        .and(header("authorization", "Uploadcare.Simple demopublickey:demosecretkey"))
        .and(header("accept", "application/vnd.uploadcare-v0.5+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "next": null,
            "previous": null,
            "total": 1,
            "per_page": 100,
            "results": [{
                "uuid": "8b9a3a4e-1a2b-4c5d-8e9f-0a1b2c3d4e5f",
                "datetime_uploaded": "2024-01-01T00:00:00Z",
                "size": 42,
                "original_filename": "a.txt",
                "is_image": false,
                "is_ready": true
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client_for(&server)
        .list_files(ListParams::new().stored(false).ordering(Ordering::UploadedAtDesc))
        .await
        .unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.results[0].size, 42);
    assert_eq!(list.results[0].original_filename.as_deref(), Some("a.txt"));
}

#[tokio::test]
async fn test_list_files_without_filters_sends_no_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "next": null, "previous": null, "total": 0, "per_page": 100, "results": []
        })))
        .mount(&server)
        .await;

    client_for(&server).list_files(ListParams::new()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_list_files_page_follows_absolute_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/"))
        .and(query_param("from", "2024-01-01T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "next": null, "previous": null, "total": 3, "per_page": 2, "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let next = format!("{}/files/?limit=2&from=2024-01-01T00:00:00", server.uri());
    let page = client_for(&server).list_files_page(&next).await.unwrap();
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_execute_without_output() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/files/abc/storage/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut request = client
        .new_request(Endpoint::RestApi, Method::DELETE, "/files/abc/storage/", None)
        .unwrap();
    client.execute(&mut request).await.unwrap();
}

#[tokio::test]
async fn test_execute_drains_unused_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/abc/storage/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut request = client
        .new_request(Endpoint::RestApi, Method::POST, "/files/abc/storage/", None)
        .unwrap();
    client.execute(&mut request).await.unwrap();
}

#[tokio::test]
async fn test_list_files_page_rejects_foreign_host() {
    let server = MockServer::start().await;
    let foreign = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "next": null, "previous": null, "total": 0, "per_page": 1, "results": []
        })))
        .mount(&foreign)
        .await;

    let next = format!("{}/files/?page=2", foreign.uri());
    let err = client_for(&server).list_files_page(&next).await.unwrap_err();

    assert!(matches!(err, ClientError::Config(_)));
    assert_eq!(request_count(&foreign).await, 0);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "next": null, "previous": null, "total": 0, "per_page": 1, "results": []
                }))
                .set_delay(Duration::from_secs(20)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let signal = CancellationSignal::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let mut request = client
        .new_request(
            Endpoint::RestApi,
            Method::GET,
            "/files/",
            Some(Box::new(ListParams::new())),
        )
        .unwrap()
        .with_cancellation(signal);
    let started = std::time::Instant::now();
    let err = client
        .execute_json::<serde_json::Value>(&mut request)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let server = MockServer::start().await;
    mount_throttled(&server, 100).await;

    let config = config_for(&server).with_throttle_retries(MAX_RETRIES, Duration::from_secs(30));
    let client = Client::new(config).unwrap();

    let signal = CancellationSignal::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let params = upload(b"hello");
    let mut request = client
        .new_request(Endpoint::UploadApi, Method::POST, "/base/", Some(Box::new(params)))
        .unwrap()
        .with_cancellation(signal);
    let started = std::time::Instant::now();
    let err = client
        .execute_json::<serde_json::Value>(&mut request)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Config::new("pub", "sec").with_upload_api_base(format!("http://127.0.0.1:{port}"));
    let client = Client::new(config).unwrap();

    let err = client.upload_file(upload(b"hello")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_retryable());
}
