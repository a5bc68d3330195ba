//! # Integration Tests for lic-api
//!
//! Drives the full router against the in-memory store and ledger: license
//! CRUD, document upload, anchoring, verification, and the status mapping
//! of every anchoring error.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lic_api::{AppConfig, AppState};
use lic_ledger::{InMemoryLedger, LedgerBackend};
use lic_store::StoreBackend;

struct TestApp {
    router: axum::Router,
    ledger: InMemoryLedger,
    uploads: tempfile::TempDir,
}

fn test_app() -> TestApp {
    test_app_with(InMemoryLedger::new())
}

fn test_app_with(ledger: InMemoryLedger) -> TestApp {
    build_app(ledger, AppConfig::default().max_upload_bytes)
}

fn build_app(ledger: InMemoryLedger, max_upload_bytes: usize) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = AppConfig {
        upload_dir: uploads.path().to_path_buf(),
        max_upload_bytes,
        ..AppConfig::default()
    };
    let state = AppState::new(
        config,
        StoreBackend::memory(),
        LedgerBackend::Memory(ledger.clone()),
    );
    TestApp {
        router: lic_api::app(state),
        ledger,
        uploads,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn create(&self, number: &str, status: &str) -> String {
        let (code, body) = self.json(post_json("/v1/licenses", license_body(number, status))).await;
        assert_eq!(code, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn upload(&self, id: &str, bytes: &'static [u8]) -> (StatusCode, Value) {
        self.json(
            Request::builder()
                .method("PUT")
                .uri(format!("/v1/licenses/{id}/document?filename=scan.pdf"))
                .header("content-type", "application/octet-stream")
                .body(Body::from(bytes))
                .unwrap(),
        )
        .await
    }

    /// Upload `chunks` as a streamed body, one frame per chunk.
    async fn upload_chunks(&self, id: &str, chunks: Vec<Vec<u8>>) -> (StatusCode, Value) {
        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
        self.json(
            Request::builder()
                .method("PUT")
                .uri(format!("/v1/licenses/{id}/document?filename=scan.pdf"))
                .header("content-type", "application/octet-stream")
                .body(Body::from_stream(stream))
                .unwrap(),
        )
        .await
    }
}

fn license_body(number: &str, status: &str) -> Value {
    json!({
        "case_id": uuid::Uuid::new_v4(),
        "license_type": "food-safety",
        "license_number": number,
        "effective_from": "2026-01-01T00:00:00Z",
        "effective_until": "2029-01-01T00:00:00Z",
        "business_status": status,
    })
}

fn metadata_body(number: &str, status: &str) -> Value {
    json!({
        "license_type": "food-safety",
        "license_number": number,
        "effective_from": "2026-01-01T00:00:00Z",
        "effective_until": "2029-01-01T00:00:00Z",
        "business_status": status,
    })
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn liveness_probe() {
    let app = test_app();
    let (status, body) = app.send(get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn readiness_reports_degraded_ledger_without_failing() {
    let app = test_app();
    let (status, body) = app.send(get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ready\nrequests=0 errors=0");

    app.ledger.set_offline(true);
    let (status, body) = app.send(get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("ledger degraded"));
}

#[tokio::test]
async fn readiness_reports_request_totals() {
    let app = test_app();
    let id = app.create("FS-RD", "ACTIVE").await;
    let (status, _) = app.send(get(&format!("/v1/licenses/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(get("/v1/licenses/not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Health probes are not counted.
    app.send(get("/health/readiness")).await;
    let (_, body) = app.send(get("/health/readiness")).await;
    let text = String::from_utf8(body).unwrap();
    assert_eq!(text.lines().nth(1), Some("requests=3 errors=1"));
}

#[tokio::test]
async fn metrics_without_recorder_is_unavailable() {
    let app = test_app();
    let (status, _) = app.send(get("/metrics")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_with_recorder_renders_text() {
    let uploads = tempfile::tempdir().unwrap();
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();
    let state = AppState::new(
        AppConfig {
            upload_dir: uploads.path().to_path_buf(),
            ..AppConfig::default()
        },
        StoreBackend::memory(),
        LedgerBackend::Memory(InMemoryLedger::new()),
    )
    .with_prometheus(handle);
    let response = lic_api::app(state).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();
    let (status, body) = app.json(get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/licenses/{id}/anchor"].is_object());
}

// -- License CRUD -------------------------------------------------------------

#[tokio::test]
async fn create_computes_h1_and_starts_not_synced() {
    let app = test_app();
    let (status, body) = app
        .json(post_json("/v1/licenses", license_body("FS-1", "ACTIVE")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sync_status"], "NOT_SYNCED");
    assert_eq!(body["h1_hash"].as_str().unwrap().len(), 64);
    assert!(body["h2_hash"].is_null());

    let id = body["id"].as_str().unwrap();
    let (status, fetched) = app.json(get(&format!("/v1/licenses/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["h1_hash"], body["h1_hash"]);
}

#[tokio::test]
async fn create_rejects_malformed_json_and_bad_dates() {
    let app = test_app();
    let malformed = Request::builder()
        .method("POST")
        .uri("/v1/licenses")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.json(malformed).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let mut bad = license_body("FS-2", "ACTIVE");
    bad["effective_from"] = json!("next tuesday");
    let (status, body) = app.json(post_json("/v1/licenses", bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .json(post_json("/v1/licenses", license_body("FS-3", "SUSPENDED")))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn duplicate_license_number_is_conflict() {
    let app = test_app();
    app.create("FS-DUP", "ACTIVE").await;
    let (status, body) = app
        .json(post_json("/v1/licenses", license_body("FS-DUP", "ACTIVE")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let app = test_app();
    let (status, body) = app
        .json(get(&format!("/v1/licenses/{}", uuid::Uuid::new_v4())))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = app.json(get("/v1/licenses/42")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_recomputes_h1_only() {
    let app = test_app();
    let id = app.create("FS-U", "ACTIVE").await;
    let (_, uploaded) = app.upload(&id, b"scan bytes").await;

    let (status, updated) = app
        .json(put_json(&format!("/v1/licenses/{id}"), metadata_body("FS-U", "EXPIRING_SOON")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(updated["h1_hash"], uploaded["h1_hash"]);
    assert_eq!(updated["h2_hash"], uploaded["h2_hash"]);
    assert_eq!(updated["business_status"], "EXPIRING_SOON");
}

#[tokio::test]
async fn list_filters_by_sync_status() {
    let app = test_app();
    let synced = app.create("FS-L1", "ACTIVE").await;
    app.create("FS-L2", "ACTIVE").await;
    app.upload(&synced, b"doc").await;
    let (status, _) = app.json(post(&format!("/v1/licenses/{synced}/anchor"))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = app.json(get("/v1/licenses")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, only_synced) = app.json(get("/v1/licenses?sync_status=SYNCED")).await;
    let only_synced = only_synced.as_array().unwrap();
    assert_eq!(only_synced.len(), 1);
    assert_eq!(only_synced[0]["id"], synced.as_str());

    let (status, _) = app.json(get("/v1/licenses?sync_status=MAYBE")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Documents ----------------------------------------------------------------

#[tokio::test]
async fn upload_stores_file_and_records_h2() {
    let app = test_app();
    let id = app.create("FS-D", "ACTIVE").await;

    let (status, body) = app.upload(&id, b"%PDF-1.7 first").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["h2_hash"].as_str().unwrap().len(), 64);
    let first_path = body["file_path"].as_str().unwrap().to_string();
    assert!(first_path.starts_with(app.uploads.path().to_str().unwrap()));
    assert!(first_path.ends_with("-scan.pdf"));
    assert!(std::path::Path::new(&first_path).exists());

    let (status, bytes) = app.send(get(&format!("/v1/licenses/{id}/document"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"%PDF-1.7 first");

    // Replacing the document removes the old file.
    let (_, replaced) = app.upload(&id, b"%PDF-1.7 second").await;
    assert_ne!(replaced["h2_hash"], body["h2_hash"]);
    assert!(!std::path::Path::new(&first_path).exists());
}

#[tokio::test]
async fn chunked_upload_hashes_the_whole_stream() {
    let app = test_app();
    let id = app.create("FS-CH", "ACTIVE").await;
    let chunks: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 64 * 1024]).collect();
    let whole = chunks.concat();

    let (status, body) = app.upload_chunks(&id, chunks).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let expected = lic_core::file_digest(&whole[..]).unwrap();
    assert_eq!(body["h2_hash"], expected.to_string());

    let stored = std::fs::read(body["file_path"].as_str().unwrap()).unwrap();
    assert_eq!(stored, whole);
}

#[tokio::test]
async fn oversized_upload_is_413_and_leaves_nothing_behind() {
    let app = build_app(InMemoryLedger::new(), 1024);
    let id = app.create("FS-BIG", "ACTIVE").await;

    let (status, body) = app.upload_chunks(&id, vec![vec![7u8; 512]; 3]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");

    let dir = app.uploads.path().join("licenses").join(&id);
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    let (_, license) = app.json(get(&format!("/v1/licenses/{id}"))).await;
    assert!(license["h2_hash"].is_null());

    // Exactly at the limit is accepted.
    let (status, _) = app.upload_chunks(&id, vec![vec![7u8; 512]; 2]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_refused_for_revoked_license() {
    let app = test_app();
    let id = app.create("FS-R", "REVOKED").await;
    let (status, body) = app.upload(&id, b"scan").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LICENSE_INACTIVE");
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let app = test_app();
    let id = app.create("FS-E", "ACTIVE").await;
    let (status, _) = app.upload(&id, b"").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn download_without_document_is_not_found() {
    let app = test_app();
    let id = app.create("FS-N", "ACTIVE").await;
    let (status, _) = app.send(get(&format!("/v1/licenses/{id}/document"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_refused_while_active_then_removes_files() {
    let app = test_app();
    let id = app.create("FS-DEL", "ACTIVE").await;
    let (_, uploaded) = app.upload(&id, b"scan").await;
    let stored = uploaded["file_path"].as_str().unwrap().to_string();

    let (status, body) = app.json(delete(&format!("/v1/licenses/{id}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LICENSE_ACTIVE");

    app.json(put_json(&format!("/v1/licenses/{id}"), metadata_body("FS-DEL", "EXPIRED")))
        .await;
    let (status, _) = app.send(delete(&format!("/v1/licenses/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!std::path::Path::new(&stored).exists());
    assert!(!app.uploads.path().join("licenses").join(&id).exists());

    let (status, _) = app.send(get(&format!("/v1/licenses/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Anchoring ----------------------------------------------------------------

#[tokio::test]
async fn anchor_then_verify() {
    let app = test_app();
    let id = app.create("FS-A", "ACTIVE").await;
    app.upload(&id, b"scan").await;

    let (status, body) = app.json(post(&format!("/v1/licenses/{id}/anchor"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sync_status"], "SYNCED");

    let (status, report) = app
        .json(get(&format!("/v1/licenses/{id}/verification")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["h1_matches"], true);
    assert_eq!(report["h2_matches"], true);
    assert_eq!(report["h1_local"], report["h1_ledger"]);

    let (status, body) = app.json(post(&format!("/v1/licenses/{id}/anchor"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_SYNCED");
    assert_eq!(app.ledger.submit_calls(), 1);
}

#[tokio::test]
async fn anchor_without_document_is_missing_hashes() {
    let app = test_app();
    let id = app.create("FS-M", "ACTIVE").await;
    let (status, body) = app.json(post(&format!("/v1/licenses/{id}/anchor"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MISSING_HASHES");
}

#[tokio::test]
async fn anchor_with_offline_ledger_is_503_and_changes_nothing() {
    let app = test_app_with(InMemoryLedger::offline());
    let id = app.create("FS-O", "ACTIVE").await;
    app.upload(&id, b"scan").await;

    let (status, body) = app.json(post(&format!("/v1/licenses/{id}/anchor"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "LEDGER_OFFLINE");

    let (_, record) = app.json(get(&format!("/v1/licenses/{id}"))).await;
    assert_eq!(record["sync_status"], "NOT_SYNCED");
}

#[tokio::test]
async fn submit_failure_is_500_without_detail() {
    let app = test_app();
    let id = app.create("FS-F", "ACTIVE").await;
    app.upload(&id, b"scan").await;
    app.ledger.fail_next_submits(1);

    let (status, body) = app.json(post(&format!("/v1/licenses/{id}/anchor"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "SUBMIT_FAILURE");
    assert_eq!(body["error"]["message"], "An internal error occurred");

    let (_, pending) = app.json(get("/v1/licenses/pending")).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["sync_status"], "SYNC_FAILED");
}

#[tokio::test]
async fn verify_drift_after_metadata_edit() {
    let app = test_app();
    let id = app.create("FS-C", "ACTIVE").await;
    app.upload(&id, b"scan").await;
    app.json(post(&format!("/v1/licenses/{id}/anchor"))).await;
    app.json(put_json(&format!("/v1/licenses/{id}"), metadata_body("FS-C", "EXPIRING_SOON")))
        .await;

    let (status, report) = app
        .json(get(&format!("/v1/licenses/{id}/verification")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["h1_matches"], false);
    assert_eq!(report["h2_matches"], true);
    assert_eq!(report["sync_status"], "SYNCED");
}

#[tokio::test]
async fn verify_without_ledger_asset_is_404() {
    let app = test_app();
    let id = app.create("FS-V", "ACTIVE").await;
    let (status, body) = app
        .json(get(&format!("/v1/licenses/{id}/verification")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ASSET_NOT_FOUND");
}

#[tokio::test]
async fn ledger_status_reports_backend_and_degradation() {
    let app = test_app();
    let (_, body) = app.json(get("/v1/ledger/status")).await;
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["degraded"], false);

    app.ledger.set_offline(true);
    let (_, body) = app.json(get("/v1/ledger/status")).await;
    assert_eq!(body["degraded"], true);
    assert!(body["reason"].is_string());
}
