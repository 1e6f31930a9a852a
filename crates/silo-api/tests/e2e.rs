//! End-to-end HTTP tests driving the full middleware stack (SigV4 auth,
//! authorization, routing) in-process via `tower::ServiceExt::oneshot`,
//! without binding a real socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use silo_api::server::{AppState, S3Server};
use silo_core::config::SiloConfig;
use silo_core::types::User;
use silo_metadata::MetadataStore;
use silo_storage::LocalStorage;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tower::ServiceExt;

const ACCESS_KEY: &str = "admin";
const SECRET_KEY: &str = "password";
const REGION: &str = "us-east-1";

async fn test_state() -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(dir.path());
    storage.init().await.unwrap();
    let db_url = format!("sqlite://{}/metadata.sqlite?mode=rwc", dir.path().display());
    let metadata = MetadataStore::new(&db_url).await.unwrap();
    let root = User::root(ACCESS_KEY.to_string(), SECRET_KEY.to_string());
    metadata.create_user(&root).await.unwrap();

    let state = AppState {
        config: Arc::new(SiloConfig::default()),
        storage: Arc::new(storage),
        metadata: Arc::new(metadata),
        start_time: Instant::now(),
    };
    (state, dir)
}

/// Signs a request the same way `silo_auth::verify_signature_v4` verifies
/// one. Callers must stick to alphanumeric bucket/key names and simple
/// single-parameter queries so this doesn't need to replicate full URI
/// percent-encoding to match the server's canonicalization.
fn signed_request(method: &str, path: &str, query: &str, body: &[u8]) -> Request<Body> {
    let payload_hash = silo_crypto::sha256_hash(body);
    signed_request_with_declared_hash(method, path, query, body, &payload_hash)
}

/// Like [`signed_request`] but lets the caller declare an `x-amz-content-sha256`
/// that doesn't match `body`'s real digest, to exercise the storage engine's
/// checksum-mismatch rejection (the signature itself stays valid, since it's
/// computed over the declared hash exactly as a real client's would be).
fn signed_request_with_declared_hash(
    method: &str,
    path: &str,
    query: &str,
    body: &[u8],
    payload_hash: &str,
) -> Request<Body> {
    let now = Utc::now();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = &amz_date[..8];

    let canonical_headers = format!(
        "host:localhost\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
        payload_hash, amz_date
    );
    let signed_headers = "host;x-amz-content-sha256;x-amz-date";

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method, path, query, canonical_headers, signed_headers, payload_hash
    );
    let canonical_request_hash = silo_crypto::sha256_hash(canonical_request.as_bytes());

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, REGION);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date, credential_scope, canonical_request_hash
    );

    let k_date = silo_crypto::hmac_sha256(format!("AWS4{}", SECRET_KEY).as_bytes(), date_stamp.as_bytes());
    let k_region = silo_crypto::hmac_sha256(&k_date, REGION.as_bytes());
    let k_service = silo_crypto::hmac_sha256(&k_region, b"s3");
    let k_signing = silo_crypto::hmac_sha256(&k_service, b"aws4_request");
    let signature = silo_crypto::hmac_sha256_hex(&k_signing, string_to_sign.as_bytes());

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        ACCESS_KEY, credential_scope, signed_headers, signature
    );

    let uri = if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    };

    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost")
        .header("x-amz-date", amz_date)
        .header("x-amz-content-sha256", payload_hash.to_string())
        .header("authorization", authorization)
        .body(Body::from(body.to_vec()))
        .unwrap()
}

#[tokio::test]
async fn put_get_head_delete_round_trip() {
    let (state, _dir) = test_state().await;
    let app = S3Server::create_router(state);

    let create_bucket = signed_request("PUT", "/roundtrip", "", b"");
    let resp = app.clone().oneshot(create_bucket).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = b"Hello, object store!";
    let put_object = signed_request("PUT", "/roundtrip/obj", "", body);
    let resp = app.clone().oneshot(put_object).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("etag"));

    let head = signed_request("HEAD", "/roundtrip/obj", "", b"");
    let resp = app.clone().oneshot(head).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-length").unwrap().to_str().unwrap(),
        body.len().to_string()
    );

    let get = signed_request("GET", "/roundtrip/obj", "", b"");
    let resp = app.clone().oneshot(get).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], body);

    let delete_object = signed_request("DELETE", "/roundtrip/obj", "", b"");
    let resp = app.clone().oneshot(delete_object).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let get_missing = signed_request("GET", "/roundtrip/obj", "", b"");
    let resp = app.clone().oneshot(get_missing).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let delete_bucket = signed_request("DELETE", "/roundtrip", "", b"");
    let resp = app.oneshot(delete_bucket).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn ranged_get_returns_206_and_out_of_range_returns_416() {
    let (state, _dir) = test_state().await;
    let app = S3Server::create_router(state);

    let create_bucket = signed_request("PUT", "/ranged", "", b"");
    assert_eq!(
        app.clone().oneshot(create_bucket).await.unwrap().status(),
        StatusCode::OK
    );

    let body = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let put_object = signed_request("PUT", "/ranged/obj", "", body);
    assert_eq!(
        app.clone().oneshot(put_object).await.unwrap().status(),
        StatusCode::OK
    );

    let mut in_range = signed_request("GET", "/ranged/obj", "", b"");
    in_range
        .headers_mut()
        .insert("range", "bytes=5-15".parse().unwrap());
    let resp = app.clone().oneshot(in_range).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"56789ABCDEF");

    let mut out_of_range = signed_request("GET", "/ranged/obj", "", b"");
    out_of_range
        .headers_mut()
        .insert("range", "bytes=100-200".parse().unwrap());
    let resp = app.oneshot(out_of_range).await.unwrap();
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn content_sha256_mismatch_is_rejected_before_storage() {
    let (state, _dir) = test_state().await;
    let app = S3Server::create_router(state);

    let create_bucket = signed_request("PUT", "/checksummed", "", b"");
    assert_eq!(
        app.clone().oneshot(create_bucket).await.unwrap().status(),
        StatusCode::OK
    );

    let wrong_hash = "0".repeat(64);
    let put_object =
        signed_request_with_declared_hash("PUT", "/checksummed/obj", "", b"payload", &wrong_hash);
    let resp = app.clone().oneshot(put_object).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let get_missing = signed_request("GET", "/checksummed/obj", "", b"");
    let resp = app.oneshot(get_missing).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_request_to_private_bucket_is_denied() {
    let (state, _dir) = test_state().await;
    let app = S3Server::create_router(state);

    let create_bucket = signed_request("PUT", "/private", "", b"");
    assert_eq!(
        app.clone().oneshot(create_bucket).await.unwrap().status(),
        StatusCode::OK
    );

    let anonymous_get = Request::builder()
        .method("GET")
        .uri("/private/obj")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(anonymous_get).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
