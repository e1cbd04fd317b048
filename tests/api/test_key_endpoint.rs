//! `POST /api/key` scenarios

use super::support::*;
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;

fn key_b64(pem: &str) -> String {
    BASE64.encode(pem)
}

#[tokio::test]
async fn test_valid_submission_returns_node_pubkey() {
    let env = test_env().await;

    let (status, body) = post_json(
        &env.router,
        "/api/key",
        json!({
            "timestamp": "2025-01-01T00:00:00Z",
            "key": key_b64("-----BEGIN PUBLIC KEY-----\nhello-key\n-----END PUBLIC KEY-----\n"),
            "userID": "alice",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key saved successfully");

    // The returned pubkey decodes to the node's PEM
    let pem_bytes = BASE64.decode(body["pubkey"].as_str().unwrap()).unwrap();
    let pem = String::from_utf8(pem_bytes).unwrap();
    assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    assert_eq!(pem, env.node_keys.public_key_pem());
}

#[tokio::test]
async fn test_resubmission_overwrites_stored_key() {
    let env = test_env().await;
    let first = "-----BEGIN PUBLIC KEY-----\nfirst\n-----END PUBLIC KEY-----\n";
    let second = "-----BEGIN PUBLIC KEY-----\nsecond\n-----END PUBLIC KEY-----\n";

    for pem in [first, second] {
        let (status, _) = post_json(
            &env.router,
            "/api/key",
            json!({
                "timestamp": "2025-01-01T00:00:00Z",
                "key": key_b64(pem),
                "userID": "alice",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // Old value is unrecoverable
    let record = env.key_exchange.lookup("alice").await.unwrap().unwrap();
    assert_eq!(record.public_key_pem, second);
}

#[tokio::test]
async fn test_invalid_base64_key() {
    let env = test_env().await;

    let (status, body) = post_json(
        &env.router,
        "/api/key",
        json!({
            "timestamp": "2025-01-01T00:00:00Z",
            "key": "not-valid-base64!!",
            "userID": "bob",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid public key encoding");
}

#[tokio::test]
async fn test_missing_fields() {
    let env = test_env().await;

    let (status, body) = post_json(
        &env.router,
        "/api/key",
        json!({ "timestamp": "2025-01-01T00:00:00Z" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn test_invalid_timestamp() {
    let env = test_env().await;

    let (status, body) = post_json(
        &env.router,
        "/api/key",
        json!({
            "timestamp": "last tuesday",
            "key": key_b64("pem"),
            "userID": "carol",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid format");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let env = test_env().await;

    let (status, bytes) = post(&env.router, "/api/key", "{not json".to_string()).await;
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON data");
}
