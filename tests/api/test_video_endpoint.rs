//! `POST /api/videoanalysis` scenarios, end to end through the pipeline

use super::support::*;
use axum::http::StatusCode;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

#[tokio::test]
async fn test_submission_runs_pipeline_and_publishes_report() {
    let env = test_env().await;
    let video_url = serve_video().await;

    let registered = env
        .directory
        .register_identity("alice", &HashMap::new())
        .await
        .unwrap();
    let hash = client_verification_hash(&env.node_keys, &registered.verification_token);

    let (status, body) = post_json(
        &env.router,
        "/api/videoanalysis",
        json!({
            "verificationHash": hash,
            "reportID": "rep-100",
            "activityName": "product pitch",
            "videoID": "vid-100",
            "videoLink": video_url,
        }),
    )
    .await;

    // Acknowledged as received, not as completed
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], "received");

    // The report shows up out-of-band once the pipeline finishes
    let record = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(record) = env.reports.get("rep-100").await {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("report published within deadline");

    assert_eq!(record.activity, "product pitch");
    assert_eq!(record.owner_hash, registered.username_hash);

    let artifact: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&record.artifact_path).unwrap()).unwrap();
    assert_eq!(artifact["report_id"], "rep-100");
    assert_eq!(artifact["narrative"], "Narrative for product pitch.");
}

#[tokio::test]
async fn test_missing_verification_hash() {
    let env = test_env().await;

    let (status, body) = post_json(
        &env.router,
        "/api/videoanalysis",
        json!({
            "reportID": "r", "activityName": "a", "videoID": "v", "videoLink": "http://x/v.mp4",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no verificationHash provided");
}

#[tokio::test]
async fn test_undecryptable_hash_is_unauthenticated() {
    let env = test_env().await;

    let (status, body) = post_json(
        &env.router,
        "/api/videoanalysis",
        json!({
            "verificationHash": "definitely not ciphertext",
            "reportID": "r", "activityName": "a", "videoID": "v", "videoLink": "http://x/v.mp4",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "incorrect hash");
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let env = test_env().await;

    // Well-formed encryption of a token no identity owns
    let hash = client_verification_hash(&env.node_keys, "unregistered-token");
    let (status, body) = post_json(
        &env.router,
        "/api/videoanalysis",
        json!({
            "verificationHash": hash,
            "reportID": "r", "activityName": "a", "videoID": "v", "videoLink": "http://x/v.mp4",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "incorrect hash");
}

#[tokio::test]
async fn test_incomplete_fields() {
    let env = test_env().await;

    let registered = env
        .directory
        .register_identity("bob", &HashMap::new())
        .await
        .unwrap();
    let hash = client_verification_hash(&env.node_keys, &registered.verification_token);

    let (status, body) = post_json(
        &env.router,
        "/api/videoanalysis",
        json!({
            "verificationHash": hash,
            "reportID": "rep-1",
            "activityName": "",
            "videoID": "vid-1",
            "videoLink": "http://x/v.mp4",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "incomplete data");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let env = test_env().await;

    let (status, bytes) = post(&env.router, "/api/videoanalysis", "][".to_string()).await;
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no json data provided");
}
