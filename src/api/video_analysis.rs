// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `POST /api/videoanalysis`, the submission endpoint
//!
//! The verification hash is the client's capability token, RSA-encrypted to
//! the node. A valid submission is queued and acknowledged immediately; the
//! report arrives out-of-band once the pipeline finishes.

use super::errors::ApiError;
use super::http_server::AppState;
use crate::pipeline::{DispatchError, JobRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct VideoAnalysisBody {
    #[serde(rename = "verificationHash")]
    pub verification_hash: Option<String>,
    #[serde(rename = "reportID")]
    pub report_id: Option<String>,
    #[serde(rename = "activityName")]
    pub activity_name: Option<String>,
    #[serde(rename = "videoID")]
    pub video_id: Option<String>,
    #[serde(rename = "videoLink")]
    pub video_link: Option<String>,
}

pub async fn handle(State(state): State<AppState>, body: Bytes) -> Response {
    match process(&state, &body).await {
        Ok(response) => axum::Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn process(state: &AppState, body: &[u8]) -> Result<serde_json::Value, ApiError> {
    let parsed: VideoAnalysisBody = serde_json::from_slice(body)
        .map_err(|_| ApiError::InvalidRequest("no json data provided".to_string()))?;

    let verification_hash = parsed
        .verification_hash
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            error!("no verification hash provided");
            ApiError::InvalidRequest("no verificationHash provided".to_string())
        })?;

    // Decrypt-then-lookup; both failure modes read as "unauthenticated"
    let token = state
        .node_keys
        .decrypt_token(&verification_hash)
        .map_err(|_| ApiError::AuthenticationFailed("incorrect hash".to_string()))?;
    let identity = state
        .directory
        .authenticate(&token)
        .await
        .ok_or_else(|| ApiError::AuthenticationFailed("incorrect hash".to_string()))?;

    let (Some(report_id), Some(activity_name), Some(video_id), Some(video_link)) = (
        parsed.report_id.filter(|v| !v.is_empty()),
        parsed.activity_name.filter(|v| !v.is_empty()),
        parsed.video_id.filter(|v| !v.is_empty()),
        parsed.video_link.filter(|v| !v.is_empty()),
    ) else {
        error!("incomplete video analysis submission");
        return Err(ApiError::InvalidRequest("incomplete data".to_string()));
    };

    let request = JobRequest::new(
        report_id,
        activity_name,
        video_id,
        video_link,
        identity.username_hash,
    );
    state
        .dispatcher
        .submit(request)
        .await
        .map_err(|e| match e {
            DispatchError::QueueFull => ApiError::QueueFull,
            DispatchError::ShutDown => {
                error!("submission rejected: dispatcher is shut down");
                ApiError::Internal
            }
        })?;

    Ok(json!({ "success": "received" }))
}
