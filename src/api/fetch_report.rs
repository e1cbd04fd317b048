// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `POST /api/fetchreport`, the report retrieval endpoint
//!
//! Returns the binary artifact for a report the authenticated identity owns;
//! JSON `{"error": ...}` otherwise.

use super::errors::ApiError;
use super::http_server::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct FetchReportBody {
    #[serde(rename = "reportID")]
    pub report_id: Option<String>,
    #[serde(rename = "verificationHash")]
    pub verification_hash: Option<String>,
}

pub async fn handle(State(state): State<AppState>, body: Bytes) -> Response {
    match process(&state, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn process(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let parsed: FetchReportBody = serde_json::from_slice(body)
        .map_err(|_| ApiError::InvalidRequest("no json data provided".to_string()))?;

    let verification_hash = parsed
        .verification_hash
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("no verificationHash provided".to_string()))?;
    let report_id = parsed
        .report_id
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("incomplete data".to_string()))?;

    let token = state
        .node_keys
        .decrypt_token(&verification_hash)
        .map_err(|_| ApiError::AuthenticationFailed("Unable to verify user".to_string()))?;
    let identity = state
        .directory
        .authenticate(&token)
        .await
        .ok_or_else(|| ApiError::AuthenticationFailed("Unable to verify user".to_string()))?;

    let record = state
        .reports
        .get_for_owner(&report_id, &identity.username_hash)
        .await
        .ok_or_else(|| {
            error!(report_id = %report_id, "report lookup missed");
            ApiError::NotFound("Invalid reportID".to_string())
        })?;

    let bytes = tokio::fs::read(&record.artifact_path).await.map_err(|e| {
        error!(
            report_id = %record.report_id,
            "report artifact unreadable at {}: {}",
            record.artifact_path.display(),
            e
        );
        ApiError::Internal
    })?;

    let file_name = record
        .artifact_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| record.report_id.clone());

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}
