// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `POST /api/key`, the key-exchange endpoint
//!
//! Body: `{"timestamp": ISO-8601, "key": base64 PEM, "userID": string}`.
//! Success returns the node's public key so the client can complete the
//! mutual handshake.

use super::errors::ApiError;
use super::http_server::AppState;
use crate::keys::{KeyExchangeError, KeyExchangeResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct KeyExchangeBody {
    pub timestamp: Option<String>,
    pub key: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

pub async fn handle(State(state): State<AppState>, body: Bytes) -> Response {
    match process(&state, &body).await {
        Ok(response) => axum::Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn process(state: &AppState, body: &[u8]) -> Result<KeyExchangeResponse, ApiError> {
    let parsed: KeyExchangeBody = serde_json::from_slice(body)
        .map_err(|_| ApiError::InvalidRequest("Invalid JSON data".to_string()))?;

    let (Some(timestamp), Some(key), Some(user_id)) =
        (parsed.timestamp, parsed.key, parsed.user_id)
    else {
        return Err(ApiError::InvalidRequest(
            "Missing required fields".to_string(),
        ));
    };

    state
        .key_exchange
        .submit_public_key(&user_id, &key, &timestamp)
        .await
        .map_err(ApiError::from)
}

impl From<KeyExchangeError> for ApiError {
    fn from(err: KeyExchangeError) -> Self {
        match err {
            KeyExchangeError::MissingFields
            | KeyExchangeError::InvalidTimestamp
            | KeyExchangeError::InvalidKeyEncoding => ApiError::InvalidRequest(err.to_string()),
            KeyExchangeError::Store(e) => {
                tracing::error!("key store failure during exchange: {}", e);
                ApiError::Internal
            }
        }
    }
}
