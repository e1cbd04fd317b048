// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform error body: `{"error": <short message>}`
///
/// Stage-level diagnostics and stack traces never appear here; full detail
/// goes to the server log only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Malformed or missing input, user-correctable
    InvalidRequest(String),
    /// Token did not decrypt or matched no identity; absence, not exception
    AuthenticationFailed(String),
    NotFound(String),
    QueueFull,
    /// Unexpected failure; the client sees a generic message
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::AuthenticationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest(msg)
            | ApiError::AuthenticationFailed(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::QueueFull => "analysis queue is full".to_string(),
            ApiError::Internal => "Could not process request".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
        };
        (self.status_code(), axum::Json(body)).into_response()
    }
}
