// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API
//!
//! Three POST endpoints plus a health check. All error bodies are uniform
//! `{"error": <short message>}`; unexpected failures surface as a generic
//! 500 with full detail logged server-side only.

pub mod errors;
pub mod fetch_report;
pub mod http_server;
pub mod key_exchange;
pub mod video_analysis;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{build_router, start_server, AppState};
