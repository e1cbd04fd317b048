use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{fetch_report, key_exchange, video_analysis};
use crate::crypto::NodeKeys;
use crate::directory::UserDirectory;
use crate::keys::KeyExchange;
use crate::pipeline::Dispatcher;
use crate::reports::ReportStore;

/// Shared handler state; every component is an injected, explicitly
/// constructed client
#[derive(Clone)]
pub struct AppState {
    pub key_exchange: Arc<KeyExchange>,
    pub directory: Arc<UserDirectory>,
    pub node_keys: Arc<NodeKeys>,
    pub dispatcher: Arc<Dispatcher>,
    pub reports: Arc<ReportStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Key-exchange handshake
        .route("/api/key", post(key_exchange::handle))
        // Video-analysis submission
        .route("/api/videoanalysis", post(video_analysis::handle))
        // Report retrieval
        .route("/api/fetchreport", post(fetch_report::handle))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let queued = state.dispatcher.tracker().count().await;
    axum::Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tracked_jobs": queued,
    }))
}
