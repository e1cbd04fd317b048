//! Shared fixtures for HTTP API tests: a fully wired node with in-memory
//! stores and a scripted analyzer sidecar double.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{routing::get, Router};
use orato_node::analysis::{types::*, AnalyzerPort};
use orato_node::api::AppState;
use orato_node::crypto::NodeKeys;
use orato_node::directory::UserDirectory;
use orato_node::keys::{InMemoryKeyStore, KeyExchange};
use orato_node::kms::InMemoryKms;
use orato_node::pipeline::{AnalysisPipeline, Dispatcher, DispatcherConfig, PipelineConfig};
use orato_node::reports::{
    DeliveryConfig, JsonReportRenderer, ReportDelivery, ReportService, ReportStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub struct ScriptedAnalyzer;

#[async_trait]
impl AnalyzerPort for ScriptedAnalyzer {
    async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> anyhow::Result<PathBuf> {
        tokio::fs::write(audio_path, b"RIFFfake-wav").await?;
        Ok(audio_path.to_path_buf())
    }

    async fn speech_to_text(&self, _audio_path: &Path) -> anyhow::Result<Option<String>> {
        Ok(Some("a significant answer about teamwork".to_string()))
    }

    async fn analyze_audio(
        &self,
        _audio_path: &Path,
        _transcript: &str,
        _work_dir: &Path,
    ) -> anyhow::Result<AudioMetrics> {
        Ok(AudioMetrics {
            speech_rate_wpm: 118.0,
            fluency: Fluency::Fluent,
            longest_pause_secs: 1.0,
            pitch_variation: PitchVariation::Low,
            word_emphasis: Emphasis::Effective,
            tone: Tone::Positive,
            pace: PaceBand::Moderate,
            clarity: Clarity::Moderate,
            volume_energy: VolumeEnergy::Moderate,
        })
    }

    async fn analyze_video(&self, _video_path: &Path) -> anyhow::Result<VideoMetrics> {
        Ok(VideoMetrics {
            facial_expression_pct: 85,
            gesture_rating: 6.0,
            posture: PostureBand::Average,
            overall: "You are doing well overall.".to_string(),
        })
    }

    async fn generate_report(&self, context: &str, _transcript: &str) -> anyhow::Result<String> {
        Ok(format!("Narrative for {}.", context))
    }
}

/// A wired-up node under test
pub struct TestEnv {
    pub router: Router,
    pub node_keys: Arc<NodeKeys>,
    pub directory: Arc<UserDirectory>,
    pub key_exchange: Arc<KeyExchange>,
    pub reports: Arc<ReportStore>,
    pub dispatcher: Arc<Dispatcher>,
    _work_root: tempfile::TempDir,
    _artifacts: tempfile::TempDir,
}

pub async fn test_env() -> TestEnv {
    let work_root = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    // 2048-bit (the production NODE_KEY_BITS default): a 1024-bit modulus is
    // too small to OAEP-wrap the 128-byte SHA-512 verification token.
    let node_keys = Arc::new(NodeKeys::generate(2048).unwrap());
    let key_store = Arc::new(InMemoryKeyStore::new());
    let key_exchange = Arc::new(KeyExchange::new(
        key_store,
        Arc::clone(&node_keys),
        chrono::Duration::hours(24),
    ));

    let directory = Arc::new(UserDirectory::new(Arc::new(InMemoryKms::new())));

    let pipeline = Arc::new(AnalysisPipeline::new(
        Arc::new(ScriptedAnalyzer),
        PipelineConfig {
            work_root: work_root.path().to_path_buf(),
            stage_timeout: Duration::from_secs(10),
        },
    ));

    let reports = Arc::new(ReportStore::new());
    let report_service = Arc::new(ReportService::new(
        Arc::clone(&reports),
        Box::new(JsonReportRenderer),
        ReportDelivery::new(DeliveryConfig::default()),
        artifacts.path().to_path_buf(),
    ));

    let dispatcher = Arc::new(Dispatcher::start(
        pipeline,
        report_service,
        DispatcherConfig::default(),
    ));

    let state = AppState {
        key_exchange: Arc::clone(&key_exchange),
        directory: Arc::clone(&directory),
        node_keys: Arc::clone(&node_keys),
        dispatcher: Arc::clone(&dispatcher),
        reports: Arc::clone(&reports),
    };

    TestEnv {
        router: orato_node::api::build_router(state),
        node_keys,
        directory,
        key_exchange,
        reports,
        dispatcher,
        _work_root: work_root,
        _artifacts: artifacts,
    }
}

/// POST a JSON value and return status plus raw body bytes
pub async fn post(router: &Router, path: &str, body: String) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub async fn post_json(
    router: &Router,
    path: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = post(router, path, body.to_string()).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

/// Encrypt a verification token to the node the way a client would
pub fn client_verification_hash(node_keys: &NodeKeys, token: &str) -> String {
    let public_key = orato_node::crypto::load_public_key(node_keys.public_key_pem()).unwrap();
    orato_node::crypto::encrypt_message(token, &public_key).unwrap()
}

/// Serve a fake video over local HTTP; returns the URL
pub async fn serve_video() -> String {
    let app = Router::new().route(
        "/clip.mp4",
        get(|| async { axum::body::Bytes::from_static(b"fake mp4 payload") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/clip.mp4", addr)
}
