//! Shared fixtures for pipeline tests

use async_trait::async_trait;
use axum::{routing::get, Router};
use orato_node::analysis::{types::*, AnalyzerPort};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn sample_video_metrics() -> VideoMetrics {
    VideoMetrics {
        facial_expression_pct: 92,
        gesture_rating: 7.4,
        posture: PostureBand::Good,
        overall: "Your overall performance is excellent. Keep up the good work!".to_string(),
    }
}

pub fn sample_audio_metrics() -> AudioMetrics {
    AudioMetrics {
        speech_rate_wpm: 126.0,
        fluency: Fluency::Fluent,
        longest_pause_secs: 0.9,
        pitch_variation: PitchVariation::High,
        word_emphasis: Emphasis::Effective,
        tone: Tone::Positive,
        pace: PaceBand::Moderate,
        clarity: Clarity::High,
        volume_energy: VolumeEnergy::Moderate,
    }
}

/// Analyzer double whose behavior is scripted per test
pub struct ScriptedAnalyzer {
    /// What speech_to_text returns; `None` models unrecognized speech
    pub transcript: Option<String>,
    pub fail_speech_to_text: bool,
    pub fail_video: bool,
    pub video_delay: Option<Duration>,
    /// When set, extract_audio blocks until a permit is released
    pub extract_gate: Option<Arc<Semaphore>>,
}

impl Default for ScriptedAnalyzer {
    fn default() -> Self {
        Self {
            transcript: Some("this interview answer makes an important point".to_string()),
            fail_speech_to_text: false,
            fail_video: false,
            video_delay: None,
            extract_gate: None,
        }
    }
}

#[async_trait]
impl AnalyzerPort for ScriptedAnalyzer {
    async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> anyhow::Result<PathBuf> {
        if let Some(gate) = &self.extract_gate {
            gate.acquire().await?.forget();
        }
        tokio::fs::write(audio_path, b"RIFFfake-wav").await?;
        Ok(audio_path.to_path_buf())
    }

    async fn speech_to_text(&self, _audio_path: &Path) -> anyhow::Result<Option<String>> {
        if self.fail_speech_to_text {
            anyhow::bail!("speech service exploded");
        }
        Ok(self.transcript.clone())
    }

    async fn analyze_audio(
        &self,
        _audio_path: &Path,
        _transcript: &str,
        work_dir: &Path,
    ) -> anyhow::Result<AudioMetrics> {
        // Leaves a chart artifact behind, as the real extractor does; the
        // job must clean it up with the working directory
        tokio::fs::write(work_dir.join("pitch_variation.png"), b"png").await?;
        Ok(sample_audio_metrics())
    }

    async fn analyze_video(&self, _video_path: &Path) -> anyhow::Result<VideoMetrics> {
        if let Some(delay) = self.video_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_video {
            anyhow::bail!("gesture model crashed");
        }
        Ok(sample_video_metrics())
    }

    async fn generate_report(&self, context: &str, _transcript: &str) -> anyhow::Result<String> {
        Ok(format!("Feedback on {}: solid delivery overall.", context))
    }
}

/// Serve a fake video over local HTTP; returns the URL
pub async fn serve_video() -> String {
    let app = Router::new().route(
        "/video.mp4",
        get(|| async { axum::body::Bytes::from_static(b"not really mp4 but enough") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/video.mp4", addr)
}

/// Count the entries left under a directory
pub fn dir_entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
