// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyzer sidecar client
//!
//! The concrete feature-extraction and report-generation collaborators run
//! out of process; this client speaks their HTTP contract and classifies the
//! returned raw features through the [`AnalysisPolicy`]. Five endpoints, one
//! per capability:
//!
//! - `POST /v1/extract-audio`   `{video_path, audio_path}` -> `{audio_path}`
//! - `POST /v1/transcribe`      `{audio_path}` -> `{text | null}`
//! - `POST /v1/audio-features`  `{audio_path, transcript, work_dir}` -> raw features
//! - `POST /v1/video-features`  `{video_path}` -> raw features
//! - `POST /v1/report`          `{context, transcript}` -> `{narrative}`
//!
//! `transcribe` returning `null` means no recognizable speech; that is data,
//! not an error.

use super::policy::AnalysisPolicy;
use super::types::{AudioMetrics, RawAudioFeatures, RawVideoFeatures, VideoMetrics};
use super::AnalyzerPort;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Client for the analyzer sidecar
pub struct SidecarAnalyzer {
    client: Client,
    endpoint: String,
    policy: AnalysisPolicy,
}

#[derive(Serialize)]
struct ExtractAudioRequest<'a> {
    video_path: &'a str,
    audio_path: &'a str,
}

#[derive(Deserialize)]
struct ExtractAudioResponse {
    audio_path: String,
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    audio_path: &'a str,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    text: Option<String>,
}

#[derive(Serialize)]
struct AudioFeaturesRequest<'a> {
    audio_path: &'a str,
    transcript: &'a str,
    work_dir: &'a str,
}

#[derive(Serialize)]
struct VideoFeaturesRequest<'a> {
    video_path: &'a str,
}

#[derive(Serialize)]
struct ReportRequest<'a> {
    context: &'a str,
    transcript: &'a str,
}

#[derive(Deserialize)]
struct ReportResponse {
    narrative: String,
}

impl SidecarAnalyzer {
    pub fn new(endpoint: String, policy: AnalysisPolicy) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            policy,
        }
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("analyzer sidecar unreachable at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("analyzer sidecar returned {} for {}", status, path));
        }
        response
            .json::<Resp>()
            .await
            .with_context(|| format!("malformed analyzer response from {}", path))
    }

    fn path_str(path: &Path) -> Result<&str> {
        path.to_str()
            .ok_or_else(|| anyhow!("path is not valid UTF-8: {}", path.display()))
    }
}

#[async_trait]
impl AnalyzerPort for SidecarAnalyzer {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<PathBuf> {
        let response: ExtractAudioResponse = self
            .post_json(
                "/v1/extract-audio",
                &ExtractAudioRequest {
                    video_path: Self::path_str(video_path)?,
                    audio_path: Self::path_str(audio_path)?,
                },
            )
            .await?;
        Ok(PathBuf::from(response.audio_path))
    }

    async fn speech_to_text(&self, audio_path: &Path) -> Result<Option<String>> {
        let response: TranscribeResponse = self
            .post_json(
                "/v1/transcribe",
                &TranscribeRequest {
                    audio_path: Self::path_str(audio_path)?,
                },
            )
            .await?;
        Ok(response.text)
    }

    async fn analyze_audio(
        &self,
        audio_path: &Path,
        transcript: &str,
        work_dir: &Path,
    ) -> Result<AudioMetrics> {
        let features: RawAudioFeatures = self
            .post_json(
                "/v1/audio-features",
                &AudioFeaturesRequest {
                    audio_path: Self::path_str(audio_path)?,
                    transcript,
                    work_dir: Self::path_str(work_dir)?,
                },
            )
            .await?;
        Ok(self.policy.audio_metrics(&features, transcript))
    }

    async fn analyze_video(&self, video_path: &Path) -> Result<VideoMetrics> {
        let features: RawVideoFeatures = self
            .post_json(
                "/v1/video-features",
                &VideoFeaturesRequest {
                    video_path: Self::path_str(video_path)?,
                },
            )
            .await?;
        Ok(self.policy.video_metrics(&features))
    }

    async fn generate_report(&self, context: &str, transcript: &str) -> Result<String> {
        let response: ReportResponse = self
            .post_json(
                "/v1/report",
                &ReportRequest {
                    context,
                    transcript,
                },
            )
            .await?;
        if response.narrative.is_empty() {
            return Err(anyhow!("report generator returned an empty narrative"));
        }
        Ok(response.narrative)
    }
}
