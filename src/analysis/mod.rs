// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyzer Port and Classification Policy
//!
//! The pipeline never runs feature extraction itself; it calls whatever
//! implements [`AnalyzerPort`]. Results cross the boundary as typed structs
//! so incomplete stage output is a compile-time impossibility rather than a
//! runtime surprise.

pub mod policy;
pub mod sidecar;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use policy::AnalysisPolicy;
pub use sidecar::SidecarAnalyzer;
pub use types::{
    AggregatedResult, AudioMetrics, Clarity, Emphasis, Fluency, PaceBand, PitchVariation,
    PostureBand, RawAudioFeatures, RawVideoFeatures, Tone, VideoMetrics, VolumeEnergy,
};

/// Abstract interface over the analysis capabilities
///
/// Implementations are external collaborators (sidecar process, remote
/// service). Contracts:
///
/// - `extract_audio`: writes a WAV next to the video, returns its path
/// - `speech_to_text`: `Ok(None)` means unrecognized speech, not an error
/// - `analyze_audio`: needs the transcript; may drop chart artifacts into
///   `work_dir` (the job owns and removes that directory)
/// - `analyze_video`: independent of the audio branch
/// - `generate_report`: qualitative narrative from the AI collaborator
#[async_trait]
pub trait AnalyzerPort: Send + Sync {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<PathBuf>;

    async fn speech_to_text(&self, audio_path: &Path) -> Result<Option<String>>;

    async fn analyze_audio(
        &self,
        audio_path: &Path,
        transcript: &str,
        work_dir: &Path,
    ) -> Result<AudioMetrics>;

    async fn analyze_video(&self, video_path: &Path) -> Result<VideoMetrics>;

    async fn generate_report(&self, context: &str, transcript: &str) -> Result<String>;
}
