// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job model and state tracking
//!
//! A job moves `Queued -> Downloading -> Extracting -> Analyzing ->
//! Aggregating -> Done | Failed`. `Analyzing` covers the fan-out window in
//! which transcription and video analysis, then audio analysis and report
//! generation, run concurrently. `Failed` is reachable from every state and
//! terminal; so is `Done`.

use crate::analysis::types::{AggregatedResult, AudioMetrics, VideoMetrics};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type JobId = Uuid;

/// Lifecycle state of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Downloading,
    Extracting,
    Analyzing,
    Aggregating,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

/// Identity of a pipeline stage, used in logs and failure records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Download,
    ExtractAudio,
    SpeechToText,
    AnalyzeAudio,
    AnalyzeVideo,
    GenerateReport,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Download => "download",
            Stage::ExtractAudio => "extract_audio",
            Stage::SpeechToText => "speech_to_text",
            Stage::AnalyzeAudio => "analyze_audio",
            Stage::AnalyzeVideo => "analyze_video",
            Stage::GenerateReport => "generate_report",
        };
        write!(f, "{}", name)
    }
}

/// One stage's error, captured into the owning branch's result slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

/// An accepted video-analysis submission
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: JobId,
    pub report_id: String,
    pub activity_name: String,
    pub video_id: String,
    pub video_link: String,
    /// Hashed identity of the requesting user
    pub owner_hash: String,
}

impl JobRequest {
    pub fn new(
        report_id: impl Into<String>,
        activity_name: impl Into<String>,
        video_id: impl Into<String>,
        video_link: impl Into<String>,
        owner_hash: impl Into<String>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            report_id: report_id.into(),
            activity_name: activity_name.into(),
            video_id: video_id.into(),
            video_link: video_link.into(),
            owner_hash: owner_hash.into(),
        }
    }
}

/// Outcome of one pipeline run
///
/// Each branch writes its own slot exactly once; slots left `None` either
/// belong to a failed branch (see `failures`) or were skipped because their
/// input never materialized. Partial results survive sibling failures.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: JobId,
    pub video_metrics: Option<VideoMetrics>,
    pub audio_metrics: Option<AudioMetrics>,
    pub ai_narrative: Option<String>,
    pub failures: Vec<StageFailure>,
}

impl JobReport {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            video_metrics: None,
            audio_metrics: None,
            ai_narrative: None,
            failures: Vec::new(),
        }
    }

    /// A job succeeds only if all three branches produced output
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
            && self.video_metrics.is_some()
            && self.audio_metrics.is_some()
            && self.ai_narrative.is_some()
    }

    pub fn into_aggregated(self) -> Option<AggregatedResult> {
        Some(AggregatedResult {
            video_metrics: self.video_metrics?,
            audio_metrics: self.audio_metrics?,
            ai_narrative: self.ai_narrative?,
        })
    }
}

/// Shared job-state map
///
/// Writers are the dispatcher (Queued) and the owning pipeline task; once a
/// job reaches a terminal state further transitions are ignored.
#[derive(Clone, Default)]
pub struct JobTracker {
    states: Arc<RwLock<HashMap<JobId, JobState>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, job_id: JobId, state: JobState) {
        let mut states = self.states.write().await;
        if let Some(current) = states.get(&job_id) {
            if current.is_terminal() {
                return;
            }
        }
        tracing::debug!(job_id = %job_id, state = ?state, "job state transition");
        states.insert(job_id, state);
    }

    pub async fn get(&self, job_id: JobId) -> Option<JobState> {
        self.states.read().await.get(&job_id).copied()
    }

    pub async fn remove(&self, job_id: JobId) {
        self.states.write().await.remove(&job_id);
    }

    pub async fn count(&self) -> usize {
        self.states.read().await.len()
    }
}
