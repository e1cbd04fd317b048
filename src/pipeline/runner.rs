// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pipeline runner
//!
//! Executes the stage graph for one job:
//!
//! ```text
//! download -> extract_audio -> speech_to_text -> { analyze_audio, generate_report }
//! download -> analyze_video                      (independent branch)
//! ```
//!
//! Video analysis and transcription run concurrently once audio extraction
//! completes; audio analysis and report generation both wait on the
//! transcript and then run concurrently with each other. Aggregation is a
//! single join over the three terminal branches.
//!
//! Every stage runs under the same cancellation token and per-stage timeout;
//! a stage error, timeout, or panic lands in that branch's result slot and
//! the sibling branches keep running. The per-job working directory is
//! removed exactly once, on the terminal transition, whatever happened
//! before.

use super::download::VideoDownloader;
use super::job::{JobId, JobReport, JobRequest, JobState, JobTracker, Stage, StageFailure};
use crate::analysis::AnalyzerPort;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runner settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent directory for per-job working directories
    pub work_root: std::path::PathBuf,
    /// Budget applied to each stage individually
    pub stage_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("analysis-jobs"),
            stage_timeout: Duration::from_secs(300),
        }
    }
}

/// Orchestrates the multi-stage analysis of one submitted video
pub struct AnalysisPipeline {
    analyzer: Arc<dyn AnalyzerPort>,
    downloader: VideoDownloader,
    config: PipelineConfig,
}

impl AnalysisPipeline {
    pub fn new(analyzer: Arc<dyn AnalyzerPort>, config: PipelineConfig) -> Self {
        Self {
            analyzer,
            downloader: VideoDownloader::new(),
            config,
        }
    }

    /// Run the full stage graph for `request`
    ///
    /// Never returns an error: every failure mode is captured in the
    /// returned [`JobReport`] and reflected in the tracker as `Failed`.
    pub async fn run(
        &self,
        request: &JobRequest,
        tracker: &JobTracker,
        cancel: CancellationToken,
    ) -> JobReport {
        let job_id = request.job_id;
        let started = Instant::now();
        info!(job_id = %job_id, video_id = %request.video_id, "starting analysis job");

        // The job exclusively owns its working directory for its whole life
        let work_dir = match self.create_work_dir(job_id).await {
            Ok(dir) => dir,
            Err(failure) => {
                let mut report = JobReport::new(job_id);
                report.failures.push(failure);
                tracker.set(job_id, JobState::Failed).await;
                return report;
            }
        };

        let report = self
            .execute(request, tracker, &cancel, work_dir.path())
            .await;

        tracker
            .set(
                job_id,
                if report.succeeded() {
                    JobState::Done
                } else {
                    JobState::Failed
                },
            )
            .await;

        // Cleanup on the terminal transition, success and failure alike.
        // A cleanup error is logged and never masks the stage outcome.
        if let Err(e) = work_dir.close() {
            error!(job_id = %job_id, "working directory cleanup failed: {}", e);
        }

        info!(
            job_id = %job_id,
            succeeded = report.succeeded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis job finished"
        );
        report
    }

    async fn create_work_dir(&self, job_id: JobId) -> Result<tempfile::TempDir, StageFailure> {
        if let Err(e) = tokio::fs::create_dir_all(&self.config.work_root).await {
            return Err(stage_failure(
                Stage::Download,
                job_id,
                format!("could not create work root: {}", e),
            ));
        }
        tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(&self.config.work_root)
            .map_err(|e| {
                stage_failure(
                    Stage::Download,
                    job_id,
                    format!("could not create working directory: {}", e),
                )
            })
    }

    async fn execute(
        &self,
        request: &JobRequest,
        tracker: &JobTracker,
        cancel: &CancellationToken,
        work_dir: &Path,
    ) -> JobReport {
        let job_id = request.job_id;
        let timeout = self.config.stage_timeout;
        let mut report = JobReport::new(job_id);

        // Stage: download
        tracker.set(job_id, JobState::Downloading).await;
        let video_path = work_dir.join(format!("{}.mp4", request.video_id));
        if let Err(failure) = guard_stage(
            Stage::Download,
            job_id,
            timeout,
            cancel,
            self.downloader.download(&request.video_link, &video_path),
        )
        .await
        {
            report.failures.push(failure);
            return report;
        }

        // Stage: extract audio (strictly precedes everything audio-derived)
        tracker.set(job_id, JobState::Extracting).await;
        let audio_target = work_dir.join(format!("{}.wav", request.video_id));
        let audio_path = match guard_stage(
            Stage::ExtractAudio,
            job_id,
            timeout,
            cancel,
            self.analyzer.extract_audio(&video_path, &audio_target),
        )
        .await
        {
            Ok(path) => path,
            Err(failure) => {
                report.failures.push(failure);
                return report;
            }
        };

        tracker.set(job_id, JobState::Analyzing).await;

        // Branch: video analysis, independent of the audio chain
        let video_handle: JoinHandle<Result<_, StageFailure>> = {
            let analyzer = Arc::clone(&self.analyzer);
            let video_path = video_path.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                guard_stage(Stage::AnalyzeVideo, job_id, timeout, &cancel, async move {
                    analyzer.analyze_video(&video_path).await
                })
                .await
            })
        };

        // Audio chain: the transcript gates both text-dependent branches
        let transcript = guard_stage(
            Stage::SpeechToText,
            job_id,
            timeout,
            cancel,
            self.analyzer.speech_to_text(&audio_path),
        )
        .await;

        let (audio_handle, narrative_handle) = match &transcript {
            Ok(Some(text)) => {
                let audio_handle = {
                    let analyzer = Arc::clone(&self.analyzer);
                    let audio_path = audio_path.clone();
                    let work_dir = work_dir.to_path_buf();
                    let text = text.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        guard_stage(Stage::AnalyzeAudio, job_id, timeout, &cancel, async move {
                            analyzer.analyze_audio(&audio_path, &text, &work_dir).await
                        })
                        .await
                    })
                };
                let narrative_handle = {
                    let analyzer = Arc::clone(&self.analyzer);
                    let context = request.activity_name.clone();
                    let text = text.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        guard_stage(Stage::GenerateReport, job_id, timeout, &cancel, async move {
                            analyzer.generate_report(&context, &text).await
                        })
                        .await
                    })
                };
                (Some(audio_handle), Some(narrative_handle))
            }
            Ok(None) => {
                // Unrecognized speech is data, but the two text-dependent
                // branches cannot run without a transcript
                report.failures.push(stage_failure(
                    Stage::SpeechToText,
                    job_id,
                    "no recognizable speech in audio track".to_string(),
                ));
                (None, None)
            }
            Err(_) => (None, None),
        };
        if let Err(failure) = transcript {
            report.failures.push(failure);
        }

        // Aggregation barrier: one join over the three terminal branches.
        // The video branch is awaited even when the audio chain failed.
        let (video_result, audio_result, narrative_result) = tokio::join!(
            join_branch(Stage::AnalyzeVideo, job_id, video_handle),
            join_optional_branch(Stage::AnalyzeAudio, job_id, audio_handle),
            join_optional_branch(Stage::GenerateReport, job_id, narrative_handle),
        );

        tracker.set(job_id, JobState::Aggregating).await;

        match video_result {
            Ok(metrics) => report.video_metrics = Some(metrics),
            Err(failure) => report.failures.push(failure),
        }
        if let Some(result) = audio_result {
            match result {
                Ok(metrics) => report.audio_metrics = Some(metrics),
                Err(failure) => report.failures.push(failure),
            }
        }
        if let Some(result) = narrative_result {
            match result {
                Ok(narrative) => report.ai_narrative = Some(narrative),
                Err(failure) => report.failures.push(failure),
            }
        }

        report
    }
}

/// Run one stage under the shared cancellation token and per-stage timeout
///
/// Errors, timeouts, and cancellation all collapse into a [`StageFailure`]
/// logged with the stage identity and job id.
async fn guard_stage<T>(
    stage: Stage,
    job_id: JobId,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, StageFailure> {
    let started = Instant::now();
    let outcome = tokio::select! {
        _ = cancel.cancelled() => Err(stage_failure(stage, job_id, "cancelled".to_string())),
        result = tokio::time::timeout(timeout, fut) => match result {
            Err(_) => Err(stage_failure(
                stage,
                job_id,
                format!("timed out after {:?}", timeout),
            )),
            Ok(Err(e)) => Err(stage_failure(stage, job_id, format!("{:#}", e))),
            Ok(Ok(value)) => Ok(value),
        },
    };
    if outcome.is_ok() {
        debug!(
            job_id = %job_id,
            stage = %stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage completed"
        );
    }
    outcome
}

fn stage_failure(stage: Stage, job_id: JobId, reason: String) -> StageFailure {
    error!(job_id = %job_id, stage = %stage, "stage failed: {}", reason);
    StageFailure { stage, reason }
}

/// Await a branch, converting a panic into that branch's failure slot
async fn join_branch<T>(
    stage: Stage,
    job_id: JobId,
    handle: JoinHandle<Result<T, StageFailure>>,
) -> Result<T, StageFailure> {
    match handle.await {
        Ok(result) => result,
        Err(join_error) => Err(stage_failure(
            stage,
            job_id,
            format!("branch task aborted: {}", join_error),
        )),
    }
}

/// Await a branch that may never have been spawned (gated on the transcript)
async fn join_optional_branch<T>(
    stage: Stage,
    job_id: JobId,
    handle: Option<JoinHandle<Result<T, StageFailure>>>,
) -> Option<Result<T, StageFailure>> {
    match handle {
        Some(handle) => Some(join_branch(stage, job_id, handle).await),
        None => None,
    }
}
