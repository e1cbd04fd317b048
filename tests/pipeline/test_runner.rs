//! Pipeline runner: ordering, partial results, cleanup, timeout, cancellation

use super::support::*;
use orato_node::pipeline::{
    AnalysisPipeline, JobRequest, JobState, JobTracker, PipelineConfig, Stage,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn pipeline_with(
    analyzer: ScriptedAnalyzer,
    work_root: &std::path::Path,
    stage_timeout: Duration,
) -> AnalysisPipeline {
    AnalysisPipeline::new(
        Arc::new(analyzer),
        PipelineConfig {
            work_root: work_root.to_path_buf(),
            stage_timeout,
        },
    )
}

fn request(video_link: &str) -> JobRequest {
    JobRequest::new("report-1", "mock interview", "vid-1", video_link, "owner-hash")
}

#[tokio::test]
async fn test_happy_path_produces_complete_aggregate() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let pipeline = pipeline_with(
        ScriptedAnalyzer::default(),
        work_root.path(),
        Duration::from_secs(10),
    );
    let tracker = JobTracker::new();

    let req = request(&video_url);
    let report = pipeline
        .run(&req, &tracker, CancellationToken::new())
        .await;

    assert!(report.succeeded(), "failures: {:?}", report.failures);
    assert_eq!(report.video_metrics, Some(sample_video_metrics()));
    assert_eq!(report.audio_metrics, Some(sample_audio_metrics()));
    assert!(report
        .ai_narrative
        .as_deref()
        .unwrap()
        .contains("mock interview"));

    assert_eq!(tracker.get(req.job_id).await, Some(JobState::Done));
    // Working directory removed on the terminal transition
    assert_eq!(dir_entry_count(work_root.path()), 0);
}

#[tokio::test]
async fn test_speech_failure_keeps_video_output_and_fails_job() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let pipeline = pipeline_with(
        ScriptedAnalyzer {
            fail_speech_to_text: true,
            ..Default::default()
        },
        work_root.path(),
        Duration::from_secs(10),
    );
    let tracker = JobTracker::new();

    let req = request(&video_url);
    let report = pipeline
        .run(&req, &tracker, CancellationToken::new())
        .await;

    // The sibling branch already in flight completed anyway
    assert!(!report.succeeded());
    assert_eq!(report.video_metrics, Some(sample_video_metrics()));
    assert!(report.audio_metrics.is_none());
    assert!(report.ai_narrative.is_none());
    assert!(report
        .failures
        .iter()
        .any(|f| f.stage == Stage::SpeechToText));

    assert_eq!(tracker.get(req.job_id).await, Some(JobState::Failed));
    // Cleanup also runs on the failure path
    assert_eq!(dir_entry_count(work_root.path()), 0);
}

#[tokio::test]
async fn test_unrecognized_speech_is_failure_with_partial_results() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let pipeline = pipeline_with(
        ScriptedAnalyzer {
            transcript: None,
            ..Default::default()
        },
        work_root.path(),
        Duration::from_secs(10),
    );
    let tracker = JobTracker::new();

    let req = request(&video_url);
    let report = pipeline
        .run(&req, &tracker, CancellationToken::new())
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.video_metrics, Some(sample_video_metrics()));
    let failure = report
        .failures
        .iter()
        .find(|f| f.stage == Stage::SpeechToText)
        .expect("speech_to_text failure recorded");
    assert!(failure.reason.contains("no recognizable speech"));
}

#[tokio::test]
async fn test_video_branch_failure_keeps_audio_outputs() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let pipeline = pipeline_with(
        ScriptedAnalyzer {
            fail_video: true,
            ..Default::default()
        },
        work_root.path(),
        Duration::from_secs(10),
    );
    let tracker = JobTracker::new();

    let req = request(&video_url);
    let report = pipeline
        .run(&req, &tracker, CancellationToken::new())
        .await;

    assert!(!report.succeeded());
    assert!(report.video_metrics.is_none());
    assert_eq!(report.audio_metrics, Some(sample_audio_metrics()));
    assert!(report.ai_narrative.is_some());
    assert!(report.failures.iter().any(|f| f.stage == Stage::AnalyzeVideo));
}

#[tokio::test]
async fn test_stage_timeout_converts_to_failed_with_cleanup() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let pipeline = pipeline_with(
        ScriptedAnalyzer {
            video_delay: Some(Duration::from_secs(30)),
            ..Default::default()
        },
        work_root.path(),
        Duration::from_millis(500),
    );
    let tracker = JobTracker::new();

    let req = request(&video_url);
    let report = pipeline
        .run(&req, &tracker, CancellationToken::new())
        .await;

    assert!(!report.succeeded());
    let failure = report
        .failures
        .iter()
        .find(|f| f.stage == Stage::AnalyzeVideo)
        .expect("video branch timed out");
    assert!(failure.reason.contains("timed out"));

    // The audio chain was unaffected by the sibling timeout
    assert_eq!(report.audio_metrics, Some(sample_audio_metrics()));
    assert!(report.ai_narrative.is_some());

    assert_eq!(tracker.get(req.job_id).await, Some(JobState::Failed));
    assert_eq!(dir_entry_count(work_root.path()), 0);
}

#[tokio::test]
async fn test_cancellation_fails_job_and_cleans_up() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let pipeline = pipeline_with(
        ScriptedAnalyzer::default(),
        work_root.path(),
        Duration::from_secs(10),
    );
    let tracker = JobTracker::new();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let req = request(&video_url);
    let report = pipeline.run(&req, &tracker, cancel).await;

    assert!(!report.succeeded());
    assert!(report
        .failures
        .iter()
        .any(|f| f.reason.contains("cancelled")));
    assert_eq!(tracker.get(req.job_id).await, Some(JobState::Failed));
    assert_eq!(dir_entry_count(work_root.path()), 0);
}

#[tokio::test]
async fn test_download_failure_short_circuits() {
    let work_root = tempfile::tempdir().unwrap();
    let pipeline = pipeline_with(
        ScriptedAnalyzer::default(),
        work_root.path(),
        Duration::from_secs(5),
    );
    let tracker = JobTracker::new();

    // Nothing listens on this port
    let req = request("http://127.0.0.1:9/video.mp4");
    let report = pipeline
        .run(&req, &tracker, CancellationToken::new())
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Download);
    assert!(report.video_metrics.is_none());
    assert_eq!(tracker.get(req.job_id).await, Some(JobState::Failed));
    assert_eq!(dir_entry_count(work_root.path()), 0);
}
