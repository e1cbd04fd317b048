//! Dispatcher: enqueue-then-return, bounded pool, out-of-band completion

use super::support::*;
use async_trait::async_trait;
use orato_node::pipeline::{
    AnalysisPipeline, DispatchError, Dispatcher, DispatcherConfig, JobCompletion, JobReport,
    JobRequest, JobState, PipelineConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Completion hook that forwards every finished job to a channel
struct RecordingCompletion {
    tx: mpsc::UnboundedSender<(String, bool)>,
}

#[async_trait]
impl JobCompletion for RecordingCompletion {
    async fn on_complete(&self, request: &JobRequest, report: &JobReport) {
        let _ = self.tx.send((request.report_id.clone(), report.succeeded()));
    }
}

fn pipeline(analyzer: ScriptedAnalyzer, work_root: &std::path::Path) -> Arc<AnalysisPipeline> {
    Arc::new(AnalysisPipeline::new(
        Arc::new(analyzer),
        PipelineConfig {
            work_root: work_root.to_path_buf(),
            stage_timeout: Duration::from_secs(10),
        },
    ))
}

#[tokio::test]
async fn test_submit_returns_queued_and_completes_out_of_band() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher::start(
        pipeline(ScriptedAnalyzer::default(), work_root.path()),
        Arc::new(RecordingCompletion { tx }),
        DispatcherConfig::default(),
    );

    let request = JobRequest::new("report-9", "debate", "vid-9", &video_url, "owner");
    let job_id = dispatcher.submit(request).await.unwrap();

    // Submission acknowledged immediately; the job is tracked from Queued on
    assert!(dispatcher.job_state(job_id).await.is_some());

    // Completion arrives through the out-of-band channel
    let (report_id, succeeded) = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("completion within deadline")
        .expect("completion delivered");
    assert_eq!(report_id, "report-9");
    assert!(succeeded);

    // Terminal state observable afterwards
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if dispatcher.job_state(job_id).await == Some(JobState::Done) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job reached Done");
}

#[tokio::test]
async fn test_failed_jobs_reported_as_failed() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher::start(
        pipeline(
            ScriptedAnalyzer {
                fail_speech_to_text: true,
                ..Default::default()
            },
            work_root.path(),
        ),
        Arc::new(RecordingCompletion { tx }),
        DispatcherConfig::default(),
    );

    let request = JobRequest::new("report-10", "debate", "vid-10", &video_url, "owner");
    dispatcher.submit(request).await.unwrap();

    let (_, succeeded) = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(!succeeded);
}

#[tokio::test]
async fn test_full_queue_rejects_submissions() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let (tx, _rx) = mpsc::unbounded_channel();

    // First job blocks inside extract_audio until the gate opens
    let gate = Arc::new(Semaphore::new(0));
    let dispatcher = Dispatcher::start(
        pipeline(
            ScriptedAnalyzer {
                extract_gate: Some(gate.clone()),
                ..Default::default()
            },
            work_root.path(),
        ),
        Arc::new(RecordingCompletion { tx }),
        DispatcherConfig {
            max_concurrent_jobs: 1,
            queue_capacity: 1,
        },
    );

    // Saturate the single worker and the single queue slot
    let mut outcomes = Vec::new();
    for i in 0..6 {
        let request = JobRequest::new(
            format!("report-{}", i),
            "debate",
            format!("vid-{}", i),
            &video_url,
            "owner",
        );
        outcomes.push(dispatcher.submit(request).await);
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    assert!(
        outcomes
            .iter()
            .any(|o| matches!(o, Err(DispatchError::QueueFull))),
        "at least one submission must be rejected once the queue is full"
    );

    // Release the blocked jobs so the test tears down cleanly
    gate.add_permits(16);
}

#[tokio::test]
async fn test_shutdown_stops_accepting_work() {
    let work_root = tempfile::tempdir().unwrap();
    let video_url = serve_video().await;
    let (tx, _rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher::start(
        pipeline(ScriptedAnalyzer::default(), work_root.path()),
        Arc::new(RecordingCompletion { tx }),
        DispatcherConfig::default(),
    );

    dispatcher.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let request = JobRequest::new("late", "debate", "vid-late", &video_url, "owner");
    let result = dispatcher.submit(request).await;
    assert!(matches!(result, Err(DispatchError::ShutDown)));
}
