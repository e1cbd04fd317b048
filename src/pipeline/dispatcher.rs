// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Task queue and dispatcher
//!
//! Decouples the synchronous submission path from pipeline execution:
//! `submit` returns as soon as the job is queued, a bounded worker pool
//! drains the queue, and completion is reported out-of-band through the
//! injected [`JobCompletion`] hook.

use super::job::{JobId, JobReport, JobRequest, JobState, JobTracker};
use super::runner::AnalysisPipeline;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Out-of-band completion channel
///
/// Invoked once per job after its terminal transition, on the worker task.
#[async_trait]
pub trait JobCompletion: Send + Sync {
    async fn on_complete(&self, request: &JobRequest, report: &JobReport);
}

/// No-op completion hook for setups that only poll job state
pub struct NullCompletion;

#[async_trait]
impl JobCompletion for NullCompletion {
    async fn on_complete(&self, _request: &JobRequest, _report: &JobReport) {}
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on pipelines running at once
    pub max_concurrent_jobs: usize,
    /// Queued submissions beyond this are rejected, not buffered
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("analysis queue is full")]
    QueueFull,

    #[error("dispatcher is shut down")]
    ShutDown,
}

/// Accepts submissions and runs them on a bounded worker pool
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<JobRequest>,
    tracker: JobTracker,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Spawn the worker loop and return a handle for submissions
    pub fn start(
        pipeline: Arc<AnalysisPipeline>,
        completion: Arc<dyn JobCompletion>,
        config: DispatcherConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<JobRequest>(config.queue_capacity);
        let tracker = JobTracker::new();
        let cancel = CancellationToken::new();

        let worker_tracker = tracker.clone();
        let worker_cancel = cancel.clone();
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_cancel.cancelled() => {
                        info!("dispatcher shutting down");
                        break;
                    }
                    request = rx.recv() => {
                        let Some(request) = request else { break };
                        let Ok(permit) = semaphore.clone().acquire_owned().await else {
                            break;
                        };

                        let pipeline = Arc::clone(&pipeline);
                        let completion = Arc::clone(&completion);
                        let tracker = worker_tracker.clone();
                        let job_cancel = worker_cancel.child_token();
                        tokio::spawn(async move {
                            let report = pipeline.run(&request, &tracker, job_cancel).await;
                            completion.on_complete(&request, &report).await;
                            drop(permit);
                        });
                    }
                }
            }
        });

        Self {
            tx,
            tracker,
            cancel,
        }
    }

    /// Enqueue a job; returns once it is queued, not once it completes
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, DispatchError> {
        let job_id = request.job_id;
        self.tracker.set(job_id, JobState::Queued).await;

        if let Err(err) = self.tx.try_send(request) {
            self.tracker.remove(job_id).await;
            return Err(match err {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(job_id = %job_id, "analysis queue is full, rejecting submission");
                    DispatchError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => DispatchError::ShutDown,
            });
        }

        info!(job_id = %job_id, "📋 job queued for analysis");
        Ok(job_id)
    }

    pub async fn job_state(&self, job_id: JobId) -> Option<JobState> {
        self.tracker.get(job_id).await
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Cancel in-flight jobs and stop accepting work
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
