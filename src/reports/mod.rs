// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Report Persistence and Delivery
//!
//! When a pipeline run succeeds, its aggregated result is rendered to an
//! artifact, filed as an immutable [`ReportRecord`], and pushed to the
//! configured callback endpoint. Failed runs are logged and leave no record.

pub mod delivery;
pub mod render;
pub mod store;

use crate::pipeline::{JobCompletion, JobReport, JobRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use delivery::{DeliveryConfig, ReportDelivery};
pub use render::{JsonReportRenderer, ReportMeta, ReportRenderer};
pub use store::{ReportRecord, ReportStore, ReportStoreError};

/// Completion-side service: render, persist, deliver
pub struct ReportService {
    store: Arc<ReportStore>,
    renderer: Box<dyn ReportRenderer>,
    delivery: ReportDelivery,
    artifacts_dir: PathBuf,
}

impl ReportService {
    pub fn new(
        store: Arc<ReportStore>,
        renderer: Box<dyn ReportRenderer>,
        delivery: ReportDelivery,
        artifacts_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            renderer,
            delivery,
            artifacts_dir,
        }
    }

    /// Render and file the report for a successful job
    pub async fn publish(
        &self,
        request: &JobRequest,
        report: JobReport,
    ) -> Result<ReportRecord> {
        let aggregated = report
            .into_aggregated()
            .context("cannot publish an incomplete job report")?;

        let meta = ReportMeta {
            report_id: request.report_id.clone(),
            activity: request.activity_name.clone(),
            generated_at: Utc::now(),
        };
        let bytes = self.renderer.render(&aggregated, &meta)?;

        tokio::fs::create_dir_all(&self.artifacts_dir)
            .await
            .context("failed to create artifacts directory")?;
        let artifact_path = self.artifacts_dir.join(format!(
            "{}.{}",
            request.report_id,
            self.renderer.file_extension()
        ));
        tokio::fs::write(&artifact_path, &bytes)
            .await
            .with_context(|| format!("failed to write artifact {}", artifact_path.display()))?;

        let record = ReportRecord {
            report_id: request.report_id.clone(),
            owner_hash: request.owner_hash.clone(),
            activity: request.activity_name.clone(),
            artifact_path: artifact_path.clone(),
            created_at: meta.generated_at,
        };
        self.store.insert(record.clone()).await?;
        info!(report_id = %record.report_id, "report published");

        // Best-effort push; a delivery failure does not unpublish the report
        if let Err(e) = self
            .delivery
            .deliver(&artifact_path, &request.report_id, &request.activity_name)
            .await
        {
            warn!(report_id = %request.report_id, "report delivery failed: {}", e);
        }

        Ok(record)
    }
}

#[async_trait]
impl JobCompletion for ReportService {
    async fn on_complete(&self, request: &JobRequest, report: &JobReport) {
        if report.succeeded() {
            if let Err(e) = self.publish(request, report.clone()).await {
                error!(job_id = %request.job_id, "failed to publish report: {:#}", e);
            }
        } else {
            let stages: Vec<String> = report
                .failures
                .iter()
                .map(|f| f.stage.to_string())
                .collect();
            error!(
                job_id = %request.job_id,
                failed_stages = ?stages,
                "job failed, no report published"
            );
        }
    }
}
