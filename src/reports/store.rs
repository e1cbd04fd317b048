// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Report records
//!
//! One record per completed pipeline run. Records are insert-once and
//! immutable; the artifact on disk belongs to the record.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub report_id: String,
    /// Hashed identity of the owning user
    pub owner_hash: String,
    pub activity: String,
    pub artifact_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportStoreError {
    #[error("report {0} already exists")]
    Duplicate(String),
}

/// In-memory report index keyed by report id
#[derive(Default)]
pub struct ReportStore {
    records: RwLock<HashMap<String, ReportRecord>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a new report; a second insert under the same id is an error
    pub async fn insert(&self, record: ReportRecord) -> Result<(), ReportStoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.report_id) {
            return Err(ReportStoreError::Duplicate(record.report_id));
        }
        records.insert(record.report_id.clone(), record);
        Ok(())
    }

    pub async fn get(&self, report_id: &str) -> Option<ReportRecord> {
        self.records.read().await.get(report_id).cloned()
    }

    /// Only the owner may fetch a report
    pub async fn get_for_owner(&self, report_id: &str, owner_hash: &str) -> Option<ReportRecord> {
        self.records
            .read()
            .await
            .get(report_id)
            .filter(|record| record.owner_hash == owner_hash)
            .cloned()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}
