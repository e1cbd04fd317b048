// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analysis;
pub mod api;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod keys;
pub mod kms;
pub mod pipeline;
pub mod reports;

// Re-export the main types
pub use analysis::{
    AggregatedResult, AnalysisPolicy, AnalyzerPort, AudioMetrics, SidecarAnalyzer, VideoMetrics,
};
pub use config::Settings;
pub use crypto::{CryptoError, NodeKeys};
pub use directory::{DirectoryError, IdentityRecord, RegisteredIdentity, UserDirectory};
pub use keys::{
    InMemoryKeyStore, KeyExchange, KeyExchangeError, KeyExchangeResponse, KeyStore,
    PublicKeyRecord,
};
pub use kms::{InMemoryKms, KeyManagement, KmsClient, KmsConfig, KmsError};
pub use pipeline::{
    AnalysisPipeline, DispatchError, Dispatcher, DispatcherConfig, JobCompletion, JobId,
    JobReport, JobRequest, JobState, JobTracker, PipelineConfig, Stage, StageFailure,
};
pub use reports::{
    DeliveryConfig, JsonReportRenderer, ReportDelivery, ReportRecord, ReportRenderer,
    ReportService, ReportStore,
};
