// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use orato_node::{
    api::{start_server, AppState},
    analysis::{AnalysisPolicy, SidecarAnalyzer},
    config::Settings,
    crypto::NodeKeys,
    directory::UserDirectory,
    keys::{InMemoryKeyStore, KeyExchange},
    kms::KmsClient,
    pipeline::{AnalysisPipeline, Dispatcher, DispatcherConfig, PipelineConfig},
    reports::{DeliveryConfig, JsonReportRenderer, ReportDelivery, ReportService, ReportStore},
};
use std::{env, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Orato Analysis Node...\n");
    println!("📦 VERSION: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let settings = Settings::from_env();

    // Long-lived node keypair, generated on first start
    let node_keys = Arc::new(NodeKeys::load_or_generate(&settings.key_dir)?);
    println!("✅ Node keypair ready");

    // Key exchange over an injected store
    let key_store = Arc::new(InMemoryKeyStore::new());
    let key_exchange = Arc::new(KeyExchange::new(
        key_store,
        Arc::clone(&node_keys),
        chrono::Duration::hours(settings.key_ttl_hours),
    ));

    // User directory backed by the external key-management service
    let kms = Arc::new(KmsClient::new(settings.kms.clone()));
    let directory = Arc::new(UserDirectory::new(kms));

    // Analyzer sidecar and the pipeline it feeds
    let analyzer = Arc::new(SidecarAnalyzer::new(
        settings.analyzer_endpoint.clone(),
        AnalysisPolicy::default(),
    ));
    let pipeline = Arc::new(AnalysisPipeline::new(
        analyzer,
        PipelineConfig {
            work_root: settings.work_root.clone(),
            stage_timeout: settings.stage_timeout,
        },
    ));
    println!("✅ Analysis pipeline initialized");

    // Report persistence and out-of-band delivery
    let report_store = Arc::new(ReportStore::new());
    let delivery_config: DeliveryConfig = settings.delivery.clone();
    let report_service = Arc::new(ReportService::new(
        Arc::clone(&report_store),
        Box::new(JsonReportRenderer),
        ReportDelivery::new(delivery_config),
        settings.artifacts_dir.clone(),
    ));

    // Bounded worker pool behind the submission queue
    let dispatcher = Arc::new(Dispatcher::start(
        pipeline,
        report_service,
        DispatcherConfig {
            max_concurrent_jobs: settings.max_concurrent_jobs,
            queue_capacity: settings.queue_capacity,
        },
    ));
    println!(
        "✅ Dispatcher running ({} concurrent jobs max)",
        settings.max_concurrent_jobs
    );

    let state = AppState {
        key_exchange,
        directory,
        node_keys,
        dispatcher: Arc::clone(&dispatcher),
        reports: report_store,
    };

    let api_addr = settings.api_addr;
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(state, api_addr).await {
            tracing::error!("API server error: {}", e);
        }
    });

    // Run until interrupted, then stop accepting work and cancel jobs
    signal::ctrl_c().await?;
    println!("\n🛑 Shutting down...");
    dispatcher.shutdown();
    server.abort();

    Ok(())
}
