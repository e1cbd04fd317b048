// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment-driven settings
//!
//! All knobs come from environment variables with workable defaults, loaded
//! once at startup and handed to the components that need them. There is no
//! global config state.

use crate::keys::DEFAULT_KEY_TTL_HOURS;
use crate::kms::KmsConfig;
use crate::reports::DeliveryConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_addr: SocketAddr,
    pub key_dir: PathBuf,
    /// One policy for client key expiry across the whole node
    pub key_ttl_hours: i64,
    pub work_root: PathBuf,
    pub artifacts_dir: PathBuf,
    pub stage_timeout: Duration,
    pub max_concurrent_jobs: usize,
    pub queue_capacity: usize,
    pub analyzer_endpoint: String,
    pub kms: KmsConfig,
    pub delivery: DeliveryConfig,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    pub fn from_env() -> Self {
        let api_port: u16 = env_parse("API_PORT", 8080);
        let api_addr = SocketAddr::from(([0, 0, 0, 0], api_port));

        Self {
            api_addr,
            key_dir: PathBuf::from(env_or("KEY_DIR", "./keys")),
            key_ttl_hours: env_parse("KEY_TTL_HOURS", DEFAULT_KEY_TTL_HOURS),
            work_root: PathBuf::from(env_or("WORK_ROOT", "./data/jobs")),
            artifacts_dir: PathBuf::from(env_or("ARTIFACTS_DIR", "./data/reports")),
            stage_timeout: Duration::from_secs(env_parse("STAGE_TIMEOUT_SECS", 300)),
            max_concurrent_jobs: env_parse("MAX_CONCURRENT_JOBS", 4),
            queue_capacity: env_parse("QUEUE_CAPACITY", 64),
            analyzer_endpoint: env_or("ANALYZER_ENDPOINT", "http://localhost:9100"),
            kms: KmsConfig {
                base_url: env_or("KMS_API_URL", "http://localhost:9200"),
                api_key: env_or("KMS_API_KEY", ""),
                retry_attempts: env_parse("KMS_RETRY_ATTEMPTS", 3),
                retry_delay: Duration::from_millis(env_parse("KMS_RETRY_DELAY_MS", 500)),
            },
            delivery: DeliveryConfig {
                endpoint: std::env::var("REPORT_CALLBACK_URL").ok(),
                retry_attempts: env_parse("DELIVERY_RETRY_ATTEMPTS", 3),
                retry_delay: Duration::from_millis(env_parse("DELIVERY_RETRY_DELAY_MS", 500)),
            },
        }
    }
}
