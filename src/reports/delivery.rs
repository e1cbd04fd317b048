//! Out-of-band report delivery
//!
//! Completed artifacts are pushed to a configured callback endpoint; the
//! submitter never blocks on analysis. Delivery failures are retried with
//! bounded attempts and then surface as errors for the caller to log.

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Callback endpoint; `None` disables delivery (poll-only deployments)
    pub endpoint: Option<String>,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Pushes rendered artifacts to the callback endpoint
#[derive(Clone)]
pub struct ReportDelivery {
    client: Client,
    config: DeliveryConfig,
}

impl ReportDelivery {
    pub fn new(config: DeliveryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Deliver one artifact, identified to the receiver by report id and
    /// activity headers
    pub async fn deliver(&self, artifact: &Path, report_id: &str, activity: &str) -> Result<()> {
        let Some(endpoint) = &self.config.endpoint else {
            debug!(report_id, "no delivery endpoint configured, skipping push");
            return Ok(());
        };

        let bytes = tokio::fs::read(artifact)
            .await
            .with_context(|| format!("failed to read artifact {}", artifact.display()))?;
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let form = Form::new().part(
                "file",
                Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str("application/octet-stream")?,
            );

            let result = self
                .client
                .post(endpoint)
                .header("reportID", report_id)
                .header("activityName", activity)
                .multipart(form)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(report_id, "report delivered to {}", endpoint);
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    if attempt >= self.config.retry_attempts {
                        return Err(anyhow!(
                            "report delivery failed with status {} after {} attempts",
                            status,
                            attempt
                        ));
                    }
                    warn!(report_id, %status, attempt, "report delivery rejected, retrying");
                }
                Err(e) => {
                    if attempt >= self.config.retry_attempts {
                        return Err(anyhow!(
                            "report delivery failed after {} attempts: {}",
                            attempt,
                            e
                        ));
                    }
                    warn!(report_id, attempt, "report delivery errored, retrying: {}", e);
                }
            }
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }
}
