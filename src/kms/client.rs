//! HTTP client for the key-management service
//!
//! Upstream failures are retried with bounded attempts here at the edge; the
//! analysis pipeline itself never retries.

use super::KeyManagement;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum KmsError {
    #[error("key-management request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("key-management service returned status {status}")]
    Status { status: u16 },

    #[error("key-management {kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("malformed key-management response: {0}")]
    MalformedResponse(String),
}

/// Connection settings for the key-management service
#[derive(Debug, Clone)]
pub struct KmsConfig {
    pub base_url: String,
    pub api_key: String,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            api_key: String::new(),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Serialize)]
struct StoreKeyRequest<'a> {
    key: String,
    #[serde(rename = "type")]
    key_type: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct StoreNonceRequest<'a> {
    nonce: String,
    user_id: &'a str,
    purpose: &'a str,
}

#[derive(Deserialize)]
struct StoreKeyResponse {
    key_id: String,
}

#[derive(Deserialize)]
struct StoreNonceResponse {
    nonce_id: String,
}

#[derive(Deserialize)]
struct GetKeyResponse {
    key: String,
}

#[derive(Deserialize)]
struct GetNonceResponse {
    nonce: String,
}

/// Client for the remote key-management service
///
/// Explicitly constructed and injected into the components that need it; no
/// process-wide connection state.
#[derive(Clone)]
pub struct KmsClient {
    http: Client,
    config: KmsConfig,
}

impl KmsClient {
    pub fn new(config: KmsConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Run `send` up to `retry_attempts` times, backing off between tries
    async fn with_retries<T, F, Fut>(&self, operation: &str, send: F) -> Result<T, KmsError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, KmsError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match send().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.config.retry_attempts && is_transient(&err) => {
                    warn!(
                        "key-management {} attempt {}/{} failed: {}",
                        operation, attempt, self.config.retry_attempts, err
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, KmsError> {
        BASE64
            .decode(value)
            .map_err(|e| KmsError::MalformedResponse(format!("{} is not base64: {}", field, e)))
    }
}

fn is_transient(err: &KmsError) -> bool {
    match err {
        KmsError::Http(_) => true,
        KmsError::Status { status } => *status >= 500,
        _ => false,
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, KmsError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(KmsError::Status {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl KeyManagement for KmsClient {
    async fn store_key(&self, key: &[u8], owner_id: &str) -> Result<String, KmsError> {
        self.with_retries("store_key", || async move {
            let response = self
                .http
                .post(format!("{}/keys", self.config.base_url))
                .header("api-key", &self.config.api_key)
                .json(&StoreKeyRequest {
                    key: BASE64.encode(key),
                    key_type: "AES_KEY",
                    user_id: owner_id,
                })
                .send()
                .await?;
            let body: StoreKeyResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| KmsError::MalformedResponse(e.to_string()))?;
            debug!("stored envelope key for owner {}", owner_id);
            Ok(body.key_id)
        })
        .await
    }

    async fn store_nonce(&self, nonce: &[u8], owner_id: &str) -> Result<String, KmsError> {
        self.with_retries("store_nonce", || async move {
            let response = self
                .http
                .post(format!("{}/nonces", self.config.base_url))
                .header("api-key", &self.config.api_key)
                .json(&StoreNonceRequest {
                    nonce: BASE64.encode(nonce),
                    user_id: owner_id,
                    purpose: "AES_CTR",
                })
                .send()
                .await?;
            let body: StoreNonceResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| KmsError::MalformedResponse(e.to_string()))?;
            Ok(body.nonce_id)
        })
        .await
    }

    async fn get_key(&self, key_id: &str, owner_id: &str) -> Result<Vec<u8>, KmsError> {
        self.with_retries("get_key", || async move {
            let response = self
                .http
                .get(format!("{}/keys", self.config.base_url))
                .header("api-key", &self.config.api_key)
                .query(&[("key_id", key_id), ("user_id", owner_id), ("type", "AES_KEY")])
                .send()
                .await?;
            let body: GetKeyResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| KmsError::MalformedResponse(e.to_string()))?;
            Self::decode_b64("key", &body.key)
        })
        .await
    }

    async fn get_nonce(&self, nonce_id: &str, owner_id: &str) -> Result<Vec<u8>, KmsError> {
        self.with_retries("get_nonce", || async move {
            let response = self
                .http
                .get(format!("{}/nonces", self.config.base_url))
                .header("api-key", &self.config.api_key)
                .query(&[("nonce_id", nonce_id), ("user_id", owner_id)])
                .send()
                .await?;
            let body: GetNonceResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| KmsError::MalformedResponse(e.to_string()))?;
            Self::decode_b64("nonce", &body.nonce)
        })
        .await
    }
}
