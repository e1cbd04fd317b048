// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key-Exchange Protocol
//!
//! Registers a client's short-lived public key and returns the node's own
//! public key so the client can complete the mutual handshake. Per owner the
//! record moves through `NoKey -> ActiveKey -> Expired -> (deleted)`; a
//! submission over an expired record deletes it first, a submission over a
//! live one overwrites the key and refreshes the expiry.

use crate::crypto::NodeKeys;
use crate::keys::store::{KeyStore, KeyStoreError, PublicKeyRecord};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::sync::Arc;

/// Default validity window for a registered client key
pub const DEFAULT_KEY_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum KeyExchangeError {
    /// Owner id or key missing/empty
    #[error("Missing required fields")]
    MissingFields,

    /// Timestamp is not a parseable ISO-8601 date-time
    #[error("Invalid format")]
    InvalidTimestamp,

    /// Key is not strict base64, or decodes to non-UTF-8 bytes
    #[error("Invalid public key encoding")]
    InvalidKeyEncoding,

    #[error(transparent)]
    Store(#[from] KeyStoreError),
}

/// Successful handshake response
#[derive(Debug, Clone, serde::Serialize)]
pub struct KeyExchangeResponse {
    pub message: String,
    /// The node's public key PEM, base64-encoded
    pub pubkey: String,
}

/// The server side of the key-exchange handshake
///
/// Holds an injected [`KeyStore`] and the node keypair; constructed once at
/// startup and shared behind an `Arc`.
#[derive(Clone)]
pub struct KeyExchange {
    store: Arc<dyn KeyStore>,
    node_keys: Arc<NodeKeys>,
    key_ttl: Duration,
}

impl KeyExchange {
    pub fn new(store: Arc<dyn KeyStore>, node_keys: Arc<NodeKeys>, key_ttl: Duration) -> Self {
        Self {
            store,
            node_keys,
            key_ttl,
        }
    }

    /// Register `public_key_b64` for `owner_id`
    ///
    /// Exactly one upsert and at most one delete (of an expired record)
    /// reach the store; a validation failure leaves live records untouched.
    ///
    /// # Errors
    ///
    /// - `MissingFields` if owner id or key is empty
    /// - `InvalidTimestamp` if the timestamp is not ISO-8601
    /// - `InvalidKeyEncoding` if the key is not strict base64 UTF-8
    pub async fn submit_public_key(
        &self,
        owner_id: &str,
        public_key_b64: &str,
        timestamp: &str,
    ) -> Result<KeyExchangeResponse, KeyExchangeError> {
        // 1. Presence checks
        if owner_id.trim().is_empty() || public_key_b64.trim().is_empty() {
            return Err(KeyExchangeError::MissingFields);
        }

        // 2. Timestamp must be a valid ISO-8601 date-time
        if !is_iso_timestamp(timestamp) {
            return Err(KeyExchangeError::InvalidTimestamp);
        }

        let now = Utc::now();

        // 3. An expired record for this owner is deleted before the upsert
        self.store.remove_expired(owner_id, now).await?;

        // 4. Strict base64: exact padding and alphabet, no correction
        let decoded = BASE64
            .decode(public_key_b64)
            .map_err(|_| KeyExchangeError::InvalidKeyEncoding)?;
        let public_key_pem =
            String::from_utf8(decoded).map_err(|_| KeyExchangeError::InvalidKeyEncoding)?;

        // 5. Insert or overwrite-and-refresh
        let (record, outcome) = self
            .store
            .upsert(owner_id, public_key_pem, now, self.key_ttl)
            .await?;

        tracing::debug!(
            owner = owner_id,
            outcome = ?outcome,
            expires_at = %record.expires_at,
            "key exchange completed"
        );

        Ok(KeyExchangeResponse {
            message: "Key saved successfully".to_string(),
            pubkey: self.node_keys.public_key_b64(),
        })
    }

    /// Look up the live record for an owner, treating expired ones as absent
    pub async fn lookup(&self, owner_id: &str) -> Result<Option<PublicKeyRecord>, KeyStoreError> {
        let now = Utc::now();
        Ok(self
            .store
            .get(owner_id)
            .await?
            .filter(|record| !record.is_expired(now)))
    }
}

/// Accept RFC 3339 as well as naive ISO-8601 without an offset
fn is_iso_timestamp(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}
