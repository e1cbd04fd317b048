// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Public-Key Record Storage
//!
//! Persisted mapping of client owner id to the public key that owner last
//! registered, with expiry. At most one live record exists per owner; the
//! key-exchange protocol is the only writer.
//!
//! Both mutation operations are atomic per owner: two concurrent submissions
//! racing over an expired record must leave exactly one live record behind,
//! never two.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A client's registered public key with its validity window
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PublicKeyRecord {
    pub owner_id: String,
    /// PEM text as the client submitted it (decoded from base64)
    pub public_key_pem: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PublicKeyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Whether an upsert created a new record or refreshed a live one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Refreshed,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("key store backend error: {0}")]
    Backend(String),
}

/// Storage abstraction for public-key records
///
/// Implementations must make each method atomic per owner id so the
/// read-check-then-write in the exchange protocol cannot double-insert.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, owner_id: &str) -> Result<Option<PublicKeyRecord>, KeyStoreError>;

    /// Delete the owner's record if it is expired at `now`
    ///
    /// Returns true if a record was deleted. Live records are left alone.
    async fn remove_expired(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, KeyStoreError>;

    /// Insert or overwrite the owner's record, refreshing `expires_at` to
    /// `now + ttl`
    ///
    /// Overwriting keeps `created_at` and bumps `updated_at`; the previous
    /// public key is unrecoverable afterwards.
    async fn upsert(
        &self,
        owner_id: &str,
        public_key_pem: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(PublicKeyRecord, UpsertOutcome), KeyStoreError>;

    async fn remove(&self, owner_id: &str) -> Result<bool, KeyStoreError>;

    async fn count(&self) -> usize;
}

/// In-memory key store
///
/// A single write lock over the whole map makes every mutation atomic.
/// Persistence backends implement [`KeyStore`] with their own transaction
/// or compare-and-swap and get the same exchange semantics.
#[derive(Clone, Default)]
pub struct InMemoryKeyStore {
    records: Arc<RwLock<HashMap<String, PublicKeyRecord>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get(&self, owner_id: &str) -> Result<Option<PublicKeyRecord>, KeyStoreError> {
        let records = self.records.read().await;
        Ok(records.get(owner_id).cloned())
    }

    async fn remove_expired(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, KeyStoreError> {
        let mut records = self.records.write().await;
        if records
            .get(owner_id)
            .map(|r| r.is_expired(now))
            .unwrap_or(false)
        {
            records.remove(owner_id);
            tracing::info!("🗑️  Removed expired public key for owner: {}", owner_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn upsert(
        &self,
        owner_id: &str,
        public_key_pem: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(PublicKeyRecord, UpsertOutcome), KeyStoreError> {
        let mut records = self.records.write().await;
        let expires_at = now + ttl;

        let (record, outcome) = match records.get(owner_id) {
            Some(existing) => (
                PublicKeyRecord {
                    owner_id: owner_id.to_string(),
                    public_key_pem,
                    created_at: existing.created_at,
                    updated_at: now,
                    expires_at,
                },
                UpsertOutcome::Refreshed,
            ),
            None => (
                PublicKeyRecord {
                    owner_id: owner_id.to_string(),
                    public_key_pem,
                    created_at: now,
                    updated_at: now,
                    expires_at,
                },
                UpsertOutcome::Inserted,
            ),
        };

        records.insert(owner_id.to_string(), record.clone());
        tracing::info!(
            "🔑 Public key {} for owner: {} (expires {})",
            match outcome {
                UpsertOutcome::Inserted => "registered",
                UpsertOutcome::Refreshed => "refreshed",
            },
            owner_id,
            expires_at
        );
        Ok((record, outcome))
    }

    async fn remove(&self, owner_id: &str) -> Result<bool, KeyStoreError> {
        let mut records = self.records.write().await;
        Ok(records.remove(owner_id).is_some())
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}
