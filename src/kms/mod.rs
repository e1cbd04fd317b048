// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! External Key-Management Service
//!
//! Envelope keys and nonces never live next to the data they protect; they
//! are stored in a remote key-management service and referenced by id. This
//! module holds the request/response contract ([`KeyManagement`]), the HTTP
//! client, and an in-memory implementation for tests and local development.

pub mod client;

use async_trait::async_trait;

pub use client::{KmsClient, KmsConfig, KmsError};

/// Contract with the remote key-management service
///
/// `store_*` returns the id under which the material was filed; `get_*`
/// resolves the id back to raw bytes. Every operation is scoped to an owner.
#[async_trait]
pub trait KeyManagement: Send + Sync {
    async fn store_key(&self, key: &[u8], owner_id: &str) -> Result<String, KmsError>;
    async fn store_nonce(&self, nonce: &[u8], owner_id: &str) -> Result<String, KmsError>;
    async fn get_key(&self, key_id: &str, owner_id: &str) -> Result<Vec<u8>, KmsError>;
    async fn get_nonce(&self, nonce_id: &str, owner_id: &str) -> Result<Vec<u8>, KmsError>;
}

/// In-memory stand-in for the remote service (tests, local development)
#[derive(Default)]
pub struct InMemoryKms {
    keys: tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
    nonces: tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl InMemoryKms {
    pub fn new() -> Self {
        Self::default()
    }

    fn scoped(id: &str, owner_id: &str) -> String {
        format!("{}/{}", owner_id, id)
    }
}

#[async_trait]
impl KeyManagement for InMemoryKms {
    async fn store_key(&self, key: &[u8], owner_id: &str) -> Result<String, KmsError> {
        let key_id = uuid::Uuid::new_v4().to_string();
        self.keys
            .write()
            .await
            .insert(Self::scoped(&key_id, owner_id), key.to_vec());
        Ok(key_id)
    }

    async fn store_nonce(&self, nonce: &[u8], owner_id: &str) -> Result<String, KmsError> {
        let nonce_id = uuid::Uuid::new_v4().to_string();
        self.nonces
            .write()
            .await
            .insert(Self::scoped(&nonce_id, owner_id), nonce.to_vec());
        Ok(nonce_id)
    }

    async fn get_key(&self, key_id: &str, owner_id: &str) -> Result<Vec<u8>, KmsError> {
        self.keys
            .read()
            .await
            .get(&Self::scoped(key_id, owner_id))
            .cloned()
            .ok_or_else(|| KmsError::NotFound {
                kind: "key".to_string(),
                id: key_id.to_string(),
            })
    }

    async fn get_nonce(&self, nonce_id: &str, owner_id: &str) -> Result<Vec<u8>, KmsError> {
        self.nonces
            .read()
            .await
            .get(&Self::scoped(nonce_id, owner_id))
            .cloned()
            .ok_or_else(|| KmsError::NotFound {
                kind: "nonce".to_string(),
                id: nonce_id.to_string(),
            })
    }
}
