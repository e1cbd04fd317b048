// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User Directory
//!
//! Identity records for registered users. Usernames are never stored in the
//! clear: each record holds an Argon2id hash (memory-hard, per-record salt),
//! an opaque verification token, and a reference to the user's envelope key
//! in the external key-management service. Profile fields are stored
//! envelope-encrypted; their nonces live in the key-management service too.
//!
//! Authentication is a capability-token check: possession of the correctly
//! decrypted token is the credential. A miss returns `None`, never an error.

use crate::crypto::{encrypt_envelope, CryptoError, ENVELOPE_KEY_SIZE};
use crate::kms::{KeyManagement, KmsError};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Per-record salt size for the username hash
pub const SALT_SIZE: usize = 16;

/// Longest accepted username
pub const MAX_USERNAME_LEN: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid registration data: {0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Kms(#[from] KmsError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// One envelope-encrypted profile value
///
/// The ciphertext stays local; the nonce needed to decrypt it is referenced
/// by id in the key-management service.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EncryptedField {
    pub ciphertext_b64: String,
    pub nonce_id: String,
}

/// A registered identity
///
/// Read-only after creation, except for rotation of the key reference.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    /// Argon2id hash of the username (PHC string, embeds the salt)
    pub username_hash: String,
    /// Opaque capability token; the client proves identity by returning it
    /// RSA-encrypted to the node
    pub verification_token: String,
    /// Reference to the user's 32-byte envelope key in the KMS
    pub kms_key_id: String,
    /// Envelope-encrypted profile fields
    pub encrypted_profile: HashMap<String, EncryptedField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful registration, handed back to the caller
#[derive(Debug, Clone)]
pub struct RegisteredIdentity {
    pub username_hash: String,
    pub verification_token: String,
}

/// Directory of registered identities, keyed by verification token
pub struct UserDirectory {
    records: RwLock<HashMap<String, IdentityRecord>>,
    kms: Arc<dyn KeyManagement>,
}

impl UserDirectory {
    pub fn new(kms: Arc<dyn KeyManagement>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            kms,
        }
    }

    /// Resolve a decrypted verification token to an identity
    ///
    /// Exact match only. A malformed or unknown token resolves to `None`;
    /// absence is "unauthenticated", not an error.
    pub async fn authenticate(&self, verification_token: &str) -> Option<IdentityRecord> {
        if verification_token.is_empty() {
            return None;
        }
        let records = self.records.read().await;
        records.get(verification_token).cloned()
    }

    /// Register a new identity
    ///
    /// Generates a fresh salt and envelope key, hashes the username with
    /// Argon2id, envelope-encrypts every profile field, and files key and
    /// nonces with the key-management service. The returned verification
    /// token is shown to the caller exactly once.
    pub async fn register_identity(
        &self,
        username: &str,
        profile: &HashMap<String, String>,
    ) -> Result<RegisteredIdentity, DirectoryError> {
        // 1. Validate
        if username.trim().is_empty() {
            return Err(DirectoryError::Validation("username is empty".to_string()));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(DirectoryError::Validation(format!(
                "username longer than {} characters",
                MAX_USERNAME_LEN
            )));
        }

        // 2. Memory-hard duplicate check across existing hashes
        if self.username_exists(username).await {
            return Err(DirectoryError::UsernameTaken);
        }

        // 3. Fresh salt, never reused across records
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let username_hash = hash_username(username, &salt)?;

        // 4. Opaque capability token
        let verification_token = generate_verification_token(username, &salt);

        // 5. Envelope key lives only in the KMS
        let mut envelope_key = [0u8; ENVELOPE_KEY_SIZE];
        OsRng.fill_bytes(&mut envelope_key);
        let kms_key_id = self.kms.store_key(&envelope_key, &username_hash).await?;

        // 6. Encrypt profile fields; each nonce is filed separately
        let mut encrypted_profile = HashMap::new();
        for (field, value) in profile {
            let (nonce, ciphertext_b64) = encrypt_envelope(&envelope_key, value.as_bytes())?;
            let nonce_id = self.kms.store_nonce(&nonce, &username_hash).await?;
            encrypted_profile.insert(
                field.clone(),
                EncryptedField {
                    ciphertext_b64,
                    nonce_id,
                },
            );
        }

        let now = Utc::now();
        let record = IdentityRecord {
            username_hash: username_hash.clone(),
            verification_token: verification_token.clone(),
            kms_key_id,
            encrypted_profile,
            created_at: now,
            updated_at: now,
        };

        let mut records = self.records.write().await;
        records.insert(verification_token.clone(), record);
        tracing::info!("registered identity (directory size: {})", records.len());

        Ok(RegisteredIdentity {
            username_hash,
            verification_token,
        })
    }

    /// Decrypt one stored profile field for an authenticated identity
    pub async fn decrypt_profile_field(
        &self,
        record: &IdentityRecord,
        field: &str,
    ) -> Result<Option<String>, DirectoryError> {
        let Some(encrypted) = record.encrypted_profile.get(field) else {
            return Ok(None);
        };
        let key = self
            .kms
            .get_key(&record.kms_key_id, &record.username_hash)
            .await?;
        let nonce = self
            .kms
            .get_nonce(&encrypted.nonce_id, &record.username_hash)
            .await?;
        let plaintext = crate::crypto::decrypt_envelope(&key, &nonce, &encrypted.ciphertext_b64)?;
        Ok(Some(String::from_utf8(plaintext).map_err(CryptoError::from)?))
    }

    /// Point an identity at a new envelope key (key-reference rotation)
    ///
    /// The only permitted mutation of an existing record.
    pub async fn rotate_key_reference(
        &self,
        verification_token: &str,
        new_kms_key_id: String,
    ) -> Result<(), DirectoryError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(verification_token).ok_or_else(|| {
            DirectoryError::Validation("no identity for verification token".to_string())
        })?;
        record.kms_key_id = new_kms_key_id;
        record.updated_at = Utc::now();
        Ok(())
    }

    /// Check whether a username is already registered
    ///
    /// Usernames are only stored hashed, so this verifies the candidate
    /// against every record's Argon2 hash.
    pub async fn username_exists(&self, username: &str) -> bool {
        let records = self.records.read().await;
        records.values().any(|record| {
            PasswordHash::new(&record.username_hash)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(username.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false)
        })
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

/// Argon2id hash of a username under a per-record salt
fn hash_username(username: &str, salt: &[u8; SALT_SIZE]) -> Result<String, DirectoryError> {
    let salt_string =
        SaltString::encode_b64(salt).map_err(|e| DirectoryError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .hash_password(username.as_bytes(), &salt_string)
        .map_err(|e| DirectoryError::Hashing(e.to_string()))?
        .to_string())
}

/// Opaque capability token: SHA-512 over salt, a fresh UUID, and the username
fn generate_verification_token(username: &str, salt: &[u8; SALT_SIZE]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(hex::encode(salt));
    hasher.update(Uuid::new_v4().to_string());
    hasher.update(username);
    hex::encode(hasher.finalize())
}
