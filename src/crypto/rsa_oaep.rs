// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RSA-OAEP Asymmetric Messaging
//!
//! Implements the asymmetric half of the handshake: short UTF-8 messages
//! (verification tokens, capability keys) encrypted to a recipient's RSA
//! public key using OAEP with SHA-256 for both the hash and the MGF1 mask
//! generation function, no label. Ciphertexts travel base64-encoded.
//!
//! The padding check on decrypt is constant-time in the underlying
//! implementation and surfaces a single opaque error regardless of where the
//! check failed, so a padding oracle cannot be built from timing or error
//! variance.

use crate::crypto::CryptoError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// SHA-256 output size, which OAEP consumes twice plus two bytes of framing
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// Load a PEM-encoded (PKCS#8) RSA private key
pub fn load_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::InvalidKey {
        key_type: "rsa_private_key".to_string(),
        reason: e.to_string(),
    })
}

/// Load a PEM-encoded (SPKI) RSA public key
pub fn load_public_key(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::InvalidKey {
        key_type: "rsa_public_key".to_string(),
        reason: e.to_string(),
    })
}

/// Maximum message size encryptable under `public_key` with OAEP-SHA256
pub fn max_message_len(public_key: &RsaPublicKey) -> usize {
    public_key.size().saturating_sub(OAEP_OVERHEAD)
}

/// Encrypt a UTF-8 message to a recipient public key
///
/// # Arguments
///
/// * `message` - UTF-8 message, at most `max_message_len(public_key)` bytes
/// * `public_key` - Recipient's RSA public key
///
/// # Returns
///
/// Base64-encoded ciphertext
///
/// # Errors
///
/// Returns `CryptoError::MessageTooLong` if the message exceeds the
/// OAEP-bounded capacity of the key; no partial ciphertext is produced.
pub fn encrypt_message(message: &str, public_key: &RsaPublicKey) -> Result<String, CryptoError> {
    // 1. Enforce the padding-bounded length limit up front
    let limit = max_message_len(public_key);
    if message.len() > limit {
        return Err(CryptoError::MessageTooLong {
            limit,
            actual: message.len(),
        });
    }

    // 2. OAEP with SHA-256 for both digest and MGF1, no label
    let ciphertext = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), message.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed {
            operation: "rsa_oaep".to_string(),
            reason: e.to_string(),
        })?;

    Ok(BASE64.encode(ciphertext))
}

/// Decrypt a base64 ciphertext with our own private key
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` on malformed base64 or a failed
/// padding check, and `CryptoError::InvalidEncoding` if the plaintext is not
/// valid UTF-8. The padding failure is indistinguishable from the outside
/// beyond "decryption failed".
pub fn decrypt_message(
    ciphertext_b64: &str,
    private_key: &RsaPrivateKey,
) -> Result<String, CryptoError> {
    // 1. Decode base64
    let ciphertext = BASE64
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "rsa_oaep".to_string(),
            reason: format!("malformed base64 ciphertext: {}", e),
        })?;

    // 2. Decrypt with constant-time padding check
    let plaintext = private_key
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "rsa_oaep".to_string(),
            reason: e.to_string(),
        })?;

    // 3. Messages are UTF-8 by contract
    Ok(String::from_utf8(plaintext)?)
}
