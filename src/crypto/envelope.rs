//! AES-256-CTR Envelope Encryption
//!
//! Encrypts stored user data with a per-user 32-byte symmetric key. The key
//! and the per-call nonce live in the external key-management service, never
//! next to the ciphertext.
//!
//! **Envelope Format**:
//! ```text
//! nonce: 16 bytes, random per call | ciphertext: base64 string
//! ```
//!
//! Counter mode carries no authentication tag: decrypting with the wrong key
//! yields garbage bytes, not an error. Callers that need tamper evidence must
//! layer it separately. The nonce MUST be freshly random per call: reusing a
//! nonce under the same key leaks the XOR of the two plaintexts.

use crate::crypto::CryptoError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::{rngs::OsRng, RngCore};

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Envelope keys are AES-256 keys
pub const ENVELOPE_KEY_SIZE: usize = 32;

/// CTR mode uses the full AES block size as the nonce/counter block
pub const ENVELOPE_NONCE_SIZE: usize = 16;

/// Encrypt plaintext under a 32-byte envelope key
///
/// Generates a fresh random 16-byte nonce, applies the AES-256-CTR
/// keystream, and returns the nonce together with the base64-encoded
/// ciphertext.
///
/// # Arguments
///
/// * `key` - 32-byte (256-bit) AES key
/// * `plaintext` - Data to encrypt
///
/// # Returns
///
/// `(nonce, ciphertext_b64)` - the nonce must be stored alongside the key
/// reference (in the key-management service) to decrypt later
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` if the key is not 32 bytes.
pub fn encrypt_envelope(
    key: &[u8],
    plaintext: &[u8],
) -> Result<([u8; ENVELOPE_NONCE_SIZE], String), CryptoError> {
    // 1. Validate key size
    if key.len() != ENVELOPE_KEY_SIZE {
        return Err(CryptoError::InvalidKey {
            key_type: "envelope_key".to_string(),
            reason: format!(
                "expected {} bytes, got {}",
                ENVELOPE_KEY_SIZE,
                key.len()
            ),
        });
    }

    // 2. Fresh random nonce, never reused with the same key
    let mut nonce = [0u8; ENVELOPE_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    // 3. Apply the keystream in place
    let mut cipher =
        Aes256Ctr::new_from_slices(key, &nonce).map_err(|e| CryptoError::EncryptionFailed {
            operation: "envelope".to_string(),
            reason: e.to_string(),
        })?;
    let mut buffer = plaintext.to_vec();
    cipher.apply_keystream(&mut buffer);

    Ok((nonce, BASE64.encode(buffer)))
}

/// Decrypt a base64 envelope ciphertext under the given key and nonce
///
/// # Arguments
///
/// * `key` - 32-byte AES key
/// * `nonce` - 16-byte nonce returned by [`encrypt_envelope`]
/// * `ciphertext_b64` - base64-encoded ciphertext
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` / `InvalidNonce` on size mismatches and
/// `CryptoError::DecryptionFailed` on malformed base64. A wrong key is not
/// detectable here (no integrity tag); the output is simply wrong bytes.
pub fn decrypt_envelope(
    key: &[u8],
    nonce: &[u8],
    ciphertext_b64: &str,
) -> Result<Vec<u8>, CryptoError> {
    // 1. Validate key size
    if key.len() != ENVELOPE_KEY_SIZE {
        return Err(CryptoError::InvalidKey {
            key_type: "envelope_key".to_string(),
            reason: format!(
                "expected {} bytes, got {}",
                ENVELOPE_KEY_SIZE,
                key.len()
            ),
        });
    }

    // 2. Validate nonce size
    if nonce.len() != ENVELOPE_NONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected_size: ENVELOPE_NONCE_SIZE,
            actual_size: nonce.len(),
        });
    }

    // 3. Decode base64 (strict: exact padding and alphabet)
    let mut buffer = BASE64
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "envelope".to_string(),
            reason: format!("malformed base64 ciphertext: {}", e),
        })?;

    // 4. CTR decryption is keystream application, same as encryption
    let mut cipher =
        Aes256Ctr::new_from_slices(key, nonce).map_err(|e| CryptoError::DecryptionFailed {
            operation: "envelope".to_string(),
            reason: e.to_string(),
        })?;
    cipher.apply_keystream(&mut buffer);

    Ok(buffer)
}
