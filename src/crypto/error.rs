// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error types for the envelope and asymmetric encryption primitives with
//! context preservation.
//!
//! ## Error Variants
//!
//! - **EncryptionFailed**: asymmetric or envelope encryption failed
//! - **DecryptionFailed**: padding check or keystream application failed
//! - **InvalidKey**: key has the wrong size or cannot be parsed
//! - **InvalidNonce**: nonce size validation failed (AES-CTR requires 16 bytes)
//! - **InvalidEncoding**: base64 or UTF-8 decoding failed
//! - **MessageTooLong**: plaintext exceeds the OAEP-bounded modulus capacity
//!
//! All variants carry the operation or field that failed plus a specific
//! reason so callers can log without re-deriving context.

use std::fmt;

/// Error type for all cryptographic operations
#[derive(Debug, Clone)]
pub enum CryptoError {
    /// Encryption failed
    EncryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Decryption failed
    ///
    /// For OAEP this covers the padding check; the error carries no
    /// information about where inside the check the mismatch occurred.
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid cryptographic key (wrong length, unparseable PEM)
    InvalidKey {
        /// Type of key that failed (e.g. "envelope_key", "node_private_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid nonce size
    InvalidNonce {
        /// Expected nonce size in bytes
        expected_size: usize,
        /// Actual nonce size provided
        actual_size: usize,
    },

    /// Malformed base64 or UTF-8 input
    InvalidEncoding {
        /// Which field failed to decode
        field: String,
        /// Specific failure reason
        reason: String,
    },

    /// Plaintext exceeds what the OAEP padding leaves of the modulus
    MessageTooLong {
        /// Maximum message size for the key in use
        limit: usize,
        /// Actual message size
        actual: usize,
    },

    /// Generic error for library errors or unexpected failures
    Other(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::EncryptionFailed { operation, reason } => {
                write!(f, "Encryption failed during {}: {}", operation, reason)
            }
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::InvalidNonce {
                expected_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Invalid nonce size: expected {} bytes, got {} bytes",
                    expected_size, actual_size
                )
            }
            CryptoError::InvalidEncoding { field, reason } => {
                write!(f, "Invalid encoding for '{}': {}", field, reason)
            }
            CryptoError::MessageTooLong { limit, actual } => {
                write!(
                    f,
                    "Message too long for key: limit {} bytes, got {} bytes",
                    limit, actual
                )
            }
            CryptoError::Other(msg) => {
                write!(f, "Crypto error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

// Conversion from base64 decode errors
impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::InvalidEncoding {
            field: "base64".to_string(),
            reason: err.to_string(),
        }
    }
}

// Conversion from UTF-8 errors on decrypted bytes
impl From<std::string::FromUtf8Error> for CryptoError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CryptoError::InvalidEncoding {
            field: "utf-8".to_string(),
            reason: err.to_string(),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for CryptoError {
    fn from(err: anyhow::Error) -> Self {
        CryptoError::Other(err.to_string())
    }
}
