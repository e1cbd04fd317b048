// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity and Envelope Encryption Module
//!
//! Cryptographic primitives for the two protection layers of the platform:
//!
//! - **Envelope**: AES-256-CTR with per-user keys for stored user data; key
//!   and nonce material is held by the external key-management service
//! - **RSA-OAEP**: asymmetric messaging for the key-exchange handshake and
//!   verification tokens (SHA-256 digest and MGF1, no label)
//! - **Node Keys**: the node's long-lived RSA keypair, loaded from PEM files
//!
//! ## Security Considerations
//!
//! - Envelope nonces are random per call and never reused with the same key
//! - The OAEP padding check is constant-time and returns one opaque error
//! - Private key material is loaded once at startup and never logged
//!
//! ## Protocol Flow
//!
//! 1. Client submits its public key with a timestamp via the key exchange
//! 2. Node stores the key with an expiry and returns its own public key
//! 3. Client encrypts its verification token to the node's public key
//! 4. Node decrypts the token and resolves it against the user directory
//! 5. Stored profile data is envelope-encrypted with the user's AES key

pub mod envelope;
pub mod error;
pub mod node_keys;
pub mod rsa_oaep;

pub use envelope::{
    decrypt_envelope, encrypt_envelope, ENVELOPE_KEY_SIZE, ENVELOPE_NONCE_SIZE,
};
pub use error::CryptoError;
pub use node_keys::NodeKeys;
pub use rsa_oaep::{
    decrypt_message, encrypt_message, load_private_key, load_public_key, max_message_len,
};
