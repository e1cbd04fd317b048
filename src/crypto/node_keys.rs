//! Node RSA Keypair
//!
//! The node holds one long-lived RSA keypair. Clients encrypt their
//! verification tokens to the public half; the key-exchange response hands
//! the public half out base64-encoded so clients can complete the mutual
//! handshake.
//!
//! Keys live as PEM files under the configured key directory and are
//! generated on first start when absent.

use crate::crypto::CryptoError;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::Path;

const PRIVATE_KEY_FILE: &str = "node_private_key.pem";
const PUBLIC_KEY_FILE: &str = "node_public_key.pem";

/// Default modulus size for generated node keys
pub const NODE_KEY_BITS: usize = 2048;

/// The node's long-lived RSA keypair
#[derive(Clone)]
pub struct NodeKeys {
    private_key: RsaPrivateKey,
    public_key_pem: String,
}

impl NodeKeys {
    /// Generate a fresh keypair without touching disk (tests, ephemeral runs)
    pub fn generate(bits: usize) -> Result<Self> {
        let private_key =
            RsaPrivateKey::new(&mut OsRng, bits).context("RSA key generation failed")?;
        let public_key_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .context("failed to encode public key PEM")?;
        Ok(Self {
            private_key,
            public_key_pem,
        })
    }

    /// Load the keypair from `key_dir`, generating and persisting one if the
    /// private key file does not exist yet
    pub fn load_or_generate(key_dir: &Path) -> Result<Self> {
        fs::create_dir_all(key_dir)
            .with_context(|| format!("failed to create key directory {}", key_dir.display()))?;

        let private_path = key_dir.join(PRIVATE_KEY_FILE);
        if private_path.exists() {
            let pem = fs::read_to_string(&private_path)
                .with_context(|| format!("failed to read {}", private_path.display()))?;
            let private_key = super::rsa_oaep::load_private_key(&pem)?;
            let public_key_pem = RsaPublicKey::from(&private_key)
                .to_public_key_pem(LineEnding::LF)
                .context("failed to encode public key PEM")?;
            tracing::info!("🔑 Loaded node keypair from {}", private_path.display());
            return Ok(Self {
                private_key,
                public_key_pem,
            });
        }

        let keys = Self::generate(NODE_KEY_BITS)?;
        let private_pem = keys
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .context("failed to encode private key PEM")?;
        fs::write(&private_path, private_pem.as_bytes())
            .with_context(|| format!("failed to write {}", private_path.display()))?;
        fs::write(key_dir.join(PUBLIC_KEY_FILE), keys.public_key_pem.as_bytes())
            .context("failed to write public key PEM")?;
        tracing::info!("🔑 Generated new node keypair in {}", key_dir.display());
        Ok(keys)
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// The public key PEM, base64-encoded for the key-exchange response body
    pub fn public_key_b64(&self) -> String {
        BASE64.encode(self.public_key_pem.as_bytes())
    }

    /// Decrypt a client-submitted verification token with our private key
    pub fn decrypt_token(&self, ciphertext_b64: &str) -> Result<String, CryptoError> {
        super::rsa_oaep::decrypt_message(ciphertext_b64, &self.private_key)
    }
}
