// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key-Exchange Protocol and Public-Key Storage
//!
//! Clients authenticate without ever sending their identifier in the clear:
//! they first register a short-lived public key here, receive the node's
//! public key in return, and from then on encrypt their verification token
//! to the node. The store enforces at most one live key per owner.

pub mod exchange;
pub mod store;

pub use exchange::{
    KeyExchange, KeyExchangeError, KeyExchangeResponse, DEFAULT_KEY_TTL_HOURS,
};
pub use store::{InMemoryKeyStore, KeyStore, KeyStoreError, PublicKeyRecord, UpsertOutcome};
