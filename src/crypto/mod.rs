// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Envelope Encryption Module
//!
//! Three layered key relationships protect every stored record:
//!
//! ```text
//! server KEK ──wraps──▶ per-user master key (MK)
//! master key ──wraps──▶ per-record data encryption key (DEK)
//! DEK        ──seals──▶ record payload
//! ```
//!
//! All three layers use AES-256-GCM with 96-bit random nonces and 128-bit
//! tags. Each wrap has its own nonce and its own failure mode; plaintext
//! keys never reach durable storage and live DEKs never escape a single
//! encrypt or decrypt call.
//!
//! ## Submodules
//!
//! - [`envelope`] - per-record DEK generation and payload sealing
//! - [`keys`] - master key derivation, wrapping, and verification
//! - [`mk_cache`] - bounded in-memory cache of live master keys

pub mod envelope;
pub mod keys;
pub mod mk_cache;

pub use envelope::{decrypt_user_data, encrypt_user_data, EncryptedPayload};
pub use keys::{KeyManager, KeyManagerError};
pub use mk_cache::MasterKeyCache;

/// Key length in bytes for the KEK, MK, and DEK (AES-256).
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// A live 256-bit key, zeroized when dropped.
pub type SecretKey = zeroize::Zeroizing<[u8; KEY_LEN]>;

/// Cryptographic failure.
///
/// AEAD open failures deliberately carry no detail: distinguishing a wrong
/// key from a tampered ciphertext would hand an oracle to the caller, and
/// key material must never appear in error output.
#[derive(Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// A key had the wrong length for AES-256.
    InvalidKeyLength,
    /// AEAD sealing failed.
    SealFailed,
    /// AEAD opening failed (wrong key or tampered input).
    OpenFailed,
    /// Key derivation (Argon2id) failed.
    KeyDerivation,
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::InvalidKeyLength => write!(f, "invalid key length"),
            CryptoError::SealFailed => write!(f, "encryption failed"),
            CryptoError::OpenFailed => write!(f, "decryption failed"),
            CryptoError::KeyDerivation => write!(f, "key derivation failed"),
        }
    }
}

impl std::error::Error for CryptoError {}
