// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Core
//!
//! The user-facing operations: Signup, Login, DataSave, DataView, DataList,
//! DataDelete. Each is a short state machine over the two cryptographic
//! components (key manager, envelope) and the two stores (relational,
//! blob). Ownership checks and payload serialization live here; transport
//! concerns do not.
//!
//! Handlers pass a typed [`Caller`](crate::auth::Caller) rather than an
//! ambient request context, so every operation's identity dependency is
//! explicit in its signature.

pub mod records;
pub mod users;

use std::sync::Arc;

use crate::auth::AuthError;
use crate::crypto::keys::{KeyManager, KeyManagerError};
use crate::crypto::CryptoError;
use crate::storage::{ObjectStore, StorageError, VaultStorage};

/// Error type for vault operations.
///
/// The API layer maps these onto HTTP statuses. Cryptographic failures
/// always propagate and are never downgraded to an empty result.
#[derive(Debug)]
pub enum VaultError {
    /// Input validation failed or the data type is unspecified.
    InvalidArgument(String),
    /// Wrong username or password. Deliberately does not distinguish
    /// "no such user" from "wrong password".
    InvalidCredentials,
    /// The caller does not own the requested record.
    PermissionDenied,
    /// Requested entity does not exist.
    NotFound,
    /// Unique-username conflict at signup.
    AlreadyExists,
    /// Master key setup failed at login. Generic on purpose: the caller
    /// must not learn which step failed.
    CredentialSetup,
    /// Cryptographic failure (AEAD open, KDF, RNG).
    Crypto(CryptoError),
    /// Repository or blob-store failure.
    Storage(StorageError),
    /// Internal failure that must not leak detail to the caller.
    Internal(String),
}

impl std::fmt::Display for VaultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            VaultError::InvalidCredentials => write!(f, "invalid credentials"),
            VaultError::PermissionDenied => write!(f, "permission denied"),
            VaultError::NotFound => write!(f, "not found"),
            VaultError::AlreadyExists => write!(f, "user already exists"),
            VaultError::CredentialSetup => write!(f, "failed to set up credentials"),
            VaultError::Crypto(e) => write!(f, "crypto failure: {e}"),
            VaultError::Storage(e) => write!(f, "storage failure: {e}"),
            VaultError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for VaultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VaultError::Crypto(e) => Some(e),
            VaultError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CryptoError> for VaultError {
    fn from(e: CryptoError) -> Self {
        VaultError::Crypto(e)
    }
}

impl From<StorageError> for VaultError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::AlreadyExists => VaultError::AlreadyExists,
            other => VaultError::Storage(other),
        }
    }
}

impl From<KeyManagerError> for VaultError {
    fn from(e: KeyManagerError) -> Self {
        match e {
            KeyManagerError::InvalidPassword => VaultError::InvalidCredentials,
            KeyManagerError::Crypto(e) => VaultError::Crypto(e),
            KeyManagerError::Storage(e) => e.into(),
        }
    }
}

impl From<AuthError> for VaultError {
    fn from(_: AuthError) -> Self {
        VaultError::Internal("failed to generate token".into())
    }
}

/// The admin core: orchestrates the cryptographic components and the two
/// stores behind the user-facing operations.
pub struct VaultService {
    storage: Arc<dyn VaultStorage>,
    objects: Arc<dyn ObjectStore>,
    key_manager: KeyManager,
    token_secret: String,
}

impl VaultService {
    /// Create the service over its capability set.
    pub fn new(
        storage: Arc<dyn VaultStorage>,
        objects: Arc<dyn ObjectStore>,
        key_manager: KeyManager,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            objects,
            key_manager,
            token_secret: token_secret.into(),
        }
    }
}
