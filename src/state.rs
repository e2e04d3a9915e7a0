// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application State
//!
//! Shared state passed to all Axum request handlers via the `State`
//! extractor.
//!
//! ## Thread Safety
//!
//! `AppState` is `Clone` and `Send + Sync`. The vault service is wrapped in
//! `Arc` and holds its own shared references to the storage backends, so a
//! clone per request is cheap.

use std::sync::Arc;

use crate::vault::VaultService;

/// Authentication configuration for token verification.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 session tokens.
    pub secret: String,
}

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The vault core behind every API operation.
    pub vault: Arc<VaultService>,
    /// Token verification configuration used by the auth extractor.
    pub auth_config: AuthConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(vault: Arc<VaultService>, auth_config: AuthConfig) -> Self {
        Self { vault, auth_config }
    }
}

#[cfg(test)]
impl AppState {
    /// State over in-memory backends for router and extractor tests.
    pub fn for_tests(token_secret: &str) -> Self {
        use crate::crypto::KeyManager;
        use crate::storage::{InMemoryObjectStore, InMemoryStorage};

        let storage = Arc::new(InMemoryStorage::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let key_manager = KeyManager::new(storage.clone(), [7u8; 32]);
        let vault = Arc::new(VaultService::new(storage, objects, key_manager, token_secret));

        Self::new(
            vault,
            AuthConfig {
                secret: token_secret.to_owned(),
            },
        )
    }
}
