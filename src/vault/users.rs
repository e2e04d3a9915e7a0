// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signup and Login.
//!
//! Signup creates the user row and issues a session token; the wrapped
//! master key is NOT created here. It is created lazily on the first Login,
//! because only at login time is the plaintext password available together
//! with a committed user row to derive and wrap the master key for.

use aes_gcm::aead::OsRng;
use rand::RngCore;

use crate::auth::issue_token;
use crate::models::AuthResponse;
use crate::password;
use crate::storage::StorageError;

use super::{VaultError, VaultService};

/// Minimum username length.
const MIN_USERNAME_LEN: usize = 3;
/// Minimum password length.
const MIN_PASSWORD_LEN: usize = 8;
/// Length of the per-user KDF salt generated at signup.
const SALT_LEN: usize = 16;

fn validate_credentials(username: &str, password: &str) -> Result<(), VaultError> {
    if username.len() < MIN_USERNAME_LEN || password.len() < MIN_PASSWORD_LEN {
        return Err(VaultError::InvalidArgument(
            "username and password must be at least 3 and 8 characters long".into(),
        ));
    }
    Ok(())
}

/// bcrypt work runs on the blocking pool; at cost 14 a hash takes on the
/// order of a second and must not occupy an executor thread.
async fn hash_password_blocking(password: String) -> Result<String, VaultError> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|_| VaultError::Internal("password hashing task failed".into()))?
        .map_err(|_| VaultError::Internal("failed to hash password".into()))
}

async fn verify_password_blocking(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

impl VaultService {
    /// Register a new user and issue a session token.
    pub async fn signup(&self, username: &str, password: &str) -> Result<AuthResponse, VaultError> {
        validate_credentials(username, password)?;

        let password_hash = hash_password_blocking(password.to_owned()).await?;

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let user_id = match self.storage.add_user(username, &password_hash, &salt).await {
            Ok(id) => id,
            Err(StorageError::AlreadyExists) => return Err(VaultError::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        let token = issue_token(user_id, username, self.token_secret.as_bytes())?;

        Ok(AuthResponse {
            id: user_id,
            username: username.to_owned(),
            token,
        })
    }

    /// Authenticate a user, issue a session token, and ensure the wrapped
    /// master key exists.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, VaultError> {
        validate_credentials(username, password)?;

        let user = match self.storage.get_user(username).await {
            Ok(user) => user,
            // No enumeration: an unknown username reads the same as a
            // wrong password.
            Err(StorageError::UserNotFound) => return Err(VaultError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        if !verify_password_blocking(password.to_owned(), user.password_hash.clone()).await {
            return Err(VaultError::InvalidCredentials);
        }

        let token = issue_token(user.id, &user.username, self.token_secret.as_bytes())?;

        if let Err(e) = self
            .key_manager
            .get_or_create_master_key(user.id, password, &user.salt)
            .await
        {
            tracing::error!(user_id = user.id, error = %e, "master key setup failed at login");
            return Err(VaultError::CredentialSetup);
        }

        Ok(AuthResponse {
            id: user.id,
            username: user.username,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_token;
    use crate::crypto::KeyManager;
    use crate::storage::{InMemoryObjectStore, InMemoryStorage, VaultStorage};
    use std::sync::Arc;

    const TOKEN_SECRET: &str = "test-jwt-secret";

    fn service() -> (VaultService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        let key_manager = KeyManager::new(storage.clone(), [7u8; 32]);
        let service = VaultService::new(
            storage.clone(),
            Arc::new(InMemoryObjectStore::new()),
            key_manager,
            TOKEN_SECRET,
        );
        (service, storage)
    }

    #[tokio::test]
    async fn signup_returns_identity_and_valid_token() {
        let (service, storage) = service();

        let response = service.signup("alice", "password123").await.unwrap();
        assert_eq!(response.username, "alice");

        let claims = verify_token(&response.token, TOKEN_SECRET.as_bytes()).unwrap();
        assert_eq!(claims.user_id, response.id);
        assert_eq!(claims.name, "alice");

        // Signup must not create the master key row.
        assert!(storage.get_master_key(response.id).await.is_err());

        // The stored verifier is a bcrypt hash, never the raw password.
        let user = storage.get_user("alice").await.unwrap();
        assert_ne!(user.password_hash, "password123");
        assert_eq!(user.salt.len(), SALT_LEN);
    }

    #[tokio::test]
    async fn signup_validation_rejects_short_inputs() {
        let (service, _) = service();

        let result = service.signup("ab", "password123").await;
        assert!(matches!(result, Err(VaultError::InvalidArgument(_))));

        let result = service.signup("alice", "short").await;
        assert!(matches!(result, Err(VaultError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_and_keeps_prior_row() {
        let (service, storage) = service();

        service.signup("alice", "password123").await.unwrap();
        let original = storage.get_user("alice").await.unwrap();

        let result = service.signup("alice", "otherpassword").await;
        assert!(matches!(result, Err(VaultError::AlreadyExists)));

        let after = storage.get_user("alice").await.unwrap();
        assert_eq!(original.id, after.id);
        assert_eq!(original.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn login_creates_master_key_on_first_success() {
        let (service, storage) = service();

        let signed_up = service.signup("alice", "password123").await.unwrap();
        let logged_in = service.login("alice", "password123").await.unwrap();

        assert_eq!(logged_in.id, signed_up.id);
        assert_eq!(logged_in.username, "alice");
        assert!(storage.get_master_key(logged_in.id).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_is_generic_and_creates_no_master_key() {
        let (service, storage) = service();

        let user = service.signup("bob", "hunter22aa").await.unwrap();

        let result = service.login("bob", "hunter22ab").await;
        assert!(matches!(result, Err(VaultError::InvalidCredentials)));
        assert!(storage.get_master_key(user.id).await.is_err());
    }

    #[tokio::test]
    async fn unknown_user_reads_like_wrong_password() {
        let (service, _) = service();

        let result = service.login("nobody", "password123").await;
        assert!(matches!(result, Err(VaultError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn repeated_logins_succeed_against_the_same_master_key() {
        let (service, storage) = service();

        service.signup("alice", "password123").await.unwrap();
        let first = service.login("alice", "password123").await.unwrap();
        let key_row = storage.get_master_key(first.id).await.unwrap();

        let second = service.login("alice", "password123").await.unwrap();
        assert_eq!(first.id, second.id);

        // Wrapped key row is created once and never rewritten.
        let key_row_after = storage.get_master_key(second.id).await.unwrap();
        assert_eq!(key_row.encrypted_master_key, key_row_after.encrypted_master_key);
        assert_eq!(key_row.nonce, key_row_after.nonce);
    }
}
