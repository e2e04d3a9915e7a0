// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Master key management.
//!
//! Each user's 32-byte master key is derived from their password with
//! Argon2id and stored only wrapped under the server KEK. The wrapped copy
//! doubles as the password verifier: on every login after the first, the
//! stored key is unwrapped and compared in constant time against a key
//! freshly derived from the presented password. A client-supplied master
//! key is never accepted.

use std::sync::Arc;

use aes_gcm::aead::OsRng;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::storage::{StorageError, StoredMasterKey, VaultStorage};

use super::envelope::{open, seal};
use super::mk_cache::MasterKeyCache;
use super::{CryptoError, SecretKey, KEY_LEN, NONCE_LEN};

/// Argon2id time cost.
const KDF_TIME_COST: u32 = 3;
/// Argon2id memory cost in KiB (64 MiB).
const KDF_MEM_KIB: u32 = 64 * 1024;
/// Argon2id parallelism.
const KDF_LANES: u32 = 4;

/// Error type for master key operations.
#[derive(Debug)]
pub enum KeyManagerError {
    /// The presented password does not reproduce the stored master key.
    InvalidPassword,
    /// Underlying cryptographic failure (unwrap or derivation).
    Crypto(CryptoError),
    /// Underlying storage failure (including `MasterKeyNotFound`).
    Storage(StorageError),
}

impl std::fmt::Display for KeyManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyManagerError::InvalidPassword => write!(f, "invalid password"),
            KeyManagerError::Crypto(e) => write!(f, "crypto error: {e}"),
            KeyManagerError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for KeyManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyManagerError::Crypto(e) => Some(e),
            KeyManagerError::Storage(e) => Some(e),
            KeyManagerError::InvalidPassword => None,
        }
    }
}

impl From<CryptoError> for KeyManagerError {
    fn from(e: CryptoError) -> Self {
        KeyManagerError::Crypto(e)
    }
}

impl From<StorageError> for KeyManagerError {
    fn from(e: StorageError) -> Self {
        KeyManagerError::Storage(e)
    }
}

/// Produces and verifies per-user master keys.
///
/// The server KEK is loaded once at startup, shared by every invocation,
/// and never mutated.
pub struct KeyManager {
    storage: Arc<dyn VaultStorage>,
    kek: SecretKey,
    cache: Option<Arc<MasterKeyCache>>,
}

impl KeyManager {
    /// Create a new key manager over the given storage and server KEK.
    pub fn new(storage: Arc<dyn VaultStorage>, kek: [u8; KEY_LEN]) -> Self {
        Self {
            storage,
            kek: Zeroizing::new(kek),
            cache: None,
        }
    }

    /// Attach an in-memory master key cache.
    pub fn with_cache(mut self, cache: Arc<MasterKeyCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetch and unwrap the stored master key for an already-authenticated
    /// user. No password is consulted; the caller's identity must already
    /// be bound by the session token.
    ///
    /// Fails with `Storage(MasterKeyNotFound)` when no row exists and with
    /// `Crypto(OpenFailed)` when the row fails to authenticate (tampering
    /// or wrong KEK).
    pub async fn get_master_key(&self, user_id: i64) -> Result<SecretKey, KeyManagerError> {
        if let Some(cache) = &self.cache {
            if let Some(mk) = cache.get(user_id) {
                return Ok(mk);
            }
        }

        let wrapped = self.storage.get_master_key(user_id).await?;
        let mk = self.unwrap_master_key(&wrapped)?;

        if let Some(cache) = &self.cache {
            cache.put(user_id, mk.clone());
        }
        Ok(mk)
    }

    /// Derive-or-verify the master key at login time.
    ///
    /// With no stored row, a fresh master key is derived from the password
    /// and salt, wrapped under the KEK, persisted, and returned. With a
    /// stored row, the row is unwrapped and compared in constant time to a
    /// candidate derived from the presented password; a mismatch is
    /// [`KeyManagerError::InvalidPassword`].
    pub async fn get_or_create_master_key(
        &self,
        user_id: i64,
        password: &str,
        salt: &[u8],
    ) -> Result<SecretKey, KeyManagerError> {
        match self.storage.get_master_key(user_id).await {
            Ok(wrapped) => self.verify_existing(user_id, &wrapped, password, salt).await,
            Err(StorageError::MasterKeyNotFound) => {
                self.generate_and_store(user_id, password, salt).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Unwrap a stored master key under the server KEK.
    fn unwrap_master_key(&self, wrapped: &StoredMasterKey) -> Result<SecretKey, KeyManagerError> {
        let mk = Zeroizing::new(open(&*self.kek, &wrapped.nonce, &wrapped.encrypted_master_key)?);
        let mk: [u8; KEY_LEN] = mk.as_slice().try_into().map_err(|_| CryptoError::OpenFailed)?;
        Ok(Zeroizing::new(mk))
    }

    async fn verify_existing(
        &self,
        user_id: i64,
        wrapped: &StoredMasterKey,
        password: &str,
        salt: &[u8],
    ) -> Result<SecretKey, KeyManagerError> {
        let mk = self.unwrap_master_key(wrapped)?;
        let candidate = derive_master_key(password.to_owned(), salt.to_vec()).await?;

        if !bool::from(mk.as_slice().ct_eq(candidate.as_slice())) {
            return Err(KeyManagerError::InvalidPassword);
        }

        if let Some(cache) = &self.cache {
            cache.put(user_id, mk.clone());
        }
        Ok(mk)
    }

    async fn generate_and_store(
        &self,
        user_id: i64,
        password: &str,
        salt: &[u8],
    ) -> Result<SecretKey, KeyManagerError> {
        let mk = derive_master_key(password.to_owned(), salt.to_vec()).await?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let wrapped = seal(&*self.kek, &nonce, &*mk)?;

        match self.storage.save_master_key(user_id, &wrapped, &nonce).await {
            Ok(_) => {
                if let Some(cache) = &self.cache {
                    cache.put(user_id, mk.clone());
                }
                Ok(mk)
            }
            // Lost a concurrent first-login race; the winner's row is
            // authoritative, so verify against it instead.
            Err(StorageError::AlreadyExists) => {
                let winner = self.storage.get_master_key(user_id).await?;
                self.verify_existing(user_id, &winner, password, salt).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Derive a 32-byte master key with Argon2id (t=3, m=64 MiB, p=4).
///
/// The derivation is memory-hard and runs on the blocking pool so it cannot
/// starve the async executor. It is never skipped and never cached across
/// calls.
async fn derive_master_key(password: String, salt: Vec<u8>) -> Result<SecretKey, CryptoError> {
    let password = Zeroizing::new(password);
    tokio::task::spawn_blocking(move || derive_master_key_blocking(password.as_bytes(), &salt))
        .await
        .map_err(|_| CryptoError::KeyDerivation)?
}

fn derive_master_key_blocking(password: &[u8], salt: &[u8]) -> Result<SecretKey, CryptoError> {
    let params = Params::new(KDF_MEM_KIB, KDF_TIME_COST, KDF_LANES, Some(KEY_LEN))
        .map_err(|_| CryptoError::KeyDerivation)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut mk = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut *mk)
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(mk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    const SALT: &[u8] = b"per-user-salt-16";

    fn test_kek() -> [u8; KEY_LEN] {
        let mut kek = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut kek);
        kek
    }

    fn manager() -> (KeyManager, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        let km = KeyManager::new(storage.clone(), test_kek());
        (km, storage)
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_master_key_blocking(b"password123", SALT).unwrap();
        let b = derive_master_key_blocking(b"password123", SALT).unwrap();
        assert_eq!(*a, *b);

        let c = derive_master_key_blocking(b"password124", SALT).unwrap();
        assert_ne!(*a, *c);

        let d = derive_master_key_blocking(b"password123", b"another-salt-xyz").unwrap();
        assert_ne!(*a, *d);
    }

    #[tokio::test]
    async fn first_login_creates_and_later_logins_reproduce() {
        let (km, storage) = manager();

        let first = km.get_or_create_master_key(1, "password123", SALT).await.unwrap();
        assert!(storage.get_master_key(1).await.is_ok());

        let second = km.get_or_create_master_key(1, "password123", SALT).await.unwrap();
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_touching_the_row() {
        let (km, storage) = manager();

        km.get_or_create_master_key(1, "hunter22aa", SALT).await.unwrap();
        let before = storage.get_master_key(1).await.unwrap();

        let result = km.get_or_create_master_key(1, "hunter22ab", SALT).await;
        assert!(matches!(result, Err(KeyManagerError::InvalidPassword)));

        let after = storage.get_master_key(1).await.unwrap();
        assert_eq!(before.encrypted_master_key, after.encrypted_master_key);
        assert_eq!(before.nonce, after.nonce);
    }

    #[tokio::test]
    async fn get_master_key_requires_an_existing_row() {
        let (km, _storage) = manager();

        let result = km.get_master_key(42).await;
        assert!(matches!(
            result,
            Err(KeyManagerError::Storage(StorageError::MasterKeyNotFound))
        ));
    }

    #[tokio::test]
    async fn get_master_key_returns_the_login_key() {
        let (km, _storage) = manager();

        let at_login = km.get_or_create_master_key(7, "longpassword", SALT).await.unwrap();
        let later = km.get_master_key(7).await.unwrap();
        assert_eq!(*at_login, *later);
    }

    #[tokio::test]
    async fn tampered_wrapped_key_fails_to_open() {
        let (km, storage) = manager();

        km.get_or_create_master_key(1, "password123", SALT).await.unwrap();

        storage.tamper_master_key(1);

        let result = km.get_master_key(1).await;
        assert!(matches!(
            result,
            Err(KeyManagerError::Crypto(CryptoError::OpenFailed))
        ));
    }

    #[tokio::test]
    async fn wrong_kek_fails_to_open() {
        let storage = Arc::new(InMemoryStorage::new());
        let km = KeyManager::new(storage.clone(), test_kek());
        km.get_or_create_master_key(1, "password123", SALT).await.unwrap();

        let other = KeyManager::new(storage, test_kek());
        let result = other.get_master_key(1).await;
        assert!(matches!(
            result,
            Err(KeyManagerError::Crypto(CryptoError::OpenFailed))
        ));
    }

    #[tokio::test]
    async fn cache_serves_repeat_lookups() {
        let storage = Arc::new(InMemoryStorage::new());
        let cache = Arc::new(MasterKeyCache::new(8, std::time::Duration::from_secs(60)));
        let km = KeyManager::new(storage.clone(), test_kek()).with_cache(cache.clone());

        let mk = km.get_or_create_master_key(1, "password123", SALT).await.unwrap();
        assert!(cache.get(1).is_some());

        // Even with the row gone, the cache still serves the key.
        storage.remove_master_key(1);
        let cached = km.get_master_key(1).await.unwrap();
        assert_eq!(*mk, *cached);
    }
}
