// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Two capability traits abstract the durable stores:
//!
//! - [`VaultStorage`] - relational rows for users, wrapped master keys, and
//!   encrypted records (PostgreSQL in production, in-memory in tests)
//! - [`ObjectStore`] - opaque blobs for binary records (S3-compatible in
//!   production, in-memory in tests)
//!
//! Everything persisted through these traits is ciphertext plus nonces.
//! Plaintext payloads and plaintext keys never reach either store.

pub mod memory;
pub mod objects;
pub mod postgres;
pub mod s3;

pub use memory::{InMemoryObjectStore, InMemoryStorage};
pub use objects::{ObjectInfo, ObjectStore, UploadOptions};
pub use postgres::PostgresStorage;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Error type for storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// No user with the requested username.
    UserNotFound,
    /// No wrapped master key row for the user.
    MasterKeyNotFound,
    /// No encrypted record with the requested id.
    RecordNotFound,
    /// Unique constraint violation (duplicate username or master key row).
    AlreadyExists,
    /// No object with the requested name in the blob store.
    ObjectNotFound(String),
    /// Blob store I/O failure.
    Object(String),
    /// Relational store failure.
    Database(sqlx::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::UserNotFound => write!(f, "user not found"),
            StorageError::MasterKeyNotFound => write!(f, "master key not found"),
            StorageError::RecordNotFound => write!(f, "record not found"),
            StorageError::AlreadyExists => write!(f, "already exists"),
            StorageError::ObjectNotFound(name) => write!(f, "object not found: {name}"),
            StorageError::Object(msg) => write!(f, "object store error: {msg}"),
            StorageError::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A user row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredUser {
    /// Repository-assigned id.
    pub id: i64,
    /// Unique, case-sensitive username.
    pub username: String,
    /// bcrypt verifier for the login password.
    pub password_hash: String,
    /// Per-user KDF salt, generated at signup.
    pub salt: Vec<u8>,
}

/// A wrapped master key row: the MK sealed under the server KEK.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredMasterKey {
    /// AEAD ciphertext of the 32-byte master key.
    pub encrypted_master_key: Vec<u8>,
    /// Nonce used for the wrap.
    pub nonce: Vec<u8>,
}

/// An encrypted record as persisted.
///
/// For `binary_data` records `encrypted_data` is empty and `minio_object_id`
/// names the blob holding the ciphertext; for inline records it is the other
/// way around.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRecord {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub data_type: String,
    pub minio_object_id: String,
    pub encrypted_data: Vec<u8>,
    pub data_nonce: Vec<u8>,
    pub encrypted_dek: Vec<u8>,
    pub dek_nonce: Vec<u8>,
    pub meta: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new encrypted record.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub user_id: i64,
    pub data_type: String,
    pub minio_object_id: String,
    pub encrypted_data: Vec<u8>,
    pub data_nonce: Vec<u8>,
    pub encrypted_dek: Vec<u8>,
    pub dek_nonce: Vec<u8>,
    pub meta: String,
}

/// Listing summary for a record (no ciphertext).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordSummary {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub data_type: String,
    pub meta: String,
    pub created_at: DateTime<Utc>,
}

/// Contract for the relational store.
///
/// Absent rows surface as the distinct `*NotFound` variants; unique
/// violations surface as [`StorageError::AlreadyExists`].
#[async_trait]
pub trait VaultStorage: Send + Sync {
    /// Insert a new user. Returns the assigned id.
    async fn add_user(&self, username: &str, password_hash: &str, salt: &[u8]) -> StorageResult<i64>;

    /// Fetch a user by username.
    async fn get_user(&self, username: &str) -> StorageResult<StoredUser>;

    /// Store the wrapped master key for a user. At most one row per user;
    /// a concurrent duplicate insert surfaces as `AlreadyExists`.
    async fn save_master_key(&self, user_id: i64, encrypted_mk: &[u8], nonce: &[u8]) -> StorageResult<i64>;

    /// Fetch the wrapped master key for a user.
    async fn get_master_key(&self, user_id: i64) -> StorageResult<StoredMasterKey>;

    /// Insert an encrypted record. Returns the assigned id.
    async fn save_user_data(&self, record: &NewRecord) -> StorageResult<i64>;

    /// Fetch an encrypted record by id.
    async fn get_user_data(&self, record_id: i64) -> StorageResult<StoredRecord>;

    /// List record summaries for a user, newest id first.
    async fn get_user_data_list(&self, user_id: i64) -> StorageResult<Vec<RecordSummary>>;

    /// Delete a record by id.
    async fn delete_user_data(&self, record_id: i64) -> StorageResult<()>;
}
