// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory implementations of the storage traits.
//!
//! Used by the test suite and for local development without PostgreSQL or
//! an S3 endpoint. Semantics mirror the production backends: distinct
//! not-found errors, unique-constraint conflicts, and id assignment.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::objects::{ObjectInfo, ObjectStore, UploadOptions};
use super::{
    NewRecord, RecordSummary, StorageError, StorageResult, StoredMasterKey, StoredRecord,
    StoredUser, VaultStorage,
};

#[derive(Default)]
struct Tables {
    users: Vec<StoredUser>,
    master_keys: HashMap<i64, StoredMasterKey>,
    records: HashMap<i64, StoredRecord>,
    next_user_id: i64,
    next_record_id: i64,
}

/// In-memory relational store.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only happens after a panic in another test thread.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
impl InMemoryStorage {
    /// Flip a bit in the stored wrapped master key (tamper simulation).
    pub fn tamper_master_key(&self, user_id: i64) {
        let mut tables = self.lock();
        if let Some(mk) = tables.master_keys.get_mut(&user_id) {
            mk.encrypted_master_key[0] ^= 0x01;
        }
    }

    /// Drop the wrapped master key row for a user.
    pub fn remove_master_key(&self, user_id: i64) {
        self.lock().master_keys.remove(&user_id);
    }

    /// Flip a bit in a stored record's inline ciphertext (tamper simulation).
    pub fn tamper_record_ciphertext(&self, record_id: i64) {
        let mut tables = self.lock();
        if let Some(record) = tables.records.get_mut(&record_id) {
            record.encrypted_data[0] ^= 0x01;
        }
    }
}

#[async_trait]
impl VaultStorage for InMemoryStorage {
    async fn add_user(&self, username: &str, password_hash: &str, salt: &[u8]) -> StorageResult<i64> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.username == username) {
            return Err(StorageError::AlreadyExists);
        }
        tables.next_user_id += 1;
        let id = tables.next_user_id;
        tables.users.push(StoredUser {
            id,
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            salt: salt.to_vec(),
        });
        Ok(id)
    }

    async fn get_user(&self, username: &str) -> StorageResult<StoredUser> {
        self.lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(StorageError::UserNotFound)
    }

    async fn save_master_key(&self, user_id: i64, encrypted_mk: &[u8], nonce: &[u8]) -> StorageResult<i64> {
        let mut tables = self.lock();
        if tables.master_keys.contains_key(&user_id) {
            return Err(StorageError::AlreadyExists);
        }
        tables.master_keys.insert(
            user_id,
            StoredMasterKey {
                encrypted_master_key: encrypted_mk.to_vec(),
                nonce: nonce.to_vec(),
            },
        );
        Ok(user_id)
    }

    async fn get_master_key(&self, user_id: i64) -> StorageResult<StoredMasterKey> {
        self.lock()
            .master_keys
            .get(&user_id)
            .cloned()
            .ok_or(StorageError::MasterKeyNotFound)
    }

    async fn save_user_data(&self, record: &NewRecord) -> StorageResult<i64> {
        let mut tables = self.lock();
        tables.next_record_id += 1;
        let id = tables.next_record_id;
        tables.records.insert(
            id,
            StoredRecord {
                id,
                user_id: record.user_id,
                data_type: record.data_type.clone(),
                minio_object_id: record.minio_object_id.clone(),
                encrypted_data: record.encrypted_data.clone(),
                data_nonce: record.data_nonce.clone(),
                encrypted_dek: record.encrypted_dek.clone(),
                dek_nonce: record.dek_nonce.clone(),
                meta: record.meta.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_user_data(&self, record_id: i64) -> StorageResult<StoredRecord> {
        self.lock()
            .records
            .get(&record_id)
            .cloned()
            .ok_or(StorageError::RecordNotFound)
    }

    async fn get_user_data_list(&self, user_id: i64) -> StorageResult<Vec<RecordSummary>> {
        let tables = self.lock();
        let mut summaries: Vec<RecordSummary> = tables
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| RecordSummary {
                id: r.id,
                user_id: r.user_id,
                data_type: r.data_type.clone(),
                meta: r.meta.clone(),
                created_at: r.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(summaries)
    }

    async fn delete_user_data(&self, record_id: i64) -> StorageResult<()> {
        self.lock()
            .records
            .remove(&record_id)
            .map(|_| ())
            .ok_or(StorageError::RecordNotFound)
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, ObjectInfo)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored objects.
    pub fn object_ids(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, object_id: &str, data: &[u8], options: &UploadOptions) -> StorageResult<()> {
        let info = ObjectInfo {
            content_type: options.content_type.clone(),
            user_metadata: options.user_metadata.clone(),
        };
        self.objects
            .lock()
            .map_err(|_| StorageError::Object("lock poisoned".into()))?
            .insert(object_id.to_owned(), (data.to_vec(), info));
        Ok(())
    }

    async fn get_object(&self, object_id: &str) -> StorageResult<(Vec<u8>, ObjectInfo)> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Object("lock poisoned".into()))?
            .get(object_id)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(object_id.to_owned()))
    }

    async fn delete_object(&self, object_id: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Object("lock poisoned".into()))?
            .remove(object_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_user_assigns_ids_and_rejects_duplicates() {
        let storage = InMemoryStorage::new();

        let id1 = storage.add_user("alice", "hash-a", b"salt").await.unwrap();
        let id2 = storage.add_user("bob", "hash-b", b"salt").await.unwrap();
        assert_ne!(id1, id2);

        let result = storage.add_user("alice", "hash-c", b"salt").await;
        assert!(matches!(result, Err(StorageError::AlreadyExists)));

        // The prior row is untouched.
        let alice = storage.get_user("alice").await.unwrap();
        assert_eq!(alice.password_hash, "hash-a");
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive() {
        let storage = InMemoryStorage::new();
        storage.add_user("alice", "h", b"s").await.unwrap();

        assert!(matches!(
            storage.get_user("Alice").await,
            Err(StorageError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn master_key_is_write_once() {
        let storage = InMemoryStorage::new();

        storage.save_master_key(1, b"wrapped", b"nonce").await.unwrap();
        let result = storage.save_master_key(1, b"other", b"nonce2").await;
        assert!(matches!(result, Err(StorageError::AlreadyExists)));

        let stored = storage.get_master_key(1).await.unwrap();
        assert_eq!(stored.encrypted_master_key, b"wrapped");
    }

    #[tokio::test]
    async fn record_listing_is_per_user_and_newest_first() {
        let storage = InMemoryStorage::new();

        for user_id in [1, 1, 2, 1] {
            storage
                .save_user_data(&NewRecord {
                    user_id,
                    data_type: "credentials".into(),
                    data_nonce: vec![0; 12],
                    encrypted_dek: vec![0; 48],
                    dek_nonce: vec![0; 12],
                    meta: "{}".into(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let list = storage.get_user_data_list(1).await.unwrap();
        assert_eq!(list.len(), 3);
        let ids: Vec<i64> = list.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 1]);

        assert_eq!(storage.get_user_data_list(2).await.unwrap().len(), 1);
        assert!(storage.get_user_data_list(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let storage = InMemoryStorage::new();
        let id = storage
            .save_user_data(&NewRecord {
                user_id: 1,
                data_type: "bank_card".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        storage.delete_user_data(id).await.unwrap();
        assert!(matches!(
            storage.get_user_data(id).await,
            Err(StorageError::RecordNotFound)
        ));
        assert!(matches!(
            storage.delete_user_data(id).await,
            Err(StorageError::RecordNotFound)
        ));
    }

    #[tokio::test]
    async fn object_store_roundtrip() {
        let objects = InMemoryObjectStore::new();

        let mut metadata = HashMap::new();
        metadata.insert("original-name".to_string(), "a.bin".to_string());

        objects
            .upload(
                "1700000000-a.bin",
                &[0x00, 0x01, 0x02, 0x03],
                &UploadOptions {
                    content_type: "application/octet-stream".into(),
                    user_metadata: metadata,
                },
            )
            .await
            .unwrap();

        let (data, info) = objects.get_object("1700000000-a.bin").await.unwrap();
        assert_eq!(data, vec![0x00, 0x01, 0x02, 0x03]);
        assert_eq!(info.content_type, "application/octet-stream");
        assert_eq!(info.user_metadata["original-name"], "a.bin");

        assert!(matches!(
            objects.get_object("missing").await,
            Err(StorageError::ObjectNotFound(_))
        ));
    }
}
