// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PostgreSQL-backed relational store.
//!
//! Rows hold ciphertexts and nonces only. Inserts that can race (usernames,
//! the one-per-user master key row) rely on unique constraints plus
//! `ON CONFLICT DO NOTHING`, so a conflict surfaces as `AlreadyExists`
//! instead of a database error.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{
    NewRecord, RecordSummary, StorageError, StorageResult, StoredMasterKey, StoredRecord,
    StoredUser, VaultStorage,
};

/// Maximum connections in the shared pool.
const MAX_CONNECTIONS: u32 = 10;

/// PostgreSQL storage over a shared connection pool.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to the database and apply embedded migrations.
    pub async fn connect(dsn: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(dsn)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Database(sqlx::Error::Migrate(Box::new(e))))?;

        Ok(Self { pool })
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl VaultStorage for PostgresStorage {
    async fn add_user(&self, username: &str, password_hash: &str, salt: &[u8]) -> StorageResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO users (username, password_hash, salt, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (username) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(salt)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id,)| id).ok_or(StorageError::AlreadyExists)
    }

    async fn get_user(&self, username: &str) -> StorageResult<StoredUser> {
        sqlx::query_as::<_, StoredUser>(
            "SELECT id, username, password_hash, salt FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::UserNotFound)
    }

    async fn save_master_key(&self, user_id: i64, encrypted_mk: &[u8], nonce: &[u8]) -> StorageResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO user_keys (user_id, encrypted_master_key, nonce)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(encrypted_mk)
        .bind(nonce)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id,)| id).ok_or(StorageError::AlreadyExists)
    }

    async fn get_master_key(&self, user_id: i64) -> StorageResult<StoredMasterKey> {
        sqlx::query_as::<_, StoredMasterKey>(
            "SELECT encrypted_master_key, nonce FROM user_keys WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::MasterKeyNotFound)
    }

    async fn save_user_data(&self, record: &NewRecord) -> StorageResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO user_data
                (user_id, type, minio_object_id, encrypted_data, data_nonce, encrypted_dek, dek_nonce, meta)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(record.user_id)
        .bind(&record.data_type)
        .bind(&record.minio_object_id)
        .bind(&record.encrypted_data)
        .bind(&record.data_nonce)
        .bind(&record.encrypted_dek)
        .bind(&record.dek_nonce)
        .bind(&record.meta)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_user_data(&self, record_id: i64) -> StorageResult<StoredRecord> {
        sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT id, user_id, type, minio_object_id, encrypted_data,
                   data_nonce, encrypted_dek, dek_nonce, meta, created_at
            FROM user_data
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::RecordNotFound)
    }

    async fn get_user_data_list(&self, user_id: i64) -> StorageResult<Vec<RecordSummary>> {
        let summaries = sqlx::query_as::<_, RecordSummary>(
            r#"
            SELECT id, user_id, type, meta, created_at
            FROM user_data
            WHERE user_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    async fn delete_user_data(&self, record_id: i64) -> StorageResult<()> {
        let row: Option<(i64,)> = sqlx::query_as("DELETE FROM user_data WHERE id = $1 RETURNING id")
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|_| ()).ok_or(StorageError::RecordNotFound)
    }
}
