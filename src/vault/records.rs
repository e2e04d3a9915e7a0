// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record operations: DataSave, DataView, DataList, DataDelete.
//!
//! Inline payloads (bank cards, credentials) are serialized with bincode
//! and sealed into the row itself. Binary payloads are sealed and shipped
//! to the blob store; the row then carries only the object name plus the
//! nonces and wrapped DEK needed to open the blob later.

use std::collections::HashMap;

use chrono::Utc;

use crate::auth::Caller;
use crate::crypto::envelope::{decrypt_user_data, encrypt_user_data, EncryptedPayload};
use crate::crypto::SecretKey;
use crate::models::{
    BankCard, Credentials, DataDeleteResponse, DataListResponse, DataSaveRequest, DataSaveResponse,
    DataType, DataViewResponse, FileData, Meta, RecordListItem, RecordPayload,
};
use crate::storage::objects::{
    META_CONTENT, META_IS_ENCRYPTED, META_ORIGINAL_NAME, META_UPLOAD_TIME,
};
use crate::storage::{NewRecord, StorageError, StoredRecord, UploadOptions};

use super::{VaultError, VaultService};

/// Display format for record creation times.
const CREATED_AT_FORMAT: &str = "%d.%m.%Y %H:%M";

impl VaultService {
    /// Encrypt and persist one record for the caller.
    pub async fn data_save(&self, caller: &Caller, request: DataSaveRequest) -> Result<DataSaveResponse, VaultError> {
        if request.data_type == DataType::Unspecified {
            return Err(VaultError::InvalidArgument("data type not specified".into()));
        }

        let meta = request.meta.clone();
        let payload = request.payload().map_err(|_| {
            VaultError::InvalidArgument("payload does not match the declared data type".into())
        })?;

        let mk = self.key_manager.get_master_key(caller.user_id).await?;

        let meta_text = serde_json::to_string(&meta)
            .map_err(|e| VaultError::Internal(format!("failed to serialize meta: {e}")))?;

        let data_type = payload.data_type();
        match payload {
            RecordPayload::BankCard(card) => {
                let serialized = bincode::serialize(&card)
                    .map_err(|e| VaultError::Internal(format!("failed to serialize payload: {e}")))?;
                self.save_inline(caller.user_id, data_type, &mk, &serialized, meta_text).await?;
            }
            RecordPayload::Credentials(credentials) => {
                let serialized = bincode::serialize(&credentials)
                    .map_err(|e| VaultError::Internal(format!("failed to serialize payload: {e}")))?;
                self.save_inline(caller.user_id, data_type, &mk, &serialized, meta_text).await?;
            }
            RecordPayload::File(file) => {
                self.save_binary(caller.user_id, &mk, file, &meta, meta_text).await?;
            }
        }

        Ok(DataSaveResponse {
            message: format!("data of type {data_type} saved successfully"),
        })
    }

    /// Fetch, authorize, and decrypt one record.
    pub async fn data_view(&self, caller: &Caller, record_id: i64) -> Result<DataViewResponse, VaultError> {
        let record = match self.storage.get_user_data(record_id).await {
            Ok(record) => record,
            // No record-existence oracle: absent rows read the same as
            // fetch failures.
            Err(StorageError::RecordNotFound) => {
                return Err(VaultError::Internal("failed to fetch record".into()))
            }
            Err(e) => return Err(e.into()),
        };

        if record.user_id != caller.user_id {
            return Err(VaultError::PermissionDenied);
        }

        let mk = self.key_manager.get_master_key(caller.user_id).await?;

        let data_type = DataType::from_str(&record.data_type)
            .ok_or_else(|| VaultError::InvalidArgument(format!("unsupported data type: {}", record.data_type)))?;

        let meta: Meta = serde_json::from_str(&record.meta)
            .map_err(|e| VaultError::Internal(format!("failed to parse record meta: {e}")))?;

        let mut response = DataViewResponse {
            data_type,
            meta,
            bank_card: None,
            credentials: None,
            binary_data: None,
        };

        match data_type {
            DataType::BinaryData => {
                let (blob, info) = self
                    .objects
                    .get_object(&record.minio_object_id)
                    .await
                    .map_err(|e| VaultError::Internal(format!("failed to fetch object: {e}")))?;

                // Inject the blob ciphertext into the in-memory record; the
                // persisted row stays empty.
                let plaintext = decrypt_user_data(
                    &EncryptedPayload {
                        ciphertext: blob,
                        data_nonce: record.data_nonce.clone(),
                        wrapped_dek: record.encrypted_dek.clone(),
                        dek_nonce: record.dek_nonce.clone(),
                    },
                    &*mk,
                )?;

                let name = info
                    .user_metadata
                    .get(META_ORIGINAL_NAME)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .unwrap_or_else(|| record.minio_object_id.clone());

                response.binary_data = Some(FileData {
                    name,
                    content_type: info.content_type,
                    size: plaintext.len() as i64,
                    data: plaintext,
                });
            }
            DataType::BankCard => {
                let plaintext = decrypt_inline(&record, &mk)?;
                let card: BankCard = bincode::deserialize(&plaintext)
                    .map_err(|_| VaultError::Internal("failed to parse bank card".into()))?;
                response.bank_card = Some(card);
            }
            DataType::Credentials => {
                let plaintext = decrypt_inline(&record, &mk)?;
                let credentials: Credentials = bincode::deserialize(&plaintext)
                    .map_err(|_| VaultError::Internal("failed to parse credentials".into()))?;
                response.credentials = Some(credentials);
            }
            DataType::Unspecified => {
                return Err(VaultError::InvalidArgument("unsupported data type".into()))
            }
        }

        Ok(response)
    }

    /// List the caller's records, newest first.
    ///
    /// Rows whose meta fails to parse are dropped with a log entry; they
    /// never fail the request.
    pub async fn data_list(&self, caller: &Caller) -> Result<DataListResponse, VaultError> {
        let summaries = self.storage.get_user_data_list(caller.user_id).await?;

        let mut records = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let meta: Meta = match serde_json::from_str(&summary.meta) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::error!(record_id = summary.id, error = %e, "failed to parse record meta, skipping");
                    continue;
                }
            };

            records.push(RecordListItem {
                id: summary.id,
                data_type: summary.data_type,
                meta,
                created_at: summary.created_at.format(CREATED_AT_FORMAT).to_string(),
            });
        }

        let count = records.len() as i64;
        Ok(DataListResponse { records, count })
    }

    /// Delete one of the caller's records.
    pub async fn data_delete(&self, caller: &Caller, record_id: i64) -> Result<DataDeleteResponse, VaultError> {
        let record = match self.storage.get_user_data(record_id).await {
            Ok(record) => record,
            Err(StorageError::RecordNotFound) => {
                return Err(VaultError::Internal("failed to fetch record".into()))
            }
            Err(e) => return Err(e.into()),
        };

        if record.user_id != caller.user_id {
            return Err(VaultError::PermissionDenied);
        }

        self.storage.delete_user_data(record_id).await?;

        // Best-effort garbage collection of the blob; the row is already
        // gone, so a failure here only leaks storage, not data.
        if !record.minio_object_id.is_empty() {
            if let Err(e) = self.objects.delete_object(&record.minio_object_id).await {
                tracing::warn!(object_id = %record.minio_object_id, error = %e, "failed to delete blob");
            }
        }

        Ok(DataDeleteResponse { message: "ok".into() })
    }

    async fn save_inline(
        &self,
        user_id: i64,
        data_type: DataType,
        mk: &SecretKey,
        plaintext: &[u8],
        meta: String,
    ) -> Result<(), VaultError> {
        let encrypted = encrypt_user_data(&**mk, plaintext)?;

        self.storage
            .save_user_data(&NewRecord {
                user_id,
                data_type: data_type.as_str().to_owned(),
                minio_object_id: String::new(),
                encrypted_data: encrypted.ciphertext,
                data_nonce: encrypted.data_nonce,
                encrypted_dek: encrypted.wrapped_dek,
                dek_nonce: encrypted.dek_nonce,
                meta,
            })
            .await?;
        Ok(())
    }

    async fn save_binary(
        &self,
        user_id: i64,
        mk: &SecretKey,
        file: FileData,
        meta: &Meta,
        meta_text: String,
    ) -> Result<(), VaultError> {
        let encrypted = encrypt_user_data(&**mk, &file.data)?;

        let object_id = format!(
            "{}-{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            file.name
        );

        let mut user_metadata = HashMap::new();
        user_metadata.insert(META_ORIGINAL_NAME.to_owned(), file.name.clone());
        user_metadata.insert(META_CONTENT.to_owned(), meta.content.clone());
        user_metadata.insert(META_UPLOAD_TIME.to_owned(), Utc::now().to_rfc3339());
        user_metadata.insert(META_IS_ENCRYPTED.to_owned(), "true".to_owned());

        self.objects
            .upload(
                &object_id,
                &encrypted.ciphertext,
                &UploadOptions {
                    content_type: file.content_type.clone(),
                    user_metadata,
                },
            )
            .await?;

        self.storage
            .save_user_data(&NewRecord {
                user_id,
                data_type: DataType::BinaryData.as_str().to_owned(),
                minio_object_id: object_id,
                encrypted_data: Vec::new(),
                data_nonce: encrypted.data_nonce,
                encrypted_dek: encrypted.wrapped_dek,
                dek_nonce: encrypted.dek_nonce,
                meta: meta_text,
            })
            .await?;
        Ok(())
    }
}

fn decrypt_inline(record: &StoredRecord, mk: &SecretKey) -> Result<Vec<u8>, VaultError> {
    let plaintext = decrypt_user_data(
        &EncryptedPayload {
            ciphertext: record.encrypted_data.clone(),
            data_nonce: record.data_nonce.clone(),
            wrapped_dek: record.encrypted_dek.clone(),
            dek_nonce: record.dek_nonce.clone(),
        },
        &**mk,
    )?;
    Ok(plaintext)
}
