// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! S3-compatible blob store client.
//!
//! Talks to any S3-compatible endpoint (MinIO in the reference deployment)
//! with path-style addressing and static credentials. The bucket is created
//! lazily the first time the client is constructed.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;

use crate::config::S3Config;

use super::objects::{ObjectInfo, ObjectStore, UploadOptions};
use super::{StorageError, StorageResult};

/// Region name sent to S3-compatible endpoints that ignore regions.
const DEFAULT_REGION: &str = "us-east-1";

/// Blob store backed by an S3-compatible service.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client for the configured endpoint and ensure the bucket
    /// exists, creating it when absent.
    pub async fn connect(cfg: &S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            cfg.access_key.clone(),
            cfg.secret_key.clone(),
            None,
            None,
            "gophkeeper-static",
        );

        let conf = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(DEFAULT_REGION))
            .endpoint_url(cfg.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let store = Self {
            client: aws_sdk_s3::Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    async fn ensure_bucket(&self) -> StorageResult<()> {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return Ok(());
        }
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Object(format!("failed to create bucket {}: {e}", self.bucket)))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, object_id: &str, data: &[u8], options: &UploadOptions) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_id)
            .body(ByteStream::from(data.to_vec()))
            .content_type(&options.content_type)
            .set_metadata(Some(options.user_metadata.clone()))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Object(format!("failed to upload {object_id}: {e}")))
    }

    async fn get_object(&self, object_id: &str) -> StorageResult<(Vec<u8>, ObjectInfo)> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    StorageError::ObjectNotFound(object_id.to_owned())
                } else {
                    StorageError::Object(format!("failed to get {object_id}: {e}"))
                }
            })?;

        let info = ObjectInfo {
            content_type: output
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned(),
            user_metadata: output.metadata().cloned().unwrap_or_default(),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Object(format!("failed to read {object_id}: {e}")))?
            .into_bytes()
            .to_vec();

        Ok((data, info))
    }

    async fn delete_object(&self, object_id: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_id)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Object(format!("failed to delete {object_id}: {e}")))
    }
}
