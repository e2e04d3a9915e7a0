// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Object store capability.
//!
//! Binary record payloads are too large for inline rows, so their
//! ciphertext lives in an S3-compatible blob store keyed by an object name
//! the core chooses at save time. Only ciphertext crosses this boundary.

use std::collections::HashMap;

use async_trait::async_trait;

use super::StorageResult;

/// User-metadata key for the original file name.
pub const META_ORIGINAL_NAME: &str = "original-name";
/// User-metadata key for the caller-supplied meta content.
pub const META_CONTENT: &str = "meta-content";
/// User-metadata key for the RFC 3339 upload timestamp.
pub const META_UPLOAD_TIME: &str = "upload-time";
/// User-metadata key marking the object as ciphertext.
pub const META_IS_ENCRYPTED: &str = "is-encrypted";

/// Options attached to an object upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// MIME type of the (plaintext) file.
    pub content_type: String,
    /// Opaque user metadata stored alongside the object.
    pub user_metadata: HashMap<String, String>,
}

/// Metadata returned with a fetched object.
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    /// MIME type recorded at upload.
    pub content_type: String,
    /// User metadata recorded at upload.
    pub user_metadata: HashMap<String, String>,
}

/// Contract for the blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object. Object names are chosen by the caller and globally
    /// unique; overwrites are not expected.
    async fn upload(&self, object_id: &str, data: &[u8], options: &UploadOptions) -> StorageResult<()>;

    /// Fetch an object and its metadata by name.
    async fn get_object(&self, object_id: &str) -> StorageResult<(Vec<u8>, ObjectInfo)>;

    /// Delete an object by name. Used for best-effort garbage collection.
    async fn delete_object(&self, object_id: &str) -> StorageResult<()>;
}
