// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the vault API, plus the typed
//! payload variants a record can hold. All types derive `Serialize`,
//! `Deserialize`, and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Payload Sum Type
//!
//! A record is exactly one of bank card, credentials, or binary file. The
//! wire shape mirrors a protobuf one-of: an explicit `type` tag plus at
//! most one populated variant field. [`DataSaveRequest::payload`] enforces
//! that the tag and the populated variant agree.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Record Types
// =============================================================================

/// The kind of secret a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// No type given; always rejected.
    Unspecified,
    /// Bank card data.
    BankCard,
    /// Login/password pair.
    Credentials,
    /// Arbitrary binary file.
    BinaryData,
}

impl DataType {
    /// The persisted string form of the type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unspecified => "unspecified",
            DataType::BankCard => "bank_card",
            DataType::Credentials => "credentials",
            DataType::BinaryData => "binary_data",
        }
    }

    /// Parse the persisted string form.
    pub fn from_str(s: &str) -> Option<DataType> {
        match s {
            "bank_card" => Some(DataType::BankCard),
            "credentials" => Some(DataType::Credentials),
            "binary_data" => Some(DataType::BinaryData),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Unspecified
    }
}

/// Bank card payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BankCard {
    /// Card number (PAN).
    pub card_number: String,
    /// Cardholder name.
    #[serde(default)]
    pub owner: String,
    /// Expiry, freeform (e.g. "12/27").
    #[serde(default)]
    pub expires: String,
    /// Card verification value.
    #[serde(default)]
    pub cvv: String,
}

/// Login/password payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    /// Login name for the stored account.
    pub login: String,
    /// Password for the stored account.
    pub password: String,
}

/// Binary file payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileData {
    /// Original file name.
    pub name: String,
    /// MIME type.
    #[serde(rename = "type", default)]
    pub content_type: String,
    /// File contents. Plaintext on the wire, ciphertext at rest.
    #[serde(default)]
    pub data: Vec<u8>,
    /// Size in bytes; derived from `data` on responses.
    #[serde(default)]
    pub size: i64,
}

/// Non-secret display metadata attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    /// Freeform display content.
    #[serde(default)]
    pub content: String,
}

/// A record payload with its tag already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    BankCard(BankCard),
    Credentials(Credentials),
    File(FileData),
}

impl RecordPayload {
    /// The type tag this payload corresponds to.
    pub fn data_type(&self) -> DataType {
        match self {
            RecordPayload::BankCard(_) => DataType::BankCard,
            RecordPayload::Credentials(_) => DataType::Credentials,
            RecordPayload::File(_) => DataType::BinaryData,
        }
    }
}

// =============================================================================
// Requests and Responses
// =============================================================================

/// Request body for POST /v1/user/signup and /v1/user/login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRequest {
    pub username: String,
    pub password: String,
}

/// Response for signup and login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Repository-assigned user id.
    pub id: i64,
    pub username: String,
    /// Session token for the `jwt` header.
    pub token: String,
}

/// Request body for POST /v1/data.
///
/// Exactly one of the variant fields must be populated, and it must match
/// `type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DataSaveRequest {
    /// Type tag for the payload.
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_card: Option<BankCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_data: Option<FileData>,
    /// Display metadata stored alongside the ciphertext.
    #[serde(default)]
    pub meta: Meta,
}

impl DataSaveRequest {
    /// Extract the payload, enforcing that the tag and the populated
    /// variant agree and that no other variant is present.
    pub fn payload(self) -> Result<RecordPayload, PayloadMismatch> {
        let Self {
            data_type,
            bank_card,
            credentials,
            binary_data,
            ..
        } = self;

        let populated =
            usize::from(bank_card.is_some()) + usize::from(credentials.is_some()) + usize::from(binary_data.is_some());
        if populated != 1 {
            return Err(PayloadMismatch);
        }

        match (data_type, bank_card, credentials, binary_data) {
            (DataType::BankCard, Some(card), None, None) => Ok(RecordPayload::BankCard(card)),
            (DataType::Credentials, None, Some(creds), None) => Ok(RecordPayload::Credentials(creds)),
            (DataType::BinaryData, None, None, Some(file)) => Ok(RecordPayload::File(file)),
            _ => Err(PayloadMismatch),
        }
    }
}

/// The type tag and the populated variant disagree.
#[derive(Debug, PartialEq, Eq)]
pub struct PayloadMismatch;

/// Response for POST /v1/data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataSaveResponse {
    pub message: String,
}

/// One listed record (no payload).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordListItem {
    pub id: i64,
    /// Type tag as a string.
    #[serde(rename = "type")]
    pub data_type: String,
    pub meta: Meta,
    /// Creation time, formatted `dd.MM.yyyy HH:mm`.
    pub created_at: String,
}

/// Response for GET /v1/data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataListResponse {
    pub records: Vec<RecordListItem>,
    pub count: i64,
}

/// Response for GET /v1/data/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataViewResponse {
    /// Type tag for the payload.
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_card: Option<BankCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_data: Option<FileData>,
}

/// Response for DELETE /v1/data/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataDeleteResponse {
    pub message: String,
}

/// Response for GET /v1/ping.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub message: String,
}
