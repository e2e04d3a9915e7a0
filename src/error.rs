// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Error Handling
//!
//! This module provides a unified error type for all API responses.
//! Errors are automatically converted to JSON responses with appropriate
//! HTTP status codes.
//!
//! ## JSON Response Format
//!
//! All errors are returned as JSON with a single `error` field:
//!
//! ```json
//! { "error": "you do not own the requested record" }
//! ```
//!
//! Vault failures map onto statuses without leaking internals: crypto and
//! storage failures all surface as plain 500s, with detail only in the
//! server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::vault::VaultError;

/// API error with HTTP status and message.
///
/// This type implements `IntoResponse`, allowing it to be returned directly
/// from Axum handlers. The error is serialized as JSON.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code for the response.
    pub status: StatusCode,
    /// Human-readable error message (included in JSON response).
    pub message: String,
}

/// JSON body structure for error responses.
#[derive(Serialize)]
struct ErrorBody {
    /// The error message.
    error: String,
}

impl ApiError {
    /// Create a new API error with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a 403 Forbidden error.
    ///
    /// Use when the user is authenticated but lacks permission.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a 409 Conflict error.
    ///
    /// Use for unique-constraint conflicts such as a taken username.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Create a 500 Internal Server Error.
    ///
    /// Use for unexpected server-side failures. Avoid exposing internal details.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::InvalidArgument(msg) => ApiError::bad_request(msg),
            VaultError::InvalidCredentials => ApiError::unauthorized("invalid credentials"),
            VaultError::PermissionDenied => {
                ApiError::forbidden("you do not own the requested record")
            }
            VaultError::NotFound => ApiError::not_found("not found"),
            VaultError::AlreadyExists => ApiError::conflict("user already exists"),
            VaultError::CredentialSetup => ApiError::internal("failed to set up credentials"),
            VaultError::Crypto(e) => {
                tracing::error!(error = %e, "cryptographic failure");
                ApiError::internal("internal error")
            }
            VaultError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                ApiError::internal("internal error")
            }
            VaultError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                ApiError::internal(msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    /// Convert the error into an Axum HTTP response.
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let conflict = ApiError::conflict("taken");
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let unauthorized = ApiError::unauthorized("no");
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn vault_errors_map_to_expected_statuses() {
        use crate::crypto::CryptoError;

        let cases = [
            (VaultError::InvalidArgument("bad".into()), StatusCode::BAD_REQUEST),
            (VaultError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (VaultError::PermissionDenied, StatusCode::FORBIDDEN),
            (VaultError::NotFound, StatusCode::NOT_FOUND),
            (VaultError::AlreadyExists, StatusCode::CONFLICT),
            (VaultError::CredentialSetup, StatusCode::INTERNAL_SERVER_ERROR),
            (VaultError::Crypto(CryptoError::OpenFailed), StatusCode::INTERNAL_SERVER_ERROR),
            (VaultError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn crypto_failures_do_not_leak_detail() {
        use crate::crypto::CryptoError;

        let api_error = ApiError::from(VaultError::Crypto(CryptoError::OpenFailed));
        assert_eq!(api_error.message, "internal error");
    }
}
