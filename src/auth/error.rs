// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No `jwt` header present, or it is empty
    MissingToken,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid or uses a non-HMAC algorithm
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// The `user_id` claim is absent or not numeric
    InvalidUserIdClaim,
    /// Token signing failed
    TokenCreation,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidUserIdClaim => "invalid_user_id_claim",
            AuthError::TokenCreation => "token_creation_failed",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::InvalidUserIdClaim => StatusCode::BAD_REQUEST,
            AuthError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "missing jwt"),
            AuthError::MalformedToken => write!(f, "token is malformed"),
            AuthError::InvalidSignature => write!(f, "invalid jwt"),
            AuthError::TokenExpired => write!(f, "token has expired"),
            AuthError::InvalidUserIdClaim => write!(f, "user_id not found or not a number"),
            AuthError::TokenCreation => write!(f, "failed to generate token"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_token_returns_401() {
        let response = AuthError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_token");
    }

    #[tokio::test]
    async fn non_numeric_user_id_returns_400() {
        let response = AuthError::InvalidUserIdClaim.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
