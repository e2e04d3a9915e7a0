// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token issuance and verification.
//!
//! Tokens are HS256 JWS with the claim set `{user_id, name, iat}`. No
//! expiry claim is issued; if a token does carry one, it is honored during
//! verification.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Repository-assigned user id.
    pub user_id: i64,
    /// Username at issue time.
    pub name: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
}

/// Issue a signed session token for the given user.
pub fn issue_token(user_id: i64, username: &str, secret: &[u8]) -> Result<String, AuthError> {
    let claims = TokenClaims {
        user_id,
        name: username.to_owned(),
        iat: Utc::now().timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|_| AuthError::TokenCreation)
}

/// Verify a session token and extract its claims.
///
/// Only HS256 signatures are accepted. The `user_id` claim must be numeric;
/// `name` and `iat` are read leniently since the signature already covers
/// them.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // `exp` is optional for session tokens; honor it only when present.
    validation.required_spec_claims.clear();
    validation.validate_exp = true;

    let data = decode::<serde_json::Value>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature
            | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm
            | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName => AuthError::InvalidSignature,
            _ => AuthError::MalformedToken,
        })?;

    let user_id = data
        .claims
        .get("user_id")
        .and_then(serde_json::Value::as_i64)
        .ok_or(AuthError::InvalidUserIdClaim)?;

    Ok(TokenClaims {
        user_id,
        name: data
            .claims
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        iat: data
            .claims
            .get("iat")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or_default(),
    })
}
