// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller.user_id is the authenticated user's id
//! }
//! ```
//!
//! Routes without the extractor (signup, login, ping) stay unprotected.
//! The extractor runs before any handler logic, so a missing or invalid
//! token never reaches business code.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::state::AppState;

use super::claims::verify_token;
use super::error::AuthError;
use super::JWT_HEADER;

/// Identity of an authenticated caller, bound by the session token.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Authenticated user id from the `user_id` claim.
    pub user_id: i64,
    /// The raw token the caller presented.
    pub token: String,
}

/// Extractor that validates the `jwt` header and yields a [`Caller`].
pub struct Auth(pub Caller);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(JWT_HEADER)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::MalformedToken)?;

        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = verify_token(token, state.auth_config.secret.as_bytes())?;

        Ok(Auth(Caller {
            user_id: claims.user_id,
            token: token.to_owned(),
        }))
    }
}
