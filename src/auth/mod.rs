// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens are HMAC-SHA256-signed JWS issued at signup and login.
//!
//! ## Auth Flow
//!
//! 1. Client completes Signup or Login and receives a token carrying
//!    `user_id`, `name`, and `iat`
//! 2. Client sends the token on every protected call in the `jwt` header
//! 3. The [`Auth`] extractor on protected routes:
//!    - rejects absent or empty headers
//!    - verifies the HS256 signature with the configured secret, rejecting
//!      any other signing algorithm
//!    - requires a numeric `user_id` claim
//!    - hands the handler a typed [`Caller`] bound to that user id
//!
//! Unprotected routes (signup, login, ping) simply take no extractor.

pub mod claims;
pub mod error;
pub mod extractor;

pub use claims::{issue_token, verify_token, TokenClaims};
pub use error::AuthError;
pub use extractor::{Auth, Caller};

/// Request header carrying the session token.
pub const JWT_HEADER: &str = "jwt";
