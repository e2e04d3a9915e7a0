// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints: signup and login. Both are unprotected; they are how a
//! caller obtains a session token in the first place.

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::models::{AuthResponse, UserRequest};
use crate::state::AppState;

/// Register a new user.
#[utoipa::path(
    post,
    path = "/v1/user/signup",
    tag = "Users",
    request_body = UserRequest,
    responses(
        (status = 200, description = "User created", body = AuthResponse),
        (status = 400, description = "Username or password too short"),
        (status = 409, description = "Username already taken"),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state.vault.signup(&request.username, &request.password).await?;
    Ok(Json(response))
}

/// Authenticate an existing user.
///
/// On first successful login the user's wrapped master key is created;
/// later logins verify the password against it.
#[utoipa::path(
    post,
    path = "/v1/user/login",
    tag = "Users",
    request_body = UserRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state.vault.login(&request.username, &request.password).await?;
    Ok(Json(response))
}
