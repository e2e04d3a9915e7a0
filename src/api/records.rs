// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record endpoints. All of them require the `jwt` header; the [`Auth`]
//! extractor rejects the request before any handler logic runs.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{
    DataDeleteResponse, DataListResponse, DataSaveRequest, DataSaveResponse, DataViewResponse,
};
use crate::state::AppState;

/// Encrypt and store one record.
#[utoipa::path(
    post,
    path = "/v1/data",
    tag = "Data",
    request_body = DataSaveRequest,
    security(("jwt" = [])),
    responses(
        (status = 200, description = "Record saved", body = DataSaveResponse),
        (status = 400, description = "Unspecified type or payload/tag mismatch"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn data_save(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<DataSaveRequest>,
) -> Result<Json<DataSaveResponse>, ApiError> {
    let response = state.vault.data_save(&caller, request).await?;
    Ok(Json(response))
}

/// List the caller's records, newest first.
#[utoipa::path(
    get,
    path = "/v1/data",
    tag = "Data",
    security(("jwt" = [])),
    responses(
        (status = 200, description = "Record summaries", body = DataListResponse),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn data_list(
    State(state): State<AppState>,
    Auth(caller): Auth,
) -> Result<Json<DataListResponse>, ApiError> {
    let response = state.vault.data_list(&caller).await?;
    Ok(Json(response))
}

/// Fetch and decrypt one record.
#[utoipa::path(
    get,
    path = "/v1/data/{id}",
    tag = "Data",
    params(("id" = i64, Path, description = "Record id")),
    security(("jwt" = [])),
    responses(
        (status = 200, description = "Decrypted record", body = DataViewResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Record belongs to another user"),
    )
)]
pub async fn data_view(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<Json<DataViewResponse>, ApiError> {
    let response = state.vault.data_view(&caller, id).await?;
    Ok(Json(response))
}

/// Delete one record.
#[utoipa::path(
    delete,
    path = "/v1/data/{id}",
    tag = "Data",
    params(("id" = i64, Path, description = "Record id")),
    security(("jwt" = [])),
    responses(
        (status = 200, description = "Record deleted", body = DataDeleteResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Record belongs to another user"),
    )
)]
pub async fn data_delete(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(id): Path<i64>,
) -> Result<Json<DataDeleteResponse>, ApiError> {
    let response = state.vault.data_delete(&caller, id).await?;
    Ok(Json(response))
}
