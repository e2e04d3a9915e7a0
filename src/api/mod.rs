// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP API: router assembly, CORS, request tracing, and the OpenAPI
//! document.
//!
//! Route map (one route per vault operation):
//!
//! | Route | Method | Protected |
//! |-------|--------|-----------|
//! | `/v1/ping` | GET | no |
//! | `/v1/user/signup` | POST | no |
//! | `/v1/user/login` | POST | no |
//! | `/v1/data` | POST/GET | yes |
//! | `/v1/data/{id}` | GET/DELETE | yes |
//!
//! Protected routes carry the [`Auth`](crate::auth::Auth) extractor, which
//! validates the `jwt` header before the handler body runs.

use axum::{routing::get, routing::post, Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::models::{
    AuthResponse, BankCard, Credentials, DataDeleteResponse, DataListResponse, DataSaveRequest,
    DataSaveResponse, DataType, DataViewResponse, FileData, Meta, PingResponse, RecordListItem,
    UserRequest,
};
use crate::state::AppState;

pub mod health;
pub mod records;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        // Unprotected endpoints
        .route("/ping", get(health::ping))
        .route("/user/signup", post(users::signup))
        .route("/user/login", post(users::login))
        // Record endpoints (jwt header required)
        .route("/data", post(records::data_save).get(records::data_list))
        .route(
            "/data/{id}",
            get(records::data_view).delete(records::data_delete),
        );

    Router::new()
        // Liveness endpoint (no auth required)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", v1_routes)
        // OpenAPI document
        .route("/api-doc/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build CORS layer from environment configuration.
///
/// - If `CORS_ALLOWED_ORIGINS` is set, only those origins are allowed.
///   Multiple origins can be comma-separated.
/// - If not set, falls back to permissive CORS (development only).
fn build_cors_layer() -> CorsLayer {
    if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
        let allowed: Vec<_> = origins
            .split(',')
            .map(|s| s.trim().parse().expect("Invalid CORS origin"))
            .collect();
        tracing::info!(origins = %origins, "CORS: restricting to configured origins");
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set - using permissive CORS (development only)");
        CorsLayer::permissive()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        health::ping,
        health::health,
        // User endpoints
        users::signup,
        users::login,
        // Record endpoints
        records::data_save,
        records::data_list,
        records::data_view,
        records::data_delete
    ),
    components(
        schemas(
            UserRequest,
            AuthResponse,
            DataType,
            BankCard,
            Credentials,
            FileData,
            Meta,
            DataSaveRequest,
            DataSaveResponse,
            RecordListItem,
            DataListResponse,
            DataViewResponse,
            DataDeleteResponse,
            PingResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness checks"),
        (name = "Users", description = "Registration and authentication"),
        (name = "Data", description = "Encrypted record operations")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

/// Security scheme for OpenAPI documentation: the raw `jwt` header.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
            components.add_security_scheme(
                "jwt",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(crate::auth::JWT_HEADER))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::for_tests("test-jwt-secret"))
    }

    fn json_request(method: &str, uri: &str, jwt: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = jwt {
            builder = builder.header("jwt", token);
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str, jwt: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = jwt {
            builder = builder.header("jwt", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sign up and log in a user over HTTP, returning (user_id, token).
    async fn login_over_http(app: &Router, username: &str, password: &str) -> (i64, String) {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/user/signup",
                None,
                json!({"username": username, "password": password}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/user/login",
                None,
                json!({"username": username, "password": password}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        (
            body["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_owned(),
        )
    }

    #[tokio::test]
    async fn ping_responds_pong() {
        let response = app()
            .oneshot(get_request("/v1/ping", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "pong");
    }

    #[tokio::test]
    async fn protected_routes_reject_requests_without_jwt() {
        let app = app();

        for request in [
            get_request("/v1/data", None),
            get_request("/v1/data/1", None),
            json_request("POST", "/v1/data", None, json!({"type": "credentials"})),
            Request::builder()
                .method("DELETE")
                .uri("/v1/data/1")
                .body(Body::empty())
                .unwrap(),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let app = app();
        let token = crate::auth::issue_token(1, "alice", b"wrong-secret").unwrap();

        let response = app
            .oneshot(get_request("/v1/data", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_validation_errors_are_bad_requests() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/user/signup",
                None,
                json!({"username": "ab", "password": "password123"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request(
                "POST",
                "/v1/user/signup",
                None,
                json!({"username": "alice", "password": "short"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = app();
        let body = json!({"username": "alice", "password": "password123"});

        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/user/signup", None, body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request("POST", "/v1/user/signup", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = app();

        app.clone()
            .oneshot(json_request(
                "POST",
                "/v1/user/signup",
                None,
                json!({"username": "bob", "password": "hunter22aa"}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                "POST",
                "/v1/user/login",
                None,
                json!({"username": "bob", "password": "hunter22ab"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn credentials_roundtrip_over_http() {
        let app = app();
        let (_, token) = login_over_http(&app, "alice", "password123").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/data",
                Some(&token),
                json!({
                    "type": "credentials",
                    "credentials": {"login": "l", "password": "p"},
                    "meta": {"content": "m"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/v1/data/1", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "credentials");
        assert_eq!(body["credentials"]["login"], "l");
        assert_eq!(body["credentials"]["password"], "p");
        assert_eq!(body["meta"]["content"], "m");

        let response = app
            .oneshot(get_request("/v1/data", Some(&token)))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["records"][0]["id"], 1);
        assert_eq!(body["records"][0]["type"], "credentials");
    }

    #[tokio::test]
    async fn cross_user_view_is_forbidden_over_http() {
        let app = app();
        let (_, alice_token) = login_over_http(&app, "alice", "password123").await;
        let (_, bob_token) = login_over_http(&app, "bob", "password456").await;

        app.clone()
            .oneshot(json_request(
                "POST",
                "/v1/data",
                Some(&alice_token),
                json!({
                    "type": "credentials",
                    "credentials": {"login": "l", "password": "p"},
                    "meta": {"content": "m"}
                }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/v1/data/1", Some(&bob_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app()
            .oneshot(get_request("/api-doc/openapi.json", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["openapi"].is_string());
        assert!(body["paths"]["/v1/data"].is_object());
    }
}
