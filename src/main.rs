// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tracing_subscriber::EnvFilter;

use gophkeeper::api;
use gophkeeper::config::Config;
use gophkeeper::crypto::{KeyManager, MasterKeyCache};
use gophkeeper::state::{AppState, AuthConfig};
use gophkeeper::storage::{PostgresStorage, S3ObjectStore};
use gophkeeper::vault::VaultService;

/// Capacity of the in-memory master key cache.
const MK_CACHE_CAPACITY: usize = 1024;
/// TTL for cached master keys.
const MK_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() {
    init_tracing();

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let storage = match PostgresStorage::connect(&cfg.database_dsn).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            std::process::exit(1);
        }
    };

    let objects = match S3ObjectStore::connect(&cfg.s3).await {
        Ok(objects) => Arc::new(objects),
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to blob store");
            std::process::exit(1);
        }
    };

    let mk_cache = Arc::new(MasterKeyCache::new(MK_CACHE_CAPACITY, MK_CACHE_TTL));
    let key_manager = KeyManager::new(storage.clone(), cfg.server_kek).with_cache(mk_cache);

    let vault = Arc::new(VaultService::new(
        storage,
        objects,
        key_manager,
        cfg.jwt.secret.clone(),
    ));

    let state = AppState::new(
        vault,
        AuthConfig {
            secret: cfg.jwt.secret.clone(),
        },
    );
    let app = api::router(state);

    let addr: SocketAddr = cfg
        .http_address
        .parse()
        .expect("Failed to parse HTTP bind address");

    if cfg.tls.enabled {
        let tls = RustlsConfig::from_pem_file(&cfg.tls.cert_path, &cfg.tls.key_path)
            .await
            .expect("Failed to load TLS certificate and key");

        tracing::info!(addr = %addr, tls = true, "starting HTTP server");
        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await
            .expect("Server failed");
    } else {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind TCP listener");

        tracing::info!(addr = %addr, tls = false, "starting HTTP server");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .expect("Server failed");
    }
}

/// Initialize tracing from `RUST_LOG` and `LOG_FORMAT`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
