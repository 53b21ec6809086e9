//! paperdex-api - HTTP API server for the paperdex question-paper index.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use paperdex_api::{handlers, ApiConfig, AppState};
use paperdex_auth::AuthVerifier;
use paperdex_core::PathResolver;
use paperdex_db::{create_pool, Database, FilesystemBackend};

fn cors_layer(allowed_origins: &str) -> anyhow::Result<CorsLayer> {
    let origins = allowed_origins
        .split(',')
        .map(|origin| origin.trim().parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("CORS_ALLOWED_ORIGINS contains an invalid origin")?;

    Ok(CorsLayer::new()
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(origins))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ApiConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;

    // Catch storage problems (bad mount, permissions) before the first
    // upload does.
    let backend = FilesystemBackend::new(&config.storage_root);
    backend
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("storage validation failed: {}", e))?;

    let resolver = PathResolver::new(config.path_config());
    let db = Database::new(pool, backend, resolver);
    db.migrate().await?;

    let auth = AuthVerifier::new(config.auth.clone());

    let state = AppState {
        db: Arc::new(db),
        auth: Arc::new(auth),
        max_upload_limit: config.max_upload_limit,
    };

    let app = handlers::router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .layer(cors_layer(&config.cors_allowed_origins)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!(
        subsystem = "api",
        op = "listen",
        %addr,
        "paperdex API listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
