use super::handlers::health::handle_health;
use super::handlers::sign::handle_sign_asset;
use super::middleware::cors::cors_middleware;
use super::middleware::logging::logging_middleware;
use super::state::AppState;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Request body limit. A transaction is at most a few KiB.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub async fn run_http_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Co-signer listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sign-asset", post(handle_sign_asset))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cors_middleware,
        ))
        .with_state(state)
}
