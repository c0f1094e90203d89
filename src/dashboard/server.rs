use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::auth;
use super::github::GitHubClient;
use super::icons::HttpIconFetcher;
use super::public;
use crate::config::AdminConfig;

/// Listener options layered on top of [`AdminConfig`] by the `serve` command.
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
}

impl ServerConfig {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            port: config.server.port,
            dev_mode: false,
        }
    }
}

/// Build the full application router: public API, OAuth, and admin CRUD.
pub fn build_router(state: Arc<AppState>) -> Router {
    public::public_router()
        .merge(auth::auth_router())
        .merge(api::api_router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}

/// Wire the real GitHub and icon clients into shared state.
pub fn production_state(config: AdminConfig) -> Result<Arc<AppState>> {
    let github = Arc::new(GitHubClient::new(&config).context("Failed to build GitHub client")?);
    let icons = HttpIconFetcher::new().context("Failed to build icon HTTP client")?;
    Ok(Arc::new(AppState {
        config,
        store: github.clone(),
        identity: github,
        icons: Arc::new(icons),
    }))
}

/// Start the admin API server.
pub async fn start_server(config: AdminConfig, server: ServerConfig) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let state = production_state(config)?;
    let mut app = build_router(state);

    if server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if server.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, dev = server.dev_mode, "web2app admin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
