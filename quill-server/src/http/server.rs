//! Axum server setup
//!
//! - One CORS origin by default (the front end's dev server)
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C, then the pool is closed

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use quill_core::BootstrapError;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::auth::TokenIssuer;
use crate::db::PgBootstrap;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:4000)
    pub bind_addr: SocketAddr,

    /// Origin allowed by CORS (default: http://localhost:3000)
    pub cors_origin: String,

    /// Allow any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            cors_origin: "http://localhost:3000".to_owned(),
            cors_permissive: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenIssuer,
}

/// All API routes with CORS and tracing layers applied.
pub fn build_router(state: AppState, config: &ServerConfig) -> Result<Router, ServerError> {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        let origin = HeaderValue::from_str(&config.cors_origin)
            .map_err(|_| ServerError::InvalidOrigin(config.cors_origin.clone()))?;
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Ok(Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::posts::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}

/// Bootstrap the database, serve until a shutdown signal, close the pool.
///
/// The pool is closed on every exit after a successful bootstrap, including
/// a failed bind.
///
/// # Example
///
/// ```no_run
/// use quill_server::auth::TokenIssuer;
/// use quill_server::{db, run_server, AuthSettings, DatabaseSettings, ServerConfig};
///
/// # async fn start() -> Result<(), Box<dyn std::error::Error>> {
/// let bootstrap = db::bootstrap(&DatabaseSettings::from_env()?);
/// let tokens = TokenIssuer::from_settings(&AuthSettings::from_env()?);
/// run_server(&bootstrap, tokens, ServerConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server(
    bootstrap: &PgBootstrap,
    tokens: TokenIssuer,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let pool = bootstrap.acquire().await?;
    let served = serve(AppState { pool, tokens }, &config).await;

    if bootstrap.close().await {
        tracing::info!("database pool closed");
    }
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, config)?;

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError<sqlx::Error>),

    #[error("invalid CORS origin: '{0}'")]
    InvalidOrigin(String),
}
