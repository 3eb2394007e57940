//! Liveness endpoint

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// "ok" when the pool answers a ping
    pub database: &'static str,
}

fn report(database_ok: bool) -> HealthResponse {
    HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database: if database_ok { "ok" } else { "unavailable" },
    }
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ping = sqlx::query("SELECT 1").execute(&state.pool).await;
    if let Err(e) = &ping {
        tracing::warn!(error = %e, "health check ping failed");
    }
    Json(report(ping.is_ok()))
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
