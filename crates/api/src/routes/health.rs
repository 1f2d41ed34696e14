use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Route listing returned alongside the health status.
#[derive(Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub upload: &'static str,
    pub status: &'static str,
    pub callback: &'static str,
}

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    pub message: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub endpoints: Endpoints,
}

/// GET / -- liveness check with a route listing.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Training relay is running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            health: "GET /",
            upload: "POST /api/upload",
            status: "GET /api/status/{jobId}",
            callback: "POST /api/callback",
        },
    })
}

/// Mount the health check at the root (not under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}
