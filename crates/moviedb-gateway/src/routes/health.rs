//! Liveness and database reachability.

use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::json::HealthResponse;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Pings the movie store. An unreachable database, including one whose auth
/// token could not be obtained, degrades the status without failing the request.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.repository.ping().await {
        Ok(()) => Json(HealthResponse::healthy()),
        Err(e) => {
            warn!(error = %e, "Health check could not reach the movie store");
            Json(HealthResponse::degraded(e.to_string()))
        }
    }
}
