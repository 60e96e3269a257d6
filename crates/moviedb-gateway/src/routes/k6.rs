//! Load-test endpoints.
//!
//! Each request performs exactly one database operation so that load tests
//! measure the read and write paths separately.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::error;

use crate::error::AppError;
use crate::json::MessageResponse;
use crate::AppState;

/// Load-test routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/k6/reads", get(handle_reads))
        .route("/api/k6/writes", post(handle_writes))
}

/// Read all movies.
async fn handle_reads(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    state.repository.query_movies().await.map_err(|e| {
        let message = e.to_string();
        error!(error = %message, "Error querying movies");
        AppError::Query(message)
    })?;

    Ok(Json(MessageResponse::new("Successfully queried movies")))
}

/// Insert one movie.
async fn handle_writes(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    state
        .repository
        .write_movie(&state.config.write_title, state.config.write_score)
        .await
        .map_err(|e| {
            let message = e.to_string();
            error!(error = %message, "Error writing movie");
            AppError::Write(message)
        })?;

    Ok(Json(MessageResponse::new("Successfully wrote movie")))
}
