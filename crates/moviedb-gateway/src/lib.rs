//! moviedb HTTP gateway.
//!
//! Exposes the load-test endpoints (`GET /api/k6/reads`, `POST /api/k6/writes`)
//! and a health check over a [`MovieRepository`].

pub mod config;
pub mod error;
pub mod json;
pub mod routes;

pub use config::{Args, GatewayConfig};
pub use error::AppError;

use std::sync::Arc;

use axum::Router;
use moviedb_store::MovieRepository;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Movie storage.
    pub repository: Arc<dyn MovieRepository>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(repository: Arc<dyn MovieRepository>, config: GatewayConfig) -> Self {
        Self { repository, config }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::k6::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
