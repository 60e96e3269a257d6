//! JSON response bodies.

use serde::Serialize;

/// Success response for the load-test endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Whether the database answered.
    pub database_connected: bool,
    /// Why the database could not be reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database_connected: true,
            details: None,
        }
    }

    pub fn degraded(details: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database_connected: false,
            details: Some(details.into()),
        }
    }
}
