//! Error handling for the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Reading movies failed.
    Query(String),
    /// Writing a movie failed.
    Write(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short description of the failed operation.
    pub error: String,
    /// Underlying error message.
    pub details: String,
}

impl AppError {
    fn parts(self) -> (&'static str, String) {
        match self {
            AppError::Query(details) => ("Failed to query movies", details),
            AppError::Write(details) => ("Failed to write movie", details),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error, details) = self.parts();
        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
