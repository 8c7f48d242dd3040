//! REST API endpoints.
//!
//! Axum-based HTTP API exposing the compute-stats operation and a health
//! probe.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/compute-stats", post(routes::stats::compute_stats))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer for the configured origin; `*` allows any origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let value = HeaderValue::from_str(origin.trim()).map_err(|e| {
        ConfigError::ValidationError(format!("invalid CORS origin {:?}: {}", origin, e))
    })?;
    Ok(layer.allow_origin(value))
}
