use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::{progress_service::ProgressError, AppState};

pub mod progress;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::Validation(message) => {
                tracing::warn!("Rejected progress request: {}", message);
                ApiError::BadRequest(message)
            }
            ProgressError::NotFound(student_id) => {
                ApiError::NotFound(format!("No progress found for student {}", student_id))
            }
            ProgressError::Internal(e) => {
                tracing::error!("Progress operation failed: {:?}", e);
                ApiError::Internal("Failed to process student progress".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "Invalid request", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "Student not found", message),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                message,
            ),
        };
        let body = json!({
            "error": error,
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(body)).into_response()
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.progress.students_tracked().await {
        Ok(students) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "linalg-tutor-api",
                "version": env!("CARGO_PKG_VERSION"),
                "studentsTracked": students
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "linalg-tutor-api",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects `/metrics` with HTTP Basic auth against the configured credentials.
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
