use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::ApiError;
use crate::{
    extractors::AppJson,
    models::{AdaptiveQuestionRequest, ProgressUpdateResponse, SubmitAttemptRequest},
    services::AppState,
};

/// POST /api/progress/update
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = state.progress.submit_attempt(req).await?;
    Ok((StatusCode::OK, Json(ProgressUpdateResponse::from(update))))
}

/// GET /api/progress/{student_id}
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Getting progress for student {}", student_id);

    let progress = state.progress.get_progress(&student_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": progress,
        "metadata": {
            "timestamp": Utc::now()
        }
    })))
}

/// GET /api/progress
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let all = state.progress.get_all_progress().await?;
    Ok(Json(json!({
        "success": true,
        "metadata": {
            "totalStudents": all.len(),
            "timestamp": Utc::now()
        },
        "data": all
    })))
}

/// DELETE /api/progress/{student_id}
pub async fn reset_progress(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.progress.reset_progress(&student_id).await? {
        return Err(ApiError::NotFound(format!(
            "No progress found for student {}",
            student_id
        )));
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Progress reset for student {}", student_id),
        "metadata": {
            "timestamp": Utc::now()
        }
    })))
}

/// POST /api/progress/adaptive-question
pub async fn adaptive_question(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<AdaptiveQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (progress, question) = state.progress.get_adaptive_question(req).await?;
    Ok(Json(json!({
        "success": true,
        "data": question,
        "metadata": {
            "timestamp": Utc::now(),
            "studentAccuracy": progress.accuracy_rate,
            "learningStreak": progress.learning_streak
        }
    })))
}
