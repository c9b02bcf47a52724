#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use linalg_tutor_api::{create_router, services::mastery::ThresholdScale, AppState, Config};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const METRICS_AUTH: &str = "metrics:test-secret";

pub fn create_test_app() -> Router {
    create_test_app_with_scale(ThresholdScale::Normalized)
}

pub fn create_test_app_with_scale(threshold_scale: ThresholdScale) -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        metrics_auth: METRICS_AUTH.to_string(),
        threshold_scale,
        ..Config::default()
    };

    create_router(Arc::new(AppState::new(config)))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| json!(String::from_utf8_lossy(&body)))
    };
    (status, json)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn attempt(student_id: &str, topic: &str, concepts: &[&str], is_correct: bool) -> Value {
    let student_answer = if is_correct { "11" } else { "10" };
    json!({
        "studentId": student_id,
        "problemId": "problem-1",
        "question": "Compute the dot product of (1, 2) and (3, 4)",
        "studentAnswer": student_answer,
        "correctAnswer": "11",
        "isCorrect": is_correct,
        "topic": topic,
        "difficulty": "beginner",
        "concepts": concepts,
        "timeSpent": 45,
        "hintsUsed": 0
    })
}

pub async fn submit(app: &Router, body: &Value) -> (StatusCode, Value) {
    send(app, post_json("/api/progress/update", body)).await
}
