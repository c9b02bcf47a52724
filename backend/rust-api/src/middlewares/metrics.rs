use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Segments under `/api/progress` that are routes rather than student ids.
const PROGRESS_ROUTES: [&str; 2] = ["update", "adaptive-question"];

/// Records request count and latency per normalized route.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Student ids are free-form strings, so the segment after `/api/progress/`
/// is replaced by a placeholder unless it names a fixed route.
fn normalize_path(path: &str) -> String {
    let mut normalized: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        if normalized == ["", "api", "progress"]
            && !segment.is_empty()
            && !PROGRESS_ROUTES.contains(&segment)
        {
            normalized.push("{student_id}");
        } else {
            normalized.push(segment);
        }
    }

    normalized.join("/")
}
