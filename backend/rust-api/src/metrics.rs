use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Progress Metrics
    pub static ref ATTEMPTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "progress_attempts_total",
        "Total number of problem attempts recorded",
        &["correct"]
    )
    .unwrap();

    pub static ref ADAPTIVE_QUESTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "adaptive_questions_total",
        "Adaptive question selections by rule",
        &["rule"]
    )
    .unwrap();

    pub static ref PROGRESS_RESETS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "progress_resets_total",
        "Progress reset requests by outcome",
        &["result"]
    )
    .unwrap();

    pub static ref STUDENTS_TRACKED: IntGauge = register_int_gauge!(
        "students_tracked",
        "Number of students with progress held in memory"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
