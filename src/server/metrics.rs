use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

const PREFIX: &str = "radio";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Ingestion
    pub static ref RECORDS_APPENDED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_records_appended_total"), "Records appended to a station buffer"),
        &["station", "kind", "valid"]
    ).expect("Failed to create records_appended_total metric");

    pub static ref SESSIONS_STARTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_sessions_started_total"), "Song sessions started"),
        &["station"]
    ).expect("Failed to create sessions_started_total metric");

    pub static ref TRANSPORT_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_transport_errors_total"), "Poll and stream failures"),
        &["station", "kind", "error"]
    ).expect("Failed to create transport_errors_total metric");

    pub static ref BUFFERED_RECORDS: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_buffered_records"), "Records waiting for the next upload"),
        &["station", "kind"]
    ).expect("Failed to create buffered_records metric");

    // Uploads
    pub static ref UPLOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_uploads_total"), "Batch uploads by outcome"),
        &["station", "kind", "status"]
    ).expect("Failed to create uploads_total metric");

    pub static ref RECORDS_DROPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_records_dropped_total"), "Records lost to failed uploads"),
        &["station", "kind"]
    ).expect("Failed to create records_dropped_total metric");

    // Webhook server
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");
}

/// Register every metric with [`REGISTRY`].
pub fn init_metrics() {
    // Already-registered errors are expected when tests call this repeatedly.
    let _ = REGISTRY.register(Box::new(RECORDS_APPENDED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SESSIONS_STARTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRANSPORT_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BUFFERED_RECORDS.clone()));
    let _ = REGISTRY.register(Box::new(UPLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECORDS_DROPPED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_appended(station: &str, kind: &str, valid: bool, buffered: usize) {
    RECORDS_APPENDED_TOTAL
        .with_label_values(&[station, kind, if valid { "true" } else { "false" }])
        .inc();
    set_buffered(station, kind, buffered);
}

pub fn record_session_started(station: &str) {
    SESSIONS_STARTED_TOTAL.with_label_values(&[station]).inc();
}

pub fn record_transport_error(station: &str, kind: &str, error: &str) {
    TRANSPORT_ERRORS_TOTAL
        .with_label_values(&[station, kind, error])
        .inc();
}

pub fn set_buffered(station: &str, kind: &str, buffered: usize) {
    BUFFERED_RECORDS
        .with_label_values(&[station, kind])
        .set(buffered as f64);
}

/// Record the outcome of one batch upload. `dropped` counts records lost
/// with a failed batch.
pub fn record_upload(station: &str, kind: &str, success: bool, dropped: usize) {
    let status = if success { "success" } else { "failure" };
    UPLOADS_TOTAL
        .with_label_values(&[station, kind, status])
        .inc();
    if dropped > 0 {
        RECORDS_DROPPED_TOTAL
            .with_label_values(&[station, kind])
            .inc_by(dropped as f64);
    }
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
