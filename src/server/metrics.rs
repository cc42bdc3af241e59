use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all service metrics
const PREFIX: &str = "sitequery";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Query Pipeline Metrics
    pub static ref QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_queries_total"), "Queries handled, by outcome"),
        &["outcome"]
    ).expect("Failed to create queries_total metric");

    pub static ref QUERY_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_query_duration_seconds"),
            "End-to-end query pipeline duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0])
    ).expect("Failed to create query_duration_seconds metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(QUERIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(QUERY_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized");
}

/// Record a completed HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a completed query pipeline invocation
pub fn record_query(outcome: &str, duration: Duration) {
    QUERIES_TOTAL.with_label_values(&[outcome]).inc();
    QUERY_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Handler serving the Prometheus text exposition format
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => match String::from_utf8(buffer) {
            Ok(body) => (StatusCode::OK, body).into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response(),
        },
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_query_outcomes() {
        init_metrics();

        // Label unique to this test so concurrent pipeline tests cannot
        // interfere with the count.
        let before = QUERIES_TOTAL.with_label_values(&["metrics_test"]).get();
        record_query("metrics_test", Duration::from_millis(120));
        let after = QUERIES_TOTAL.with_label_values(&["metrics_test"]).get();

        assert!((after - before - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exposition_contains_prefixed_metrics() {
        init_metrics();
        record_query("not_found", Duration::from_millis(10));

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&REGISTRY.gather(), &mut buffer).unwrap();
        let body = String::from_utf8(buffer).unwrap();

        assert!(body.contains("sitequery_queries_total"));
    }
}
