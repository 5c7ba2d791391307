//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "fastcut_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "fastcut_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "fastcut_http_requests_in_flight";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Collapse job ids out of paths so metric cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut out = Vec::new();
    let mut after_renders = false;

    for segment in path.split('/') {
        if after_renders && !segment.is_empty() {
            out.push(":job_id");
            after_renders = false;
            continue;
        }
        after_renders = segment == "renders";
        out.push(segment);
    }

    out.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/renders/550e8400-e29b-41d4-a716-446655440000"),
            "/api/renders/:job_id"
        );
        assert_eq!(
            sanitize_path("/api/renders/job-123/retry"),
            "/api/renders/:job_id/retry"
        );
        assert_eq!(sanitize_path("/api/renders"), "/api/renders");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
