//! # Request Metrics
//!
//! HTTP request counters recorded in middleware. Totals are kept in-process
//! on [`AppState`](crate::AppState) and reported by `/health/readiness`.
//! Every request is also emitted through the `metrics` facade so the
//! Prometheus recorder installed by the binary picks it up:
//!
//! - `lic_http_requests_total{method,path,status}`
//! - `lic_http_errors_total{method,path,status}` (4xx and 5xx)
//! - `lic_http_request_duration_seconds{method,path}`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Shared request counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen since startup.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests answered with a 4xx or 5xx.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let status = status.to_string();
        let is_error = status.starts_with('4') || status.starts_with('5');

        metrics::counter!(
            "lic_http_requests_total",
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status.clone()
        )
        .increment(1);
        metrics::histogram!(
            "lic_http_request_duration_seconds",
            "method" => method.to_string(),
            "path" => path.to_string()
        )
        .record(duration_secs);

        if is_error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(
                "lic_http_errors_total",
                "method" => method.to_string(),
                "path" => path.to_string(),
                "status" => status
            )
            .increment(1);
        }
    }
}

/// Replace UUID segments with `{id}` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::try_parse(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record method, route, status, and latency of every request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    };
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_client_and_server_failures() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/v1/licenses/{id}", 200, 0.01);
        m.record_request("POST", "/v1/licenses/{id}/anchor", 409, 0.02);
        m.record_request("POST", "/v1/licenses/{id}/anchor", 503, 0.02);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn clones_share_counters() {
        let m = ApiMetrics::new();
        let other = m.clone();
        other.record_request("GET", "/health/liveness", 200, 0.001);
        assert_eq!(m.requests(), 1);
    }

    #[test]
    fn normalize_replaces_uuid_segments() {
        let path = "/v1/licenses/67e55044-10b1-426f-9247-bb680e5fe0c8/anchor";
        assert_eq!(normalize_path(path), "/v1/licenses/{id}/anchor");
        assert_eq!(normalize_path("/v1/licenses/pending"), "/v1/licenses/pending");
    }
}
