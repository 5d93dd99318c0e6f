//! Metrics definitions for Identity Service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `identity_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 8 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS, OTHER)
//! - `endpoint`: 6 values (known paths plus `/other`)
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: 4 values (existing, created, conflict, error)
//! - `operation`: 3 values (get, set, create_if_absent)
//!
//! Browser ids never appear in labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("identity_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("identity_store_operation".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set store operation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `identity_http_requests_total`, `identity_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_method = normalize_method(method);
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("identity_http_request_duration_seconds",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("identity_http_requests_total",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize request method to bound label cardinality.
///
/// The identity route accepts any method, so extension methods collapse
/// into `OTHER`.
fn normalize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "PUT" => "PUT",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// Normalize endpoint path to bound label cardinality.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/get_or_create_user" => "/get_or_create_user",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Identity Resolution Metrics
// ============================================================================

/// Record the outcome of an identity resolution.
///
/// Metric: `identity_resolutions_total`
/// Labels: `outcome` (existing, created, conflict, error)
pub fn record_identity_resolution(outcome: &'static str) {
    counter!("identity_resolutions_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record a document store operation.
///
/// Metric: `identity_store_operation_duration_seconds`, `identity_store_operations_total`
/// Labels: `operation`, `status`
pub fn record_store_operation(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("identity_store_operation_duration_seconds",
        "operation" => operation,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("identity_store_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests run the recording functions against the global no-op
    // recorder; values are asserted through the /metrics integration test.

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/", 200, Duration::from_millis(5));
        record_http_request("OPTIONS", "/get_or_create_user", 204, Duration::from_millis(1));
        record_http_request("GET", "/", 405, Duration::from_millis(1));
        record_http_request("GET", "/nonexistent", 404, Duration::from_millis(1));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(405), "error");
        assert_eq!(categorize_status_code(500), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_method() {
        for method in ["GET", "POST", "PATCH", "DELETE", "PUT", "HEAD", "OPTIONS"] {
            assert_eq!(normalize_method(method), method);
        }
        assert_eq!(normalize_method("PROPFIND"), "OTHER");
        assert_eq!(normalize_method("TRACE"), "OTHER");
        assert_eq!(normalize_method("get"), "OTHER");
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/get_or_create_user"), "/get_or_create_user");
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/users/abc"), "/other");
    }

    #[test]
    fn test_record_identity_resolution() {
        for outcome in ["existing", "created", "conflict", "error"] {
            record_identity_resolution(outcome);
        }
    }

    #[test]
    fn test_record_store_operation() {
        record_store_operation("get", "success", Duration::from_micros(300));
        record_store_operation("set", "error", Duration::from_millis(2));
        record_store_operation("create_if_absent", "success", Duration::from_millis(1));
    }
}
