//! Metrics definitions for the catalog service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `catalog_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: parameterized paths plus `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`/`reason`: bounded by `AuthError` codes
//! - `operation`: bounded by code (insert_movie, delete_actor, etc.)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("catalog_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("catalog_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        // JWKS fetches are bounded by the fetch timeout (at most 30s)
        .set_buckets_for_metric(
            Matcher::Prefix("catalog_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000, 30.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `catalog_http_requests_total`, `catalog_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures ALL responses, including 404/405 produced by the router itself.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("catalog_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("catalog_http_requests_total",
        "method" => method.to_string(),
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

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces entity ids with `{id}`; anything unrecognized becomes `/other`.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/ready" | "/metrics" | "/movies" | "/actors" | "/roles" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(collection @ ("movies" | "actors" | "roles")), Some(id), None) if !id.is_empty() => {
            format!("/{collection}/{{id}}")
        }
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record an authorization decision
///
/// Metric: `catalog_auth_decisions_total`
/// Labels: `outcome` (allowed, denied), `reason` (`AuthError` code or `none`)
pub fn record_auth_decision(outcome: &str, reason: &str) {
    counter!("catalog_auth_decisions_total",
        "outcome" => outcome.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a JWKS fetch attempt
///
/// Metric: `catalog_jwks_fetches_total`, `catalog_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error, timeout)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("catalog_jwks_fetch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("catalog_jwks_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `catalog_db_query_duration_seconds`, `catalog_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("catalog_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("catalog_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // These run against the global no-op recorder; the value is in exercising
    // label construction, not asserting on recorded values.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/movies/12", 200, Duration::from_millis(50));
        record_http_request("PATCH", "/actors/3", 422, Duration::from_millis(10));
        record_http_request("DELETE", "/roles/9", 404, Duration::from_millis(2));
        record_http_request("GET", "/movies", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(299), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(403), "error");
        assert_eq!(categorize_status_code(422), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        for path in ["/health", "/ready", "/metrics", "/movies", "/actors", "/roles"] {
            assert_eq!(normalize_endpoint(path), path);
        }
    }

    #[test]
    fn test_normalize_endpoint_entity_paths() {
        assert_eq!(normalize_endpoint("/movies/1"), "/movies/{id}");
        assert_eq!(normalize_endpoint("/actors/999999"), "/actors/{id}");
        assert_eq!(normalize_endpoint("/roles/not-a-number"), "/roles/{id}");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/unknown"), "/other");
        assert_eq!(normalize_endpoint("/movies/"), "/other");
        assert_eq!(normalize_endpoint("/movies/1/actors"), "/other");
        assert_eq!(normalize_endpoint("/drinks/1"), "/other");
    }

    #[test]
    fn test_record_auth_decision() {
        record_auth_decision("allowed", "none");
        record_auth_decision("denied", "token_expired");
        record_auth_decision("denied", "permission_denied");
    }

    #[test]
    fn test_record_jwks_fetch() {
        record_jwks_fetch("success", Duration::from_millis(40));
        record_jwks_fetch("error", Duration::from_millis(5));
        record_jwks_fetch("timeout", Duration::from_secs(5));
    }

    #[test]
    fn test_record_db_query() {
        record_db_query("insert_movie", "success", Duration::from_millis(3));
        record_db_query("delete_actor", "error", Duration::from_millis(20));
    }
}
