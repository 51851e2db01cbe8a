//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the catalog store and key set configuration

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

const NOT_READY_MESSAGE: &str = "Service dependencies unavailable";

/// Liveness probe handler. Checks nothing beyond the process answering.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when the store answers a ping and a key set URL is
/// configured, 503 otherwise. Error messages are generic; the underlying
/// cause is logged.
#[tracing::instrument(skip_all, name = "catalog.health.readiness")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    if let Err(e) = state.store.ping().await {
        tracing::warn!(target: "catalog.health", error = %e, "Readiness check failed: store unavailable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                store: Some("unhealthy"),
                jwks: None,
                error: Some(NOT_READY_MESSAGE.to_string()),
            }),
        );
    }

    // Keys are fetched on demand; readiness only requires an endpoint to fetch from.
    if state.gateway.validator().jwks_client().jwks_url().is_empty() {
        tracing::warn!(target: "catalog.health", "Readiness check failed: JWKS URL not configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                store: Some("healthy"),
                jwks: Some("unconfigured"),
                error: Some(NOT_READY_MESSAGE.to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            store: Some("healthy"),
            jwks: Some("configured"),
            error: None,
        }),
    )
}
