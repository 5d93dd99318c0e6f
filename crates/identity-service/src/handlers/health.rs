//! Health check handlers.
//!
//! - `/health` - liveness, no dependencies checked
//! - `/ready` - readiness, pings the identity store

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::instrument;

/// Liveness probe handler.
#[instrument(skip_all, name = "identity.health.live")]
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when the store answers a ping and 503 otherwise. The body is
/// returned in both cases so the orchestrator can see which dependency failed.
#[instrument(skip_all, name = "identity.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match state.resolver.store_ready().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                store: "healthy".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "identity.health", error = %e, "Store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".to_string(),
                    store: "unhealthy".to_string(),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness_is_static() {
        assert_eq!(health_check().await, "OK");
    }
}
