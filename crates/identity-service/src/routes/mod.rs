//! HTTP routes for Identity Service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::IdentityResolver;
use axum::{
    http::{header, HeaderName, HeaderValue},
    middleware,
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Get-or-create resolver over the configured store.
    pub resolver: Arc<IdentityResolver>,
}

/// Headers present on every identity endpoint response, including 204 and errors.
pub fn identity_response_headers() -> [(HeaderName, HeaderValue); 6] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (header::VARY, HeaderValue::from_static("Origin")),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*")),
        (header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("3600")),
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ),
    ]
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` and `/get_or_create_user` - Identity endpoint (any method, CORS headers)
/// - `/health` - Liveness probe (simple "OK")
/// - `/ready` - Readiness probe (store ping)
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout from configuration
///
/// The identity handler enforces the timeout itself so that a stalled store
/// still produces a JSON 500 carrying the identity headers. `TimeoutLayer`
/// only wraps the operational routes.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let mut identity_routes = Router::new()
        .route("/", any(handlers::get_or_create_user))
        .route("/get_or_create_user", any(handlers::get_or_create_user))
        .with_state(state.clone());

    for (name, value) in identity_response_headers() {
        identity_routes = identity_routes.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    // Operational endpoints
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let operational_routes = health_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(timeout));

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer - Log request details
    // 2. http_metrics_middleware - Record ALL responses (outermost)
    identity_routes
        .merge(operational_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::WriteMode;
    use crate::errors::IdentityError;
    use crate::models::{Identity, NewIdentity};
    use crate::repositories::{CreateOutcome, IdentityStore, InMemoryIdentityStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    /// Store whose reads never complete, like a stalled redis connection.
    struct StalledStore;

    #[async_trait::async_trait]
    impl IdentityStore for StalledStore {
        async fn get(&self, _browser_id: &str) -> Result<Option<Identity>, IdentityError> {
            std::future::pending().await
        }

        async fn set(&self, _record: &NewIdentity) -> Result<Identity, IdentityError> {
            std::future::pending().await
        }

        async fn create_if_absent(
            &self,
            _record: &NewIdentity,
        ) -> Result<CreateOutcome, IdentityError> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    fn test_app(store: Arc<dyn IdentityStore>) -> Router {
        let vars = HashMap::from([
            ("STORE_BACKEND".to_string(), "memory".to_string()),
            ("REQUEST_TIMEOUT_SECONDS".to_string(), "1".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        let resolver = Arc::new(IdentityResolver::new(store, WriteMode::CreateIfAbsent));
        let state = Arc::new(AppState { config, resolver });
        let handle = PrometheusBuilder::new().build_recorder().handle();

        build_routes(state, handle)
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_post_on_both_paths_resolves_same_identity() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let app = test_app(store.clone());

        let first = app
            .clone()
            .oneshot(request("POST", "/", r#"{"browser_id":"abc"}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;

        let second = app
            .oneshot(request("POST", "/get_or_create_user", r#"{"browser_id":"abc"}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        assert_eq!(body_json(second).await, first);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_options_is_204_with_cors_headers() {
        let app = test_app(Arc::new(InMemoryIdentityStore::new()));

        let response = app.oneshot(request("OPTIONS", "/", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        for (name, value) in identity_response_headers() {
            assert_eq!(response.headers().get(&name), Some(&value));
        }

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_error_responses_carry_cors_headers() {
        let app = test_app(Arc::new(InMemoryIdentityStore::new()));

        let response = app.oneshot(request("GET", "/", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert_eq!(body_json(response).await["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_store_failure_is_500_with_detail() {
        let app = test_app(Arc::new(InMemoryIdentityStore::failing()));

        let response = app
            .oneshot(request("POST", "/", r#"{"browser_id":"abc"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = body_json(response).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Internal server error: "));
        assert!(error.contains("In-memory store unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out_as_json_500_with_cors_headers() {
        let app = test_app(Arc::new(StalledStore));

        let response = app
            .oneshot(request("POST", "/", r#"{"browser_id":"abc"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in identity_response_headers() {
            assert_eq!(response.headers().get(&name), Some(&value));
        }
        assert_eq!(
            body_json(response).await["error"],
            "Internal server error: request timed out"
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_400_with_cors_headers() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let app = test_app(store.clone());

        let huge_id = "a".repeat(3 * 1024 * 1024);
        let body = serde_json::json!({ "browser_id": huge_id }).to_string();

        let response = app.oneshot(request("POST", "/", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        for (name, value) in identity_response_headers() {
            assert_eq!(response.headers().get(&name), Some(&value));
        }
        assert_eq!(body_json(response).await["error"], "Invalid request body");
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_health_routes_have_no_cors_headers() {
        let app = test_app(Arc::new(InMemoryIdentityStore::new()));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_ready_reports_store_failure() {
        let app = test_app(Arc::new(InMemoryIdentityStore::failing()));

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["store"], "unhealthy");
    }
}
