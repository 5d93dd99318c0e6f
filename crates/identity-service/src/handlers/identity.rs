//! Identity endpoint handler.
//!
//! One endpoint, dispatched on method:
//! - `OPTIONS` - CORS preflight, 204 with no body
//! - `POST` - resolve `{"browser_id": ...}` to `{"username", "color"}`
//! - anything else - 405
//!
//! CORS and content-type headers are applied by the router layer, not here.

use crate::errors::IdentityError;
use crate::models::{IdentityRequest, IdentityResponse};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const INVALID_BODY: &str = "Invalid request body";
const BROWSER_ID_REQUIRED: &str = "browser_id is required";
const BROWSER_ID_NOT_STRING: &str = "browser_id must be a string";

/// Handler for the identity endpoint.
///
/// ## Request
///
/// ```json
/// { "browser_id": "6f1c0e4e-..." }
/// ```
///
/// ## Response
///
/// Returns 200 OK with the stored or newly created identity:
///
/// ```json
/// { "username": "swift_tiger_042", "color": "#1A2B3C" }
/// ```
///
/// ## Errors
///
/// - 400: body missing, not a JSON object, or `browser_id` missing/invalid
/// - 405: method other than POST or OPTIONS
/// - 500: store failure, or the store did not answer within the request timeout
#[instrument(skip_all, name = "identity.handlers.get_or_create_user", fields(method = %method))]
pub async fn get_or_create_user(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, IdentityError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    if method != Method::POST {
        return Err(IdentityError::MethodNotAllowed);
    }

    // Oversized or unreadable bodies are rejected here so they get the JSON error shape.
    let body = body.map_err(|e| {
        tracing::debug!(target: "identity.handlers", error = %e, "Failed to read request body");
        IdentityError::BadRequest(INVALID_BODY.to_string())
    })?;

    let browser_id = parse_browser_id(&body)?;

    let timeout = Duration::from_secs(state.config.request_timeout_seconds);
    let resolved = tokio::time::timeout(timeout, state.resolver.resolve(&browser_id))
        .await
        .map_err(|_| {
            tracing::warn!(
                target: "identity.handlers",
                timeout_seconds = timeout.as_secs(),
                "Identity resolution timed out"
            );
            IdentityError::Internal("request timed out".to_string())
        })??;

    tracing::debug!(
        target: "identity.handlers",
        created = resolved.created,
        "Resolved identity"
    );

    Ok((StatusCode::OK, Json(IdentityResponse::from(resolved))).into_response())
}

/// Whether a JSON value counts as "not provided" (null, false, zero, or an
/// empty string, array or object).
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Extract a non-empty string `browser_id` from a JSON request body.
pub fn parse_browser_id(body: &[u8]) -> Result<String, IdentityError> {
    let invalid_body = || IdentityError::BadRequest(INVALID_BODY.to_string());

    let value: Value = serde_json::from_slice(body).map_err(|_| invalid_body())?;

    match &value {
        Value::Object(fields) if !fields.is_empty() => {}
        _ => return Err(invalid_body()),
    }

    let request: IdentityRequest = serde_json::from_value(value).map_err(|_| invalid_body())?;

    match request.browser_id {
        None => Err(IdentityError::BadRequest(BROWSER_ID_REQUIRED.to_string())),
        Some(value) if is_blank(&value) => {
            Err(IdentityError::BadRequest(BROWSER_ID_REQUIRED.to_string()))
        }
        Some(Value::String(id)) => Ok(id),
        Some(_) => Err(IdentityError::BadRequest(BROWSER_ID_NOT_STRING.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn bad_request_message(body: &str) -> String {
        match parse_browser_id(body.as_bytes()) {
            Err(IdentityError::BadRequest(msg)) => msg,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_valid_browser_id() {
        assert_eq!(parse_browser_id(br#"{"browser_id": "abc"}"#).unwrap(), "abc");
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let id = parse_browser_id(br#"{"browser_id": "abc", "theme": "dark"}"#).unwrap();
        assert_eq!(id, "abc");
    }

    #[test]
    fn test_unparseable_body() {
        assert_eq!(bad_request_message(""), INVALID_BODY);
        assert_eq!(bad_request_message("not json"), INVALID_BODY);
        assert_eq!(bad_request_message(r#"{"browser_id": "#), INVALID_BODY);
    }

    #[test]
    fn test_non_object_or_empty_body() {
        assert_eq!(bad_request_message("{}"), INVALID_BODY);
        assert_eq!(bad_request_message("[]"), INVALID_BODY);
        assert_eq!(bad_request_message(r#""abc""#), INVALID_BODY);
        assert_eq!(bad_request_message("null"), INVALID_BODY);
    }

    #[test]
    fn test_missing_or_empty_browser_id() {
        assert_eq!(bad_request_message(r#"{"other": 1}"#), BROWSER_ID_REQUIRED);
        assert_eq!(bad_request_message(r#"{"browser_id": null}"#), BROWSER_ID_REQUIRED);
        assert_eq!(bad_request_message(r#"{"browser_id": ""}"#), BROWSER_ID_REQUIRED);
    }

    #[test]
    fn test_blank_non_string_browser_id_is_missing() {
        for body in [
            r#"{"browser_id": 0}"#,
            r#"{"browser_id": 0.0}"#,
            r#"{"browser_id": false}"#,
            r#"{"browser_id": []}"#,
            r#"{"browser_id": {}}"#,
        ] {
            assert_eq!(bad_request_message(body), BROWSER_ID_REQUIRED, "{body}");
        }
    }

    #[test]
    fn test_non_string_browser_id() {
        assert_eq!(bad_request_message(r#"{"browser_id": 42}"#), BROWSER_ID_NOT_STRING);
        assert_eq!(bad_request_message(r#"{"browser_id": true}"#), BROWSER_ID_NOT_STRING);
        assert_eq!(bad_request_message(r#"{"browser_id": ["a"]}"#), BROWSER_ID_NOT_STRING);
        assert_eq!(bad_request_message(r#"{"browser_id": {"a": 1}}"#), BROWSER_ID_NOT_STRING);
    }
}
