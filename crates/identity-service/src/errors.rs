//! Identity Service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Error
//! bodies are a flat `{"error": "<message>"}` object; internal failures embed
//! the error detail after an `Internal server error: ` prefix and are also
//! logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Identity Service error type.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400 Bad Request
/// - MethodNotAllowed: 405 Method Not Allowed
/// - Store, CorruptRecord, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Corrupt identity record: {0}")]
    CorruptRecord(String),

    #[error("{0}")]
    Internal(String),
}

impl IdentityError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            IdentityError::BadRequest(_) => 400,
            IdentityError::MethodNotAllowed => 405,
            IdentityError::Store(_) | IdentityError::CorruptRecord(_) | IdentityError::Internal(_) => {
                500
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self {
            IdentityError::BadRequest(reason) => reason.clone(),
            IdentityError::MethodNotAllowed => self.to_string(),
            IdentityError::Store(_)
            | IdentityError::CorruptRecord(_)
            | IdentityError::Internal(_) => {
                tracing::error!(target: "identity.errors", error = %self, "Request failed");
                format!("Internal server error: {}", self)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Convert redis errors to IdentityError
impl From<redis::RedisError> for IdentityError {
    fn from(err: redis::RedisError) -> Self {
        IdentityError::Store(err.to_string())
    }
}
