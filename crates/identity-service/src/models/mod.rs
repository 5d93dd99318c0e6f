//! Data models for Identity Service.
//!
//! Contains the persisted identity record, resolver output and the HTTP
//! request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity document as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque client token, primary key.
    pub browser_id: String,

    /// Generated username, e.g. `swift_tiger_042`.
    pub username: String,

    /// Display color, `#` followed by six uppercase hex digits.
    pub color: String,

    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// A freshly generated identity before the store assigns `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub browser_id: String,
    pub username: String,
    pub color: String,
}

impl NewIdentity {
    /// The record as it reads back once the store stamps it.
    pub fn into_identity(self, created_at: DateTime<Utc>) -> Identity {
        Identity {
            browser_id: self.browser_id,
            username: self.username,
            color: self.color,
            created_at,
        }
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub username: String,
    pub color: String,

    /// True when this call generated and persisted the identity.
    pub created: bool,
}

/// Request body for the identity endpoint.
///
/// `browser_id` is kept as a raw JSON value so that missing, null and
/// non-string ids can be reported with distinct messages.
#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    #[serde(default)]
    pub browser_id: Option<serde_json::Value>,
}

/// Response body for the identity endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityResponse {
    pub username: String,
    pub color: String,
}

impl From<ResolvedIdentity> for IdentityResponse {
    fn from(resolved: ResolvedIdentity) -> Self {
        Self {
            username: resolved.username,
            color: resolved.color,
        }
    }
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// "healthy" or "unhealthy".
    pub store: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_response_serialization() {
        let response = IdentityResponse {
            username: "swift_tiger_042".to_string(),
            color: "#1A2B3C".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"username": "swift_tiger_042", "color": "#1A2B3C"})
        );
    }

    #[test]
    fn test_resolved_identity_drops_created_flag_on_the_wire() {
        let resolved = ResolvedIdentity {
            username: "calm_orca_007".to_string(),
            color: "#ABCDEF".to_string(),
            created: true,
        };

        let json = serde_json::to_string(&IdentityResponse::from(resolved)).unwrap();
        assert!(!json.contains("created"));
    }

    #[test]
    fn test_identity_request_missing_browser_id() {
        let request: IdentityRequest = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert!(request.browser_id.is_none());
    }

    #[test]
    fn test_identity_request_keeps_raw_value() {
        let request: IdentityRequest = serde_json::from_str(r#"{"browser_id": 12}"#).unwrap();
        assert_eq!(request.browser_id, Some(serde_json::json!(12)));
    }

    #[test]
    fn test_new_identity_into_identity() {
        let created_at = Utc::now();
        let identity = NewIdentity {
            browser_id: "abc".to_string(),
            username: "kind_lynx_100".to_string(),
            color: "#000000".to_string(),
        }
        .into_identity(created_at);

        assert_eq!(identity.browser_id, "abc");
        assert_eq!(identity.created_at, created_at);
    }
}
