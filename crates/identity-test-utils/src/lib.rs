//! # Identity Test Utilities
//!
//! Shared test utilities for the Identity Service.
//!
//! This crate provides:
//! - Server test harness (`TestIdentityServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use identity_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestIdentityServer::spawn().await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .post(server.url())
//!         .json(&serde_json::json!({ "browser_id": "abc" }))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
