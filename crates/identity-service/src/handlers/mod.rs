//! HTTP request handlers for Identity Service.

pub mod health;
pub mod identity;
pub mod metrics;

pub use health::{health_check, readiness_check};
pub use identity::get_or_create_user;
pub use metrics::metrics_handler;
