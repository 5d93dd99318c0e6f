//! Identity Service Library
//!
//! Assigns every browser a stable, human-friendly username and display
//! color. The first request for a `browser_id` generates and persists an
//! identity; later requests return the stored one unchanged.
//!
//! # Architecture
//!
//! The service follows the Handler -> Service -> Repository pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP middleware (metrics)
//! - `models` - Data models and wire types
//! - `observability` - Metrics definitions
//! - `repositories` - Document store access (redis, in-memory)
//! - `routes` - Axum router setup
//! - `services` - Identity resolution and name generation

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
