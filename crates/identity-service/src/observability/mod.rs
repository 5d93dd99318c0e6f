//! Observability module for Identity Service.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;
