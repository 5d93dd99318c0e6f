//! Service layer for Identity Service.
//!
//! # Components
//!
//! - `identity_resolver` - Get-or-create resolution against the identity store
//! - `name_generator` - Username and color generation

pub mod identity_resolver;
pub mod name_generator;

pub use identity_resolver::IdentityResolver;
