//! Builders
//!
//! Fluent builders for adapter configuration and the auth service.

pub mod config;
pub mod service;

pub use config::{auth_config, AuthConfigBuilder};
pub use service::{auth_service, AuthServiceBuilder};
