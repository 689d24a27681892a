//! Configuration Types
//!
//! Adapter configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AuthResult, ConfigurationError};

/// Adapter configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity provider domain.
    pub domain: String,
    /// Client identifier.
    pub client_id: String,
    /// Where the provider redirects back to after login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// API audience requested by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Default scope.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Route to navigate to when the redirect callback fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,
    /// Leave redirect callback handling to another provider sharing the callback path.
    #[serde(default)]
    pub skip_redirect_callback: bool,
    /// Use rotating refresh tokens instead of iframe-based silent auth.
    #[serde(default)]
    pub use_refresh_tokens: bool,
    /// Where the external client caches tokens.
    #[serde(default)]
    pub cache_location: CacheLocation,
    /// Extra parameters forwarded on every authorize request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub authorization_params: HashMap<String, String>,
}

impl AuthConfig {
    /// Create a configuration with the required fields and defaults elsewhere.
    pub fn new(domain: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            redirect_uri: None,
            audience: None,
            scope: default_scope(),
            error_path: None,
            skip_redirect_callback: false,
            use_refresh_tokens: false,
            cache_location: CacheLocation::default(),
            authorization_params: HashMap::new(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        if self.domain.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "domain".to_string(),
            }
            .into());
        }

        if self.client_id.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "client_id".to_string(),
            }
            .into());
        }

        if let Some(path) = &self.error_path {
            if !path.starts_with('/') {
                return Err(ConfigurationError::InvalidConfig {
                    message: format!("error_path must be an absolute path, got {}", path),
                }
                .into());
            }
        }

        Ok(())
    }
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

/// Token cache location used by the external client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLocation {
    /// In-memory cache, lost on reload.
    #[default]
    Memory,
    /// Browser local storage.
    LocalStorage,
}

/// Default scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "openid profile email";

/// Route navigated to after a callback without a preserved target.
pub const DEFAULT_TARGET: &str = "/";
