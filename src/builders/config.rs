//! Configuration Builder
//!
//! Fluent builder for adapter configuration.

use std::collections::HashMap;

use crate::error::{AuthResult, ConfigurationError};
use crate::types::{AuthConfig, CacheLocation, DEFAULT_SCOPE};

/// Adapter configuration builder.
#[derive(Default)]
pub struct AuthConfigBuilder {
    domain: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    audience: Option<String>,
    scope: Option<String>,
    error_path: Option<String>,
    skip_redirect_callback: bool,
    use_refresh_tokens: bool,
    cache_location: CacheLocation,
    authorization_params: HashMap<String, String>,
}

impl AuthConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set provider domain.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set redirect URI.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Set default audience.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set default scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the route used after a failed redirect callback.
    pub fn error_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = Some(path.into());
        self
    }

    /// Leave redirect callback processing to someone else.
    pub fn skip_redirect_callback(mut self, skip: bool) -> Self {
        self.skip_redirect_callback = skip;
        self
    }

    pub fn use_refresh_tokens(mut self, enable: bool) -> Self {
        self.use_refresh_tokens = enable;
        self
    }

    pub fn cache_location(mut self, location: CacheLocation) -> Self {
        self.cache_location = location;
        self
    }

    /// Add an authorize parameter sent with every login.
    pub fn authorization_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.authorization_params.insert(key.into(), value.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> AuthResult<AuthConfig> {
        let domain = self.domain.ok_or_else(|| ConfigurationError::MissingRequired {
            field: "domain".to_string(),
        })?;

        let client_id = self.client_id.ok_or_else(|| ConfigurationError::MissingRequired {
            field: "client_id".to_string(),
        })?;

        let config = AuthConfig {
            domain,
            client_id,
            redirect_uri: self.redirect_uri,
            audience: self.audience,
            scope: self.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            error_path: self.error_path,
            skip_redirect_callback: self.skip_redirect_callback,
            use_refresh_tokens: self.use_refresh_tokens,
            cache_location: self.cache_location,
            authorization_params: self.authorization_params,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Create a new configuration builder.
pub fn auth_config() -> AuthConfigBuilder {
    AuthConfigBuilder::new()
}
