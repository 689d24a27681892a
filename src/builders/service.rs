//! Service Builder
//!
//! Wires configuration, client, router and logger into an [`AuthService`].

use std::sync::Arc;

use crate::client::AuthService;
use crate::core::{
    create_auth_client, AuthClient, AuthClientFactory, ConfigSource, Location, Navigator,
    StaticConfigSource, StaticLocation,
};
use crate::error::{AuthResult, ConfigurationError};
use crate::telemetry::{Logger, TracingLogger};
use crate::types::AuthConfig;

/// Builder for [`AuthService`].
#[derive(Default)]
pub struct AuthServiceBuilder {
    config_source: Option<Arc<dyn ConfigSource>>,
    client: Option<Arc<dyn AuthClient>>,
    factory: Option<Arc<dyn AuthClientFactory>>,
    navigator: Option<Arc<dyn Navigator>>,
    location: Option<Arc<dyn Location>>,
    logger: Option<Arc<dyn Logger>>,
}

impl AuthServiceBuilder {
    /// Create new service builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a configuration known up front.
    pub fn config(self, config: AuthConfig) -> Self {
        self.config_source(Arc::new(StaticConfigSource::new(config)))
    }

    /// Resolve configuration from `source` when building.
    pub fn config_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Use an already constructed client.
    pub fn client(mut self, client: Arc<dyn AuthClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Construct the client from the resolved configuration.
    pub fn client_factory(mut self, factory: Arc<dyn AuthClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Defaults to `/`.
    pub fn location(mut self, location: Arc<dyn Location>) -> Self {
        self.location = Some(location);
        self
    }

    /// Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Resolve configuration, construct the client and start the service.
    ///
    /// Configuration is fully resolved before any state is created.
    pub async fn build(self) -> AuthResult<AuthService> {
        let source = self.config_source.ok_or_else(|| missing("config"))?;
        let navigator = self.navigator.ok_or_else(|| missing("navigator"))?;

        let config = source.resolve().await?;
        config.validate()?;

        let client = match (self.client, self.factory) {
            (Some(client), _) => client,
            (None, Some(factory)) => create_auth_client(&config, factory.as_ref())?,
            (None, None) => return Err(missing("client").into()),
        };

        let location = self
            .location
            .unwrap_or_else(|| Arc::new(StaticLocation::default()));
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));

        AuthService::new(config, client, navigator, location, logger)
    }
}

fn missing(field: &str) -> ConfigurationError {
    ConfigurationError::MissingRequired {
        field: field.to_string(),
    }
}

/// Create a new service builder.
pub fn auth_service() -> AuthServiceBuilder {
    AuthServiceBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DeferredConfigSource, MockAuthClient, MockNavigator};
    use crate::error::AuthError;

    fn config() -> AuthConfig {
        AuthConfig::new("example.auth.com", "client")
    }

    #[tokio::test]
    async fn test_build_with_client() {
        let service = auth_service()
            .config(config())
            .client(Arc::new(MockAuthClient::new()))
            .navigator(Arc::new(MockNavigator::new()))
            .build()
            .await
            .unwrap();

        assert_eq!(service.config().client_id, "client");
    }

    #[tokio::test]
    async fn test_build_with_factory() {
        let factory = |config: &AuthConfig| -> AuthResult<Arc<dyn AuthClient>> {
            assert_eq!(config.domain, "example.auth.com");
            Ok(Arc::new(MockAuthClient::new()))
        };

        let service = auth_service()
            .config(config())
            .client_factory(Arc::new(factory))
            .navigator(Arc::new(MockNavigator::new()))
            .build()
            .await;

        assert!(service.is_ok());
    }

    #[tokio::test]
    async fn test_build_requires_client() {
        let result = auth_service()
            .config(config())
            .navigator(Arc::new(MockNavigator::new()))
            .build()
            .await;

        assert!(matches!(
            result.err().unwrap(),
            AuthError::Configuration(ConfigurationError::MissingRequired { field }) if field == "client"
        ));
    }

    #[tokio::test]
    async fn test_build_waits_for_deferred_config() {
        let source = Arc::new(DeferredConfigSource::new());
        let client = Arc::new(MockAuthClient::new());

        let pending = tokio::spawn({
            let source = source.clone();
            let client = client.clone();
            async move {
                auth_service()
                    .config_source(source)
                    .client(client)
                    .navigator(Arc::new(MockNavigator::new()))
                    .build()
                    .await
            }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        source.set(config());
        let service = pending.await.unwrap().unwrap();
        service.startup_outcome().await;

        assert_eq!(service.config(), &config());
        assert_eq!(client.calls(crate::core::ClientOperation::CheckSession), 1);
    }

    #[tokio::test]
    async fn test_invalid_resolved_config() {
        let result = auth_service()
            .config(AuthConfig::new("", "client"))
            .client(Arc::new(MockAuthClient::new()))
            .navigator(Arc::new(MockNavigator::new()))
            .build()
            .await;

        assert_eq!(result.err().unwrap().error_code(), "AUTH_CONFIG");
    }
}
