//! Client Adapter
//!
//! Resolves configuration and constructs the external client from it.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::core::client::AuthClient;
use crate::error::{AuthResult, ConfigurationError};
use crate::types::AuthConfig;

/// Builds the external client from resolved configuration.
pub trait AuthClientFactory: Send + Sync {
    /// Build a client for an already validated `config`.
    fn create(&self, config: &AuthConfig) -> AuthResult<Arc<dyn AuthClient>>;
}

impl<F> AuthClientFactory for F
where
    F: Fn(&AuthConfig) -> AuthResult<Arc<dyn AuthClient>> + Send + Sync,
{
    fn create(&self, config: &AuthConfig) -> AuthResult<Arc<dyn AuthClient>> {
        self(config)
    }
}

/// Validate `config` and build the client. Configuration errors are fatal.
pub fn create_auth_client(
    config: &AuthConfig,
    factory: &dyn AuthClientFactory,
) -> AuthResult<Arc<dyn AuthClient>> {
    config.validate()?;
    factory.create(config)
}

/// Source of the adapter configuration, possibly available only later.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn resolve(&self) -> AuthResult<AuthConfig>;
}

/// Configuration known up front.
#[derive(Clone, Debug)]
pub struct StaticConfigSource {
    config: AuthConfig,
}

impl StaticConfigSource {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn resolve(&self) -> AuthResult<AuthConfig> {
        Ok(self.config.clone())
    }
}

/// Configuration supplied after construction, e.g. fetched at app start.
///
/// `resolve` waits until [`set`](DeferredConfigSource::set) is called.
pub struct DeferredConfigSource {
    sender: watch::Sender<Option<AuthConfig>>,
}

impl DeferredConfigSource {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Provide the configuration, waking every pending `resolve`.
    pub fn set(&self, config: AuthConfig) {
        self.sender.send_replace(Some(config));
    }

    /// Configuration, if already provided.
    pub fn get(&self) -> Option<AuthConfig> {
        self.sender.borrow().clone()
    }
}

impl Default for DeferredConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigSource for DeferredConfigSource {
    async fn resolve(&self) -> AuthResult<AuthConfig> {
        let mut receiver = self.sender.subscribe();
        let config = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ConfigurationError::NotProvided)?
            .clone();
        config.ok_or_else(|| ConfigurationError::NotProvided.into())
    }
}
