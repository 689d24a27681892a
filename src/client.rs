//! Auth Service
//!
//! High-level facade: exposes the reactive state as streams and passes
//! operations through to the external client, feeding their results back
//! into the state.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::core::{
    AuthClient, AuthState, CallbackOutcome, Location, Navigator, RedirectCallbackCoordinator,
    ReplaySubject, Subscription,
};
use crate::error::{AuthError, AuthResult};
use crate::telemetry::{AuthLogContext, Logger};
use crate::types::{
    AppState, AuthConfig, AuthorizeUrlOptions, GetTokenSilentlyOptions, GetTokenWithPopupOptions,
    IdTokenClaims, LogoutOptions, LogoutUrlOptions, PopupConfig, PopupLoginOptions,
    RedirectLoginOptions, RedirectLoginResult, TokenResult, UserProfile,
};

/// Authentication service for one application lifetime.
///
/// Construct once at the composition root and share it. Dropping the
/// service tears it down.
pub struct AuthService {
    config: AuthConfig,
    client: Arc<dyn AuthClient>,
    state: Arc<AuthState>,
    coordinator: Arc<RedirectCallbackCoordinator>,
    app_state: ReplaySubject<AppState>,
    startup: Mutex<Option<JoinHandle<CallbackOutcome>>>,
    logger: Arc<dyn Logger>,
}

impl AuthService {
    /// Create the service and start the redirect callback / session check
    /// sequence in the background.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(
        config: AuthConfig,
        client: Arc<dyn AuthClient>,
        navigator: Arc<dyn Navigator>,
        location: Arc<dyn Location>,
        logger: Arc<dyn Logger>,
    ) -> AuthResult<Self> {
        config.validate()?;

        let state = Arc::new(AuthState::new(client.clone(), logger.clone()));
        let app_state = ReplaySubject::new();
        let coordinator = Arc::new(RedirectCallbackCoordinator::new(
            config.clone(),
            client.clone(),
            state.clone(),
            navigator,
            location,
            app_state.clone(),
            logger.clone(),
        ));

        let startup = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.run().await }
        });

        logger.debug(
            "Auth service started",
            &AuthLogContext::new()
                .operation("new")
                .client_id(&config.client_id)
                .instance(state.instance()),
        );

        Ok(Self {
            config,
            client,
            state,
            coordinator,
            app_state,
            startup: Mutex::new(Some(startup)),
            logger,
        })
    }

    fn context(&self, operation: &str) -> AuthLogContext {
        AuthLogContext::new()
            .operation(operation)
            .client_id(&self.config.client_id)
            .instance(self.state.instance())
    }

    /// Resolved configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Underlying reactive state.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Wait for the startup sequence and return how it ended.
    ///
    /// Returns `None` if it was already awaited.
    pub async fn startup_outcome(&self) -> Option<CallbackOutcome> {
        let handle = self
            .startup
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()?;
        handle.await.ok()
    }

    // ========== Streams ==========

    /// Loading flag.
    pub fn is_loading(&self) -> Subscription<bool> {
        self.state.is_loading()
    }

    /// Authentication flag.
    pub fn is_authenticated(&self) -> Subscription<bool> {
        self.state.is_authenticated()
    }

    /// User profile.
    pub fn user(&self) -> Subscription<Option<UserProfile>> {
        self.state.user()
    }

    /// ID token claims.
    pub fn id_token_claims(&self) -> Subscription<Option<IdTokenClaims>> {
        self.state.id_token_claims()
    }

    /// Most recent error from any operation.
    pub fn error(&self) -> Subscription<AuthError> {
        self.state.error()
    }

    /// Application state restored by the last redirect callback.
    pub fn app_state(&self) -> Subscription<AppState> {
        self.app_state.subscribe()
    }

    // ========== Login / Logout ==========

    /// Redirect to the provider's login page.
    pub async fn login_with_redirect(&self, options: RedirectLoginOptions) -> AuthResult<()> {
        self.logger
            .info("Starting redirect login", &self.context("login_with_redirect"));
        self.client.login_with_redirect(options).await
    }

    /// Log in through a popup, then re-evaluate authentication.
    pub async fn login_with_popup(
        &self,
        options: PopupLoginOptions,
        config: PopupConfig,
    ) -> AuthResult<()> {
        let context = self.context("login_with_popup");
        match self.client.login_with_popup(options, config).await {
            Ok(()) => {
                self.state.refresh();
                Ok(())
            }
            Err(error) => {
                self.logger
                    .warn(&format!("Popup login failed: {}", error), &context);
                Err(error)
            }
        }
    }

    /// Log out.
    ///
    /// With `local_only`, the client only clears its local session and the
    /// authentication flag drops to `false` immediately.
    pub fn logout(&self, options: LogoutOptions) {
        let local_only = options.local_only;
        self.logger.info(
            "Logging out",
            &self.context("logout").extra("local_only", local_only),
        );

        self.client.logout(options);
        if local_only {
            self.state.reset_authentication();
        }
    }

    // ========== Tokens ==========

    /// Get an access token silently.
    ///
    /// A new token re-evaluates authentication. Failures are recorded on
    /// the error channel and returned.
    pub async fn get_access_token_silently(
        &self,
        options: GetTokenSilentlyOptions,
    ) -> AuthResult<TokenResult> {
        match self.client.get_token_silently(options).await {
            Ok(result) => {
                self.state.set_access_token(result.access_token());
                Ok(result)
            }
            Err(error) => {
                self.state.set_error(error.clone());
                Err(error)
            }
        }
    }

    /// Get an access token through a popup.
    ///
    /// Same feedback rules as [`get_access_token_silently`](Self::get_access_token_silently).
    pub async fn get_access_token_with_popup(
        &self,
        options: GetTokenWithPopupOptions,
    ) -> AuthResult<String> {
        match self.client.get_token_with_popup(options).await {
            Ok(token) => {
                self.state.set_access_token(token.as_str());
                Ok(token)
            }
            Err(error) => {
                self.state.set_error(error.clone());
                Err(error)
            }
        }
    }

    // ========== Callback ==========

    /// Process a redirect callback manually, e.g. when
    /// `skip_redirect_callback` is set.
    pub async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> AuthResult<RedirectLoginResult> {
        self.coordinator.handle_redirect_callback(url).await
    }

    // ========== URLs ==========

    /// Build the authorize URL.
    pub async fn build_authorize_url(&self, options: AuthorizeUrlOptions) -> AuthResult<String> {
        self.client.build_authorize_url(options).await
    }

    /// Build the logout URL.
    pub fn build_logout_url(&self, options: LogoutUrlOptions) -> String {
        self.client.build_logout_url(options)
    }

    // ========== Lifecycle ==========

    /// Re-evaluate authentication.
    pub fn refresh(&self) {
        self.state.refresh();
    }

    /// Tear down the service. In-flight startup work is left to finish
    /// but its results are ignored.
    pub fn destroy(&self) {
        if self.state.liveness().is_alive() {
            self.logger.debug("Auth service destroyed", &self.context("destroy"));
        }
        self.state.shutdown();
        self.app_state.complete();
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClientOperation, MockAuthClient, MockNavigator, StaticLocation};
    use crate::error::ClientError;
    use crate::telemetry::InMemoryLogger;
    use futures::StreamExt;
    use tokio_test::assert_ok;

    fn create_service(client: &Arc<MockAuthClient>, url: &str) -> AuthService {
        AuthService::new(
            AuthConfig::new("example.auth.com", "client"),
            client.clone(),
            Arc::new(MockNavigator::new()),
            Arc::new(StaticLocation::new(url)),
            Arc::new(InMemoryLogger::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let result = AuthService::new(
            AuthConfig::new("example.auth.com", ""),
            Arc::new(MockAuthClient::new()),
            Arc::new(MockNavigator::new()),
            Arc::new(StaticLocation::default()),
            Arc::new(InMemoryLogger::new()),
        );

        assert_eq!(result.err().unwrap().error_code(), "AUTH_CONFIG");
    }

    #[tokio::test]
    async fn test_startup_outcome() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");

        assert_eq!(
            service.startup_outcome().await,
            Some(CallbackOutcome::SessionChecked)
        );
        assert_eq!(service.startup_outcome().await, None);
        assert!(!service.state().loading());
    }

    #[tokio::test]
    async fn test_silent_token_triggers_evaluation() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");
        let mut authenticated = service.is_authenticated();
        assert_eq!(authenticated.recv().await, Some(false));

        client.set_authenticated(true).set_access_token("t1");
        let token = service
            .get_access_token_silently(GetTokenSilentlyOptions::default())
            .await
            .unwrap();

        assert_eq!(token, TokenResult::Token("t1".to_string()));
        assert_eq!(authenticated.recv().await, Some(true));
    }

    #[tokio::test]
    async fn test_token_error_recorded_and_returned() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");
        service.startup_outcome().await;
        let mut errors = service.error();

        client.fail_next(
            ClientOperation::GetTokenWithPopup,
            ClientError::PopupTimeout {
                timeout_in_seconds: 60,
            },
        );
        let error = service
            .get_access_token_with_popup(GetTokenWithPopupOptions::default())
            .await
            .unwrap_err();

        assert_eq!(errors.recv().await, Some(error));
    }

    #[tokio::test]
    async fn test_popup_login_refreshes() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");
        let mut authenticated = service.is_authenticated();
        assert_eq!(authenticated.recv().await, Some(false));

        assert_ok!(
            service
                .login_with_popup(PopupLoginOptions::default(), PopupConfig::default())
                .await
        );

        assert_eq!(authenticated.recv().await, Some(true));
    }

    #[tokio::test]
    async fn test_redirect_login_passes_app_state() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");

        service
            .login_with_redirect(RedirectLoginOptions {
                app_state: Some(AppState::with_target("/orders")),
                ..Default::default()
            })
            .await
            .unwrap();

        let history = client.get_redirect_login_history();
        assert_eq!(
            history[0].app_state.as_ref().unwrap().target.as_deref(),
            Some("/orders")
        );
    }

    #[tokio::test]
    async fn test_network_logout_does_not_reset_locally() {
        let client = Arc::new(MockAuthClient::new());
        client.set_authenticated(true);
        let service = create_service(&client, "/");
        let mut authenticated = service.is_authenticated();
        assert_eq!(authenticated.recv().await, Some(true));

        service.logout(LogoutOptions {
            return_to: Some("https://app.example.com".to_string()),
            ..Default::default()
        });

        assert_eq!(client.network_logouts(), 1);
        assert!(authenticated.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_build_urls_pass_through() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");

        let url = service
            .build_authorize_url(AuthorizeUrlOptions::default())
            .await
            .unwrap();
        assert_eq!(url, "https://mock.auth.example.com/authorize");

        let url = service.build_logout_url(LogoutUrlOptions {
            federated: true,
            ..Default::default()
        });
        assert_eq!(url, "https://mock.auth.example.com/v2/logout?federated");
        assert_eq!(client.calls(ClientOperation::BuildLogoutUrl), 1);
    }

    #[tokio::test]
    async fn test_destroy_ends_streams() {
        let client = Arc::new(MockAuthClient::new());
        let service = create_service(&client, "/");
        service.startup_outcome().await;
        let mut app_state = service.app_state();

        service.destroy();
        service.refresh();

        assert_eq!(app_state.recv().await, None);
        let loading: Vec<bool> = service.is_loading().collect().await;
        assert_eq!(loading, vec![false]);
    }
}
