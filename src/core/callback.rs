//! Redirect Callback Handling
//!
//! Startup sequence of an adapter instance: either process the
//! authorization response sitting on the current location, or silently
//! check for an existing session. Loading completes once afterwards.

use std::sync::Arc;

use crate::core::client::AuthClient;
use crate::core::navigator::{Location, Navigator};
use crate::core::state::{AuthState, Liveness};
use crate::core::subject::ReplaySubject;
use crate::error::{AuthError, AuthResult};
use crate::telemetry::{AuthLogContext, Logger};
use crate::types::{
    AppState, AuthConfig, CallbackParams, CheckSessionOptions, RedirectLoginResult,
    DEFAULT_TARGET,
};

/// How a startup run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// No callback to process; the silent session check ran.
    SessionChecked,
    /// The authorization response was exchanged; navigated to `target`.
    CallbackHandled { target: String },
    /// The exchange failed; navigated to `target`.
    CallbackFailed { target: String },
    /// The instance was torn down before the run resolved.
    Abandoned,
}

/// Drives the redirect callback handshake for one adapter instance.
pub struct RedirectCallbackCoordinator {
    config: AuthConfig,
    client: Arc<dyn AuthClient>,
    state: Arc<AuthState>,
    navigator: Arc<dyn Navigator>,
    location: Arc<dyn Location>,
    app_state: ReplaySubject<AppState>,
    liveness: Liveness,
    logger: Arc<dyn Logger>,
}

impl RedirectCallbackCoordinator {
    /// Create a coordinator bound to `state`'s liveness.
    pub fn new(
        config: AuthConfig,
        client: Arc<dyn AuthClient>,
        state: Arc<AuthState>,
        navigator: Arc<dyn Navigator>,
        location: Arc<dyn Location>,
        app_state: ReplaySubject<AppState>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let liveness = state.liveness();
        Self {
            config,
            client,
            state,
            navigator,
            location,
            app_state,
            liveness,
            logger,
        }
    }

    fn context(&self, operation: &str) -> AuthLogContext {
        AuthLogContext::new()
            .operation(operation)
            .client_id(&self.config.client_id)
            .instance(self.state.instance())
    }

    /// Whether the current location carries a callback this adapter should process.
    pub fn should_handle_callback(&self) -> bool {
        if self.config.skip_redirect_callback {
            return false;
        }

        let url = self.location.current_url();
        match CallbackParams::from_location(&url) {
            Ok(params) => params.is_authorization_response(),
            Err(e) => {
                self.logger.warn(
                    &format!("Could not parse current location: {}", e),
                    &self.context("should_handle_callback").extra("url", &url),
                );
                false
            }
        }
    }

    /// Run the startup sequence, then complete loading.
    ///
    /// If the instance is torn down while this is in flight, the result is
    /// ignored: no navigation and no loading transition happen on its behalf.
    pub async fn run(&self) -> CallbackOutcome {
        let outcome = if self.should_handle_callback() {
            let url = self.location.current_url();
            self.logger
                .info("Processing redirect callback", &self.context("run"));
            match self.process(Some(url)).await {
                Ok((_, outcome)) | Err((_, outcome)) => outcome,
            }
        } else {
            self.check_session().await
        };

        if !self.liveness.is_alive() {
            self.logger
                .debug("Instance torn down, dropping startup result", &self.context("run"));
            return CallbackOutcome::Abandoned;
        }

        self.state.set_loading(false);
        outcome
    }

    /// Handle a redirect callback on demand.
    ///
    /// Errors are recorded on the error channel and returned.
    pub async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> AuthResult<RedirectLoginResult> {
        match self.process(url).await {
            Ok((result, _)) => Ok(result),
            Err((error, _)) => Err(error),
        }
    }

    async fn check_session(&self) -> CallbackOutcome {
        let context = self.context("check_session");
        self.logger.debug("Checking session silently", &context);

        if let Err(error) = self.client.check_session(CheckSessionOptions::default()).await {
            self.logger
                .warn(&format!("Silent session check failed: {}", error), &context);
            if self.liveness.is_alive() {
                self.state.set_error(error);
            }
        }
        CallbackOutcome::SessionChecked
    }

    async fn process(
        &self,
        url: Option<String>,
    ) -> Result<(RedirectLoginResult, CallbackOutcome), (AuthError, CallbackOutcome)> {
        let context = self.context("handle_redirect_callback");
        let exchanged = self.client.handle_redirect_callback(url).await;

        if !self.liveness.is_alive() {
            return match exchanged {
                Ok(result) => Ok((result, CallbackOutcome::Abandoned)),
                Err(error) => Err((error, CallbackOutcome::Abandoned)),
            };
        }

        match exchanged {
            Ok(result) => {
                if !self.state.loading() {
                    self.state.refresh();
                }

                let target = result
                    .app_state
                    .as_ref()
                    .and_then(|app_state| app_state.target.clone())
                    .unwrap_or_else(|| DEFAULT_TARGET.to_string());
                if let Some(app_state) = &result.app_state {
                    self.app_state.next(app_state.clone());
                }

                self.logger
                    .info("Redirect callback handled", &context.extra("target", &target));
                self.navigate(&target).await;
                Ok((result, CallbackOutcome::CallbackHandled { target }))
            }
            Err(error) => {
                let target = self
                    .config
                    .error_path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TARGET.to_string());

                self.logger.error(
                    &format!("Redirect callback failed: {}", error),
                    &context.extra("target", &target),
                );
                self.state.set_error(error.clone());
                self.navigate(&target).await;
                Err((error, CallbackOutcome::CallbackFailed { target }))
            }
        }
    }

    async fn navigate(&self, target: &str) {
        match self.navigator.navigate_by_url(target).await {
            Ok(true) => {}
            Ok(false) => self.logger.warn(
                "Navigation was rejected",
                &self.context("navigate").extra("target", target),
            ),
            Err(error) => self.state.set_error(error),
        }
    }
}
