//! Route Guard
//!
//! Blocks navigation to protected routes until the user is authenticated,
//! sending unauthenticated users to the login page with the requested
//! route preserved in the app state.

use std::sync::Arc;

use crate::client::AuthService;
use crate::core::Location;
use crate::error::AuthResult;
use crate::types::{AppState, RedirectLoginOptions};

/// Guard for protected routes.
pub struct AuthGuard {
    service: Arc<AuthService>,
    location: Arc<dyn Location>,
}

impl AuthGuard {
    pub fn new(service: Arc<AuthService>, location: Arc<dyn Location>) -> Self {
        Self { service, location }
    }

    /// Whether navigation to `url` may proceed.
    ///
    /// Waits for loading to complete. When unauthenticated, starts a
    /// redirect login that returns to `url` and denies the navigation.
    /// Fails without starting a login if the authentication check failed
    /// before any flag was known.
    pub async fn can_activate(&self, url: &str) -> AuthResult<bool> {
        if self.service.state().wait_for_authenticated().await? {
            return Ok(true);
        }

        self.service
            .login_with_redirect(RedirectLoginOptions {
                app_state: Some(AppState::with_target(url)),
                ..Default::default()
            })
            .await?;
        Ok(false)
    }

    /// As [`can_activate`](Self::can_activate), for the current location.
    pub async fn can_load(&self) -> AuthResult<bool> {
        let url = self.location.current_url();
        self.can_activate(&url).await
    }
}
