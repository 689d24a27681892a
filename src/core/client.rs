//! External Auth Client
//!
//! The contract of the wrapped browser OAuth2/OIDC client. The adapter
//! never speaks the protocol itself; everything goes through this trait.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{AuthError, AuthResult, ClientError};
use crate::types::{
    AuthorizeUrlOptions, CheckSessionOptions, GetIdTokenClaimsOptions, GetTokenSilentlyOptions,
    GetTokenWithPopupOptions, GetUserOptions, IdTokenClaims, LogoutOptions, LogoutUrlOptions,
    PopupConfig, PopupLoginOptions, RedirectLoginOptions, RedirectLoginResult, TokenDetails,
    TokenResult, UserProfile,
};

/// External OAuth client interface (for dependency injection).
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Silently check whether the provider still has a session.
    async fn check_session(&self, options: CheckSessionOptions) -> AuthResult<()>;

    /// Whether the client currently holds a valid session.
    async fn is_authenticated(&self) -> AuthResult<bool>;

    /// User profile of the current session.
    async fn get_user(&self, options: GetUserOptions) -> AuthResult<Option<UserProfile>>;

    /// Claims of the current ID token.
    async fn get_id_token_claims(
        &self,
        options: GetIdTokenClaimsOptions,
    ) -> AuthResult<Option<IdTokenClaims>>;

    /// Start a redirect login.
    async fn login_with_redirect(&self, options: RedirectLoginOptions) -> AuthResult<()>;

    /// Log in through a popup window.
    async fn login_with_popup(
        &self,
        options: PopupLoginOptions,
        config: PopupConfig,
    ) -> AuthResult<()>;

    /// Log out. With `local_only` the client only clears its local session.
    fn logout(&self, options: LogoutOptions);

    /// Get an access token without user interaction.
    async fn get_token_silently(&self, options: GetTokenSilentlyOptions)
        -> AuthResult<TokenResult>;

    /// Get an access token through a popup window.
    async fn get_token_with_popup(&self, options: GetTokenWithPopupOptions) -> AuthResult<String>;

    /// Exchange the authorization response in `url` for tokens.
    async fn handle_redirect_callback(&self, url: Option<String>)
        -> AuthResult<RedirectLoginResult>;

    /// Build the authorize URL without navigating.
    async fn build_authorize_url(&self, options: AuthorizeUrlOptions) -> AuthResult<String>;

    /// Build the logout URL without navigating.
    fn build_logout_url(&self, options: LogoutUrlOptions) -> String;
}

/// Operations of [`AuthClient`], used to script and inspect [`MockAuthClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientOperation {
    CheckSession,
    IsAuthenticated,
    GetUser,
    GetIdTokenClaims,
    LoginWithRedirect,
    LoginWithPopup,
    Logout,
    GetTokenSilently,
    GetTokenWithPopup,
    HandleRedirectCallback,
    BuildAuthorizeUrl,
    BuildLogoutUrl,
}

/// Mock auth client for testing.
pub struct MockAuthClient {
    domain: String,
    authenticated: Mutex<bool>,
    scripted_checks: Mutex<VecDeque<(AuthResult<bool>, Duration)>>,
    user: Mutex<Option<UserProfile>>,
    claims: Mutex<Option<IdTokenClaims>>,
    access_token: Mutex<String>,
    callback_result: Mutex<RedirectLoginResult>,
    next_errors: Mutex<HashMap<ClientOperation, AuthError>>,
    calls: Mutex<HashMap<ClientOperation, usize>>,
    redirect_login_history: Mutex<Vec<RedirectLoginOptions>>,
    logout_history: Mutex<Vec<LogoutOptions>>,
    callback_url_history: Mutex<Vec<Option<String>>>,
    network_logouts: Mutex<usize>,
    session_gate: watch::Sender<bool>,
}

impl MockAuthClient {
    /// Create new mock client with no session.
    pub fn new() -> Self {
        let (session_gate, _) = watch::channel(false);
        Self {
            domain: "mock.auth.example.com".to_string(),
            authenticated: Mutex::new(false),
            scripted_checks: Mutex::new(VecDeque::new()),
            user: Mutex::new(None),
            claims: Mutex::new(None),
            access_token: Mutex::new("mock-access-token".to_string()),
            callback_result: Mutex::new(RedirectLoginResult::default()),
            next_errors: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            redirect_login_history: Mutex::new(Vec::new()),
            logout_history: Mutex::new(Vec::new()),
            callback_url_history: Mutex::new(Vec::new()),
            network_logouts: Mutex::new(0),
            session_gate,
        }
    }

    /// Set the session flag reported by `is_authenticated`.
    pub fn set_authenticated(&self, authenticated: bool) -> &Self {
        *self.authenticated.lock().unwrap() = authenticated;
        self
    }

    /// Queue a one-off `is_authenticated` answer that resolves after `delay`.
    ///
    /// Queued answers are consumed in order before falling back to the
    /// session flag.
    pub fn push_is_authenticated(&self, result: AuthResult<bool>, delay: Duration) -> &Self {
        self.scripted_checks
            .lock()
            .unwrap()
            .push_back((result, delay));
        self
    }

    /// Set the user profile.
    pub fn set_user(&self, user: Option<UserProfile>) -> &Self {
        *self.user.lock().unwrap() = user;
        self
    }

    /// Set the ID token claims.
    pub fn set_id_token_claims(&self, claims: Option<IdTokenClaims>) -> &Self {
        *self.claims.lock().unwrap() = claims;
        self
    }

    /// Set the access token handed out by token operations.
    pub fn set_access_token(&self, token: impl Into<String>) -> &Self {
        *self.access_token.lock().unwrap() = token.into();
        self
    }

    /// Set the result of the next redirect callback exchange.
    pub fn set_callback_result(&self, result: RedirectLoginResult) -> &Self {
        *self.callback_result.lock().unwrap() = result;
        self
    }

    /// Make the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: ClientOperation, error: impl Into<AuthError>) -> &Self {
        self.next_errors
            .lock()
            .unwrap()
            .insert(operation, error.into());
        self
    }

    /// Hold `check_session` calls until [`release_check_session`](Self::release_check_session).
    pub fn block_check_session(&self) -> &Self {
        self.session_gate.send_replace(true);
        self
    }

    /// Let held `check_session` calls resolve.
    pub fn release_check_session(&self) -> &Self {
        self.session_gate.send_replace(false);
        self
    }

    /// Number of calls made to `operation`.
    pub fn calls(&self, operation: ClientOperation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Get redirect login history.
    pub fn get_redirect_login_history(&self) -> Vec<RedirectLoginOptions> {
        self.redirect_login_history.lock().unwrap().clone()
    }

    /// Get logout history.
    pub fn get_logout_history(&self) -> Vec<LogoutOptions> {
        self.logout_history.lock().unwrap().clone()
    }

    /// Get the URLs passed to `handle_redirect_callback`.
    pub fn get_callback_url_history(&self) -> Vec<Option<String>> {
        self.callback_url_history.lock().unwrap().clone()
    }

    /// Logouts that would have contacted the provider.
    pub fn network_logouts(&self) -> usize {
        *self.network_logouts.lock().unwrap()
    }

    fn record(&self, operation: ClientOperation) -> AuthResult<()> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        match self.next_errors.lock().unwrap().remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn issue_token(&self) -> String {
        self.access_token.lock().unwrap().clone()
    }
}

impl Default for MockAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthClient for MockAuthClient {
    async fn check_session(&self, _options: CheckSessionOptions) -> AuthResult<()> {
        let mut gate = self.session_gate.subscribe();
        // The sender lives in self, so the gate cannot close while we wait.
        let _ = gate.wait_for(|blocked| !*blocked).await;
        self.record(ClientOperation::CheckSession)
    }

    async fn is_authenticated(&self) -> AuthResult<bool> {
        self.record(ClientOperation::IsAuthenticated)?;

        let scripted = self.scripted_checks.lock().unwrap().pop_front();
        match scripted {
            Some((result, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(*self.authenticated.lock().unwrap()),
        }
    }

    async fn get_user(&self, _options: GetUserOptions) -> AuthResult<Option<UserProfile>> {
        self.record(ClientOperation::GetUser)?;
        Ok(self.user.lock().unwrap().clone())
    }

    async fn get_id_token_claims(
        &self,
        _options: GetIdTokenClaimsOptions,
    ) -> AuthResult<Option<IdTokenClaims>> {
        self.record(ClientOperation::GetIdTokenClaims)?;
        Ok(self.claims.lock().unwrap().clone())
    }

    async fn login_with_redirect(&self, options: RedirectLoginOptions) -> AuthResult<()> {
        self.record(ClientOperation::LoginWithRedirect)?;
        self.redirect_login_history.lock().unwrap().push(options);
        Ok(())
    }

    async fn login_with_popup(
        &self,
        _options: PopupLoginOptions,
        _config: PopupConfig,
    ) -> AuthResult<()> {
        self.record(ClientOperation::LoginWithPopup)?;
        self.set_authenticated(true);
        Ok(())
    }

    fn logout(&self, options: LogoutOptions) {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(ClientOperation::Logout)
            .or_insert(0) += 1;

        if !options.local_only {
            *self.network_logouts.lock().unwrap() += 1;
        }
        self.set_authenticated(false);
        self.logout_history.lock().unwrap().push(options);
    }

    async fn get_token_silently(
        &self,
        options: GetTokenSilentlyOptions,
    ) -> AuthResult<TokenResult> {
        self.record(ClientOperation::GetTokenSilently)?;
        let access_token = self.issue_token();

        if options.detailed_response {
            let id_token = self.claims.lock().unwrap().as_ref().map(|c| c.raw.clone());
            return Ok(TokenResult::Detailed(TokenDetails {
                access_token,
                id_token,
                expires_in: Some(86400),
                scope: options.scope,
            }));
        }
        Ok(TokenResult::Token(access_token))
    }

    async fn get_token_with_popup(
        &self,
        _options: GetTokenWithPopupOptions,
    ) -> AuthResult<String> {
        self.record(ClientOperation::GetTokenWithPopup)?;
        Ok(self.issue_token())
    }

    async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> AuthResult<RedirectLoginResult> {
        self.callback_url_history.lock().unwrap().push(url);
        self.record(ClientOperation::HandleRedirectCallback)?;
        self.set_authenticated(true);
        Ok(self.callback_result.lock().unwrap().clone())
    }

    async fn build_authorize_url(&self, options: AuthorizeUrlOptions) -> AuthResult<String> {
        self.record(ClientOperation::BuildAuthorizeUrl)?;

        let mut url = url::Url::parse(&format!("https://{}/authorize", self.domain))
            .map_err(|e| ClientError::RequestFailed {
                message: e.to_string(),
            })?;
        let mut params: Vec<(&str, &str)> = options
            .authorization_params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        params.sort();
        if let Some(redirect_uri) = &options.redirect_uri {
            params.insert(0, ("redirect_uri", redirect_uri.as_str()));
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url.to_string())
    }

    fn build_logout_url(&self, options: LogoutUrlOptions) -> String {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(ClientOperation::BuildLogoutUrl)
            .or_insert(0) += 1;

        let mut url = format!("https://{}/v2/logout", self.domain);
        let mut params = Vec::new();
        if let Some(return_to) = &options.return_to {
            params.push(format!("returnTo={}", return_to));
        }
        if options.federated {
            params.push("federated".to_string());
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

/// Create mock auth client for testing.
pub fn create_mock_auth_client() -> MockAuthClient {
    MockAuthClient::new()
}
