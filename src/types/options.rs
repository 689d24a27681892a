//! Operation Options
//!
//! Option and result types passed through to the external client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Application state preserved across the login redirect.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Route to return to once the callback has been handled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Arbitrary caller data.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppState {
    /// App state that returns to `target`.
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Attach caller data.
    pub fn insert(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Options for a redirect login.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedirectLoginOptions {
    /// State to round-trip through the redirect.
    pub app_state: Option<AppState>,
    /// Extra authorize parameters (`prompt`, `screen_hint`, ...).
    pub authorization_params: HashMap<String, String>,
}

/// Options for a popup login.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopupLoginOptions {
    pub authorization_params: HashMap<String, String>,
}

/// Popup window configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct PopupConfig {
    /// Seconds to wait for the popup to complete.
    pub timeout_in_seconds: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            timeout_in_seconds: 60,
        }
    }
}

/// Options for logout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogoutOptions {
    /// Clear the local session only, without contacting the provider.
    pub local_only: bool,
    /// Where the provider sends the browser after logout.
    pub return_to: Option<String>,
    /// Client to log out of, defaults to the configured one.
    pub client_id: Option<String>,
    /// Also log out of the upstream identity provider.
    pub federated: bool,
}

impl LogoutOptions {
    /// Local-only logout.
    pub fn local_only() -> Self {
        Self {
            local_only: true,
            ..Default::default()
        }
    }
}

/// Options for building a logout URL.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogoutUrlOptions {
    pub return_to: Option<String>,
    pub client_id: Option<String>,
    pub federated: bool,
}

/// Options for the silent session check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckSessionOptions {
    pub audience: Option<String>,
    pub scope: Option<String>,
}

/// Options for silent token retrieval.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetTokenSilentlyOptions {
    pub audience: Option<String>,
    pub scope: Option<String>,
    /// Skip the external client's cache.
    pub ignore_cache: bool,
    /// Return the full token response instead of the bare access token.
    pub detailed_response: bool,
    pub timeout_in_seconds: Option<u64>,
}

/// Options for popup token retrieval.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetTokenWithPopupOptions {
    pub audience: Option<String>,
    pub scope: Option<String>,
}

/// Options for reading the user profile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetUserOptions {
    pub audience: Option<String>,
    pub scope: Option<String>,
}

/// Options for reading the ID token claims.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetIdTokenClaimsOptions {
    pub audience: Option<String>,
    pub scope: Option<String>,
}

/// Options for building an authorize URL.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorizeUrlOptions {
    pub redirect_uri: Option<String>,
    pub app_state: Option<AppState>,
    pub authorization_params: HashMap<String, String>,
}

/// Result of the redirect callback exchange.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedirectLoginResult {
    /// State preserved by the login request, if any.
    pub app_state: Option<AppState>,
}

/// Full token response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenDetails {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Result of silent token retrieval.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenResult {
    /// Bare access token.
    Token(String),
    /// Full token response, when `detailed_response` was requested.
    Detailed(TokenDetails),
}

impl TokenResult {
    /// The access token, whatever shape the result has.
    pub fn access_token(&self) -> &str {
        match self {
            Self::Token(token) => token,
            Self::Detailed(details) => &details.access_token,
        }
    }
}
