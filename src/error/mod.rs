//! Error Types
//!
//! Error hierarchy for the authentication state adapter.

use thiserror::Error;

/// Root error type for the adapter.
///
/// Errors are `Clone` so the shared error channel can replay the most
/// recent one to late subscribers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Auth client error: {0}")]
    Client(#[from] ClientError),

    #[error("Redirect callback error: {0}")]
    Callback(#[from] CallbackError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl AuthError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "AUTH_CONFIG",
            Self::Client(_) => "AUTH_CLIENT",
            Self::Callback(_) => "AUTH_CALLBACK",
            Self::Navigation(_) => "AUTH_NAVIGATION",
            Self::State(_) => "AUTH_STATE",
        }
    }

    /// OAuth error code reported by the identity provider, if any.
    pub fn oauth_code(&self) -> Option<&str> {
        match self {
            Self::Client(ClientError::OAuth { error, .. }) => Some(error),
            Self::Callback(CallbackError::Provider { error, .. }) => Some(error),
            _ => None,
        }
    }

    /// Check if the provider signalled that interactive login is required.
    ///
    /// UIs watch the error channel for this to prompt a re-login.
    pub fn is_login_required(&self) -> bool {
        matches!(
            self.oauth_code(),
            Some("login_required" | "consent_required" | "interaction_required")
        )
    }

    /// Check if error requires re-authentication.
    pub fn needs_reauth(&self) -> bool {
        if self.is_login_required() {
            return true;
        }
        matches!(
            self,
            Self::Client(ClientError::OAuth { error, .. }) if error == "invalid_grant"
        ) || matches!(
            self,
            Self::Callback(CallbackError::InvalidState { .. })
                | Self::Callback(CallbackError::Exchange { .. })
        )
    }
}

/// Configuration error. Fatal: the caller must fix the configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Configuration was never provided")]
    NotProvided,
}

/// Error raised by the external OAuth client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("{}: {}", .error, .description.as_deref().unwrap_or("no description"))]
    OAuth {
        error: String,
        description: Option<String>,
    },

    #[error("Popup closed before the flow completed")]
    PopupClosed,

    #[error("Popup timed out after {timeout_in_seconds} seconds")]
    PopupTimeout { timeout_in_seconds: u64 },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },
}

impl ClientError {
    /// Build an OAuth error from the provider's `error`/`error_description` pair.
    pub fn from_oauth(error: impl Into<String>, description: Option<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description,
        }
    }
}

/// Redirect callback exchange error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallbackError {
    #[error("Provider returned {}: {}", .error, .description.as_deref().unwrap_or("no description"))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("Invalid state parameter")]
    InvalidState { state: String },

    #[error("Code exchange failed: {message}")]
    Exchange { message: String },

    #[error("No authorization response found in {url}")]
    MissingParameters { url: String },
}

/// Navigation error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavigationError {
    #[error("Navigation to {url} failed: {message}")]
    Failed { url: String, message: String },
}

/// Internal state error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Auth state has been shut down")]
    ShutDown,
}

/// Result type for adapter operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let error = AuthError::Configuration(ConfigurationError::NotProvided);
        assert_eq!(error.error_code(), "AUTH_CONFIG");

        let error = AuthError::State(StateError::ShutDown);
        assert_eq!(error.error_code(), "AUTH_STATE");
    }

    #[test]
    fn test_login_required() {
        let error: AuthError = ClientError::from_oauth("login_required", None).into();
        assert!(error.is_login_required());
        assert!(error.needs_reauth());

        let error: AuthError = ClientError::from_oauth("consent_required", None).into();
        assert!(error.is_login_required());

        let error: AuthError = ClientError::RequestFailed {
            message: "offline".to_string(),
        }
        .into();
        assert!(!error.is_login_required());
        assert!(!error.needs_reauth());
    }

    #[test]
    fn test_callback_errors_need_reauth() {
        let error: AuthError = CallbackError::InvalidState {
            state: "456".to_string(),
        }
        .into();
        assert!(error.needs_reauth());
        assert!(!error.is_login_required());
    }

    #[test]
    fn test_display() {
        let error = ClientError::from_oauth("access_denied", Some("User cancelled".to_string()));
        assert_eq!(error.to_string(), "access_denied: User cancelled");

        let error = ClientError::from_oauth("access_denied", None);
        assert_eq!(error.to_string(), "access_denied: no description");
    }
}
