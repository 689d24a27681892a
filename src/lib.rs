//! Auth State Integration
//!
//! Reactive authentication state on top of an external browser OAuth2/OIDC
//! client.
//!
//! # Features
//!
//! - Replayed, deduplicated streams for loading, authentication, user
//!   profile, ID token claims and errors
//! - Authentication, user and claims always evaluated from the same trigger
//! - One-shot redirect callback handling with app state restoration
//! - Session check at startup when no callback is present
//! - Immediate local-only logout
//! - Route guard for protected routes
//!
//! # Example
//!
//! ```rust,ignore
//! use auth_state_integration::{auth_config, auth_service, LogoutOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = auth_config()
//!         .domain("example.auth.com")
//!         .client_id("my-client-id")
//!         .error_path("/login-failed")
//!         .build()?;
//!
//!     let service = auth_service()
//!         .config(config)
//!         .client(my_client)
//!         .navigator(my_router)
//!         .build()
//!         .await?;
//!
//!     let mut authenticated = service.is_authenticated();
//!     while let Some(value) = authenticated.recv().await {
//!         println!("authenticated: {}", value);
//!     }
//!
//!     service.logout(LogoutOptions::local_only());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, option and profile types
//! - `error`: error hierarchy
//! - `core`: collaborator contracts, replay channels, reactive state and the
//!   redirect callback coordinator
//! - `builders`: fluent builders for configuration and the service
//! - `client`: the public `AuthService` facade
//! - `guard`: route guard
//! - `telemetry`: structured logging

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod guard;
pub mod telemetry;
pub mod types;

// Re-export main service
pub use client::AuthService;
pub use guard::AuthGuard;

// Re-export builders
pub use builders::{auth_config, auth_service, AuthConfigBuilder, AuthServiceBuilder};

// Re-export errors
pub use error::{
    AuthError, AuthResult, CallbackError, ClientError, ConfigurationError, NavigationError,
    StateError,
};

// Re-export types
pub use types::{
    // Config
    AuthConfig, CacheLocation, DEFAULT_SCOPE, DEFAULT_TARGET,
    // Options
    AppState, AuthorizeUrlOptions, CheckSessionOptions, GetIdTokenClaimsOptions,
    GetTokenSilentlyOptions, GetTokenWithPopupOptions, GetUserOptions, LogoutOptions,
    LogoutUrlOptions, PopupConfig, PopupLoginOptions, RedirectLoginOptions, RedirectLoginResult,
    TokenDetails, TokenResult,
    // Profile
    IdTokenClaims, UserProfile,
    // Callback
    CallbackParams,
};

// Re-export core components
pub use core::{
    // Client
    create_mock_auth_client, AuthClient, ClientOperation, MockAuthClient,
    // Adapter
    create_auth_client, AuthClientFactory, ConfigSource, DeferredConfigSource,
    StaticConfigSource,
    // Navigation
    Location, MockNavigator, Navigator, StaticLocation,
    // State
    AuthState, Liveness, ReplaySubject, Subscription, Trigger,
    // Callback
    CallbackOutcome, RedirectCallbackCoordinator,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_logger, create_tracing_logger, no_op_logger, AuthLogContext, InMemoryLogger,
    LogEntry, LogLevel, Logger, NoOpLogger, TracingLogger,
};
