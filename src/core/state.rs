//! Authentication State
//!
//! Reactive authentication state derived from the external client.
//!
//! Once loading completes, the authentication flag is re-evaluated on
//! three kinds of trigger: an initial check, every distinct access token
//! and every explicit refresh. Triggers are queued and evaluated strictly
//! one after another by a single worker task, so two checks never
//! overlap and emissions follow trigger order. User profile and ID token
//! claims are re-read on every trigger that finds a session, and emitted
//! right after the flag they belong to.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::client::AuthClient;
use crate::core::subject::{ReplaySubject, Subscription};
use crate::error::{AuthError, AuthResult, StateError};
use crate::telemetry::{AuthLogContext, Logger};
use crate::types::{GetIdTokenClaimsOptions, GetUserOptions, IdTokenClaims, UserProfile};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Liveness of one adapter instance.
///
/// Work started by an instance checks this before producing side effects;
/// once killed, late results are ignored rather than aborted.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// A live handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Whether the instance is still live.
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the instance as torn down. Idempotent.
    pub fn kill(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Event that causes the authentication flag to be re-evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// First check once loading has completed.
    Initial,
    /// A new, different access token was recorded.
    AccessToken,
    /// Explicit refresh request.
    Refresh,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::AccessToken => write!(f, "access_token"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Shared channels of one state instance.
#[derive(Clone)]
struct Channels {
    is_loading: ReplaySubject<bool>,
    is_authenticated: ReplaySubject<bool>,
    user: ReplaySubject<Option<UserProfile>>,
    id_token_claims: ReplaySubject<Option<IdTokenClaims>>,
    error: ReplaySubject<AuthError>,
    /// Result of every check, failed ones included.
    outcomes: ReplaySubject<AuthResult<bool>>,
    /// Bumped by a local reset; evaluations started before it are stale.
    generation: Arc<Mutex<u64>>,
}

impl Channels {
    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `emit` unless a reset happened since `started`.
    fn publish(&self, started: u64, emit: impl FnOnce(&Self)) -> bool {
        let generation = self.generation();
        if *generation != started {
            return false;
        }
        emit(self);
        drop(generation);
        true
    }

    fn complete(&self) {
        self.is_loading.complete();
        self.is_authenticated.complete();
        self.user.complete();
        self.id_token_claims.complete();
        self.error.complete();
        self.outcomes.complete();
    }
}

/// Reactive authentication state for one adapter instance.
pub struct AuthState {
    channels: Channels,
    access_token: Mutex<Option<String>>,
    triggers: mpsc::UnboundedSender<Trigger>,
    worker: Mutex<Option<JoinHandle<()>>>,
    liveness: Liveness,
    logger: Arc<dyn Logger>,
    instance: u64,
}

impl AuthState {
    /// Create the state and start its trigger worker.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(client: Arc<dyn AuthClient>, logger: Arc<dyn Logger>) -> Self {
        let channels = Channels {
            is_loading: ReplaySubject::with_value(true),
            is_authenticated: ReplaySubject::new(),
            user: ReplaySubject::new(),
            id_token_claims: ReplaySubject::new(),
            error: ReplaySubject::new(),
            outcomes: ReplaySubject::new(),
            generation: Arc::new(Mutex::new(0)),
        };
        let liveness = Liveness::new();
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        let (triggers, receiver) = mpsc::unbounded_channel();

        let worker = TriggerWorker {
            client,
            channels: channels.clone(),
            liveness: liveness.clone(),
            logger: logger.clone(),
            instance,
        };
        let loading = channels.is_loading.subscribe();
        let handle = tokio::spawn(worker.run(receiver, loading));

        Self {
            channels,
            access_token: Mutex::new(None),
            triggers,
            worker: Mutex::new(Some(handle)),
            liveness,
            logger,
            instance,
        }
    }

    /// Instance number, for log correlation.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Liveness handle shared with work started on behalf of this instance.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    fn context(&self, operation: &str) -> AuthLogContext {
        AuthLogContext::new()
            .operation(operation)
            .instance(self.instance)
    }

    // ========== Streams ==========

    /// Loading flag. Starts `true`, becomes `false` once.
    pub fn is_loading(&self) -> Subscription<bool> {
        self.channels.is_loading.subscribe()
    }

    /// Authentication flag, deduplicated, only after loading completed.
    pub fn is_authenticated(&self) -> Subscription<bool> {
        self.channels.is_authenticated.subscribe()
    }

    /// User profile, `None` when unauthenticated.
    pub fn user(&self) -> Subscription<Option<UserProfile>> {
        self.channels.user.subscribe()
    }

    /// ID token claims, `None` when unauthenticated.
    pub fn id_token_claims(&self) -> Subscription<Option<IdTokenClaims>> {
        self.channels.id_token_claims.subscribe()
    }

    /// Most recent error.
    pub fn error(&self) -> Subscription<AuthError> {
        self.channels.error.subscribe()
    }

    /// Current loading flag.
    pub fn loading(&self) -> bool {
        self.channels.is_loading.value().unwrap_or(true)
    }

    /// Current authentication flag, if evaluated yet.
    pub fn authenticated(&self) -> Option<bool> {
        self.channels.is_authenticated.value()
    }

    /// Wait until loading has completed.
    pub async fn wait_until_loaded(&self) -> AuthResult<()> {
        let mut loading = self.is_loading();
        while let Some(value) = loading.recv().await {
            if !value {
                return Ok(());
            }
        }
        Err(StateError::ShutDown.into())
    }

    /// Wait for the authentication flag after loading.
    ///
    /// Returns the current flag if there is one. Otherwise waits for the
    /// next check and fails with its error if that check fails.
    pub async fn wait_for_authenticated(&self) -> AuthResult<bool> {
        self.wait_until_loaded().await?;

        let mut outcomes = self.channels.outcomes.subscribe();
        if let Some(authenticated) = self.authenticated() {
            return Ok(authenticated);
        }
        outcomes
            .recv()
            .await
            .unwrap_or_else(|| Err(StateError::ShutDown.into()))
    }

    // ========== Mutators ==========

    /// Set the loading flag. Once `false`, it stays `false`.
    pub fn set_loading(&self, loading: bool) {
        if !self.liveness.is_alive() {
            return;
        }
        if loading && !self.loading() {
            self.logger.warn(
                "Ignoring attempt to restart loading",
                &self.context("set_loading"),
            );
            return;
        }
        if self.channels.is_loading.next_distinct(loading) {
            self.logger
                .debug("Loading state changed", &self.context("set_loading").extra("loading", loading));
        }
    }

    /// Re-evaluate authentication without changing the token.
    pub fn refresh(&self) {
        self.enqueue(Trigger::Refresh);
    }

    /// Record a freshly obtained access token.
    ///
    /// Re-evaluates authentication only when the token differs from the
    /// previous one.
    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = token.into();
        {
            let mut current = self.access_token.lock().unwrap_or_else(|e| e.into_inner());
            if current.as_deref() == Some(token.as_str()) {
                return;
            }
            *current = Some(token);
        }
        self.enqueue(Trigger::AccessToken);
    }

    /// Record an error on the error channel.
    pub fn set_error(&self, error: AuthError) {
        self.logger.error(
            &error.to_string(),
            &self.context("set_error").extra("code", error.error_code()),
        );
        if self.liveness.is_alive() {
            self.channels.error.next(error);
        }
    }

    /// Force the unauthenticated state immediately, without asking the client.
    ///
    /// Checks already in flight are discarded when they complete.
    pub fn reset_authentication(&self) {
        if !self.liveness.is_alive() {
            return;
        }
        {
            let mut generation = self.channels.generation();
            *generation += 1;
            self.channels.is_authenticated.next_distinct(false);
            self.channels.user.next_distinct(None);
            self.channels.id_token_claims.next_distinct(None);
            self.channels.outcomes.next(Ok(false));
        }
        self.logger
            .info("Authentication reset locally", &self.context("reset_authentication"));
    }

    /// Stop the worker and end every stream. Nothing is emitted afterwards.
    pub fn shutdown(&self) {
        if !self.liveness.is_alive() {
            return;
        }
        self.liveness.kill();
        if let Some(handle) = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
        self.channels.complete();
        self.logger.debug("Auth state shut down", &self.context("shutdown"));
    }

    fn enqueue(&self, trigger: Trigger) {
        if self.triggers.send(trigger).is_err() {
            self.logger.debug(
                "Trigger dropped after shutdown",
                &self.context("enqueue").extra("trigger", trigger),
            );
        }
    }
}

impl Drop for AuthState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Evaluates triggers one at a time.
struct TriggerWorker {
    client: Arc<dyn AuthClient>,
    channels: Channels,
    liveness: Liveness,
    logger: Arc<dyn Logger>,
    instance: u64,
}

impl TriggerWorker {
    async fn run(
        self,
        mut triggers: mpsc::UnboundedReceiver<Trigger>,
        mut loading: Subscription<bool>,
    ) {
        loop {
            match loading.recv().await {
                Some(false) => break,
                Some(true) => continue,
                None => return,
            }
        }
        drop(loading);

        // Anything requested while loading is answered by the initial check.
        while triggers.try_recv().is_ok() {}

        self.evaluate(Trigger::Initial).await;
        while let Some(trigger) = triggers.recv().await {
            self.evaluate(trigger).await;
        }
    }

    async fn evaluate(&self, trigger: Trigger) {
        let context = AuthLogContext::new()
            .operation("evaluate")
            .instance(self.instance)
            .extra("trigger", trigger);
        let started = *self.channels.generation();

        let authenticated = match self.client.is_authenticated().await {
            Ok(authenticated) => authenticated,
            Err(error) => {
                // Keep the previous flag; no automatic retry.
                self.logger
                    .warn(&format!("Authentication check failed: {}", error), &context);
                self.record_error(error.clone());
                if self.liveness.is_alive() {
                    self.channels
                        .publish(started, |channels| channels.outcomes.next(Err(error)));
                }
                return;
            }
        };

        let (user, claims) = if authenticated {
            let user = self.client.get_user(GetUserOptions::default()).await;
            let claims = self
                .client
                .get_id_token_claims(GetIdTokenClaimsOptions::default())
                .await;
            (user, claims)
        } else {
            (Ok(None), Ok(None))
        };

        if !self.liveness.is_alive() {
            return;
        }

        // The triple is published together, under the generation lock.
        let published = self.channels.publish(started, |channels| {
            channels.is_authenticated.next_distinct(authenticated);
            match user {
                Ok(user) => channels.user.next(user),
                Err(error) => self.record_error(error),
            }
            match claims {
                Ok(claims) => channels.id_token_claims.next(claims),
                Err(error) => self.record_error(error),
            }
            channels.outcomes.next(Ok(authenticated));
        });
        if !published {
            self.logger
                .debug("Discarding check superseded by a local reset", &context);
            return;
        }

        self.logger.debug(
            "Authentication evaluated",
            &context.extra("authenticated", authenticated),
        );
    }

    fn record_error(&self, error: AuthError) {
        if self.liveness.is_alive() {
            self.channels.error.next(error);
        }
    }
}
