//! Integration tests for the auth service.

#[cfg(test)]
mod service_tests {
    use auth_state_integration::{
        auth_config, auth_service, AppState, AuthError, AuthService, CallbackError,
        CallbackOutcome, ClientError, ClientOperation, GetTokenSilentlyOptions, InMemoryLogger,
        LogoutOptions, MockAuthClient, MockNavigator, RedirectLoginResult, StaticLocation,
        UserProfile,
    };
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    struct Fixture {
        client: Arc<MockAuthClient>,
        navigator: Arc<MockNavigator>,
        service: AuthService,
    }

    async fn create_fixture(url: &str, client: MockAuthClient) -> Fixture {
        create_fixture_with_error_path(url, client, None).await
    }

    async fn create_fixture_with_error_path(
        url: &str,
        client: MockAuthClient,
        error_path: Option<&str>,
    ) -> Fixture {
        let client = Arc::new(client);
        let navigator = Arc::new(MockNavigator::new());

        let mut config = auth_config().domain("example.auth.com").client_id("client");
        if let Some(path) = error_path {
            config = config.error_path(path);
        }

        let service = auth_service()
            .config(config.build().unwrap())
            .client(client.clone())
            .navigator(navigator.clone())
            .location(Arc::new(StaticLocation::new(url)))
            .logger(Arc::new(InMemoryLogger::new()))
            .build()
            .await
            .unwrap();

        Fixture {
            client,
            navigator,
            service,
        }
    }

    #[tokio::test]
    async fn test_new_token_after_login_updates_authentication() {
        let f = create_fixture("/", MockAuthClient::new()).await;
        let mut authenticated = f.service.is_authenticated();

        assert_eq!(timeout(WAIT, authenticated.recv()).await.unwrap(), Some(false));

        f.client.set_authenticated(true);
        f.service
            .get_access_token_silently(GetTokenSilentlyOptions::default())
            .await
            .unwrap();

        assert_eq!(timeout(WAIT, authenticated.recv()).await.unwrap(), Some(true));
        assert!(authenticated.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_callback_navigates_to_app_state_target() {
        let client = MockAuthClient::new();
        client.set_callback_result(RedirectLoginResult {
            app_state: Some(AppState::with_target("/test-route")),
        });
        let f = create_fixture("?code=123&state=456", client).await;

        let outcome = f.service.startup_outcome().await;

        assert_eq!(
            outcome,
            Some(CallbackOutcome::CallbackHandled {
                target: "/test-route".to_string()
            })
        );
        assert_eq!(f.navigator.get_history(), vec!["/test-route".to_string()]);
        assert_eq!(
            f.client.get_callback_url_history(),
            vec![Some("?code=123&state=456".to_string())]
        );
        assert_eq!(f.client.calls(ClientOperation::CheckSession), 0);

        let app_state = f.service.app_state().recv().await.unwrap();
        assert_eq!(app_state.target.as_deref(), Some("/test-route"));
        assert!(!f.service.state().loading());
    }

    #[tokio::test]
    async fn test_callback_without_app_state_navigates_home() {
        let f = create_fixture("?code=123&state=456", MockAuthClient::new()).await;

        f.service.startup_outcome().await;

        assert_eq!(f.navigator.get_history(), vec!["/".to_string()]);
        assert!(f.service.app_state().try_recv().is_none());
        assert!(timeout(WAIT, f.service.state().wait_for_authenticated())
            .await
            .unwrap()
            .unwrap());
    }

    #[tokio::test]
    async fn test_callback_error_recorded_and_navigates_to_error_path() {
        let client = MockAuthClient::new();
        client.fail_next(
            ClientOperation::HandleRedirectCallback,
            CallbackError::Provider {
                error: "access_denied".to_string(),
                description: Some("user cancelled".to_string()),
            },
        );
        let f =
            create_fixture_with_error_path("?error=access_denied&state=456", client, Some("/oops"))
                .await;

        let outcome = f.service.startup_outcome().await;

        assert_eq!(
            outcome,
            Some(CallbackOutcome::CallbackFailed {
                target: "/oops".to_string()
            })
        );
        assert_eq!(f.navigator.get_history(), vec!["/oops".to_string()]);

        let error = f.service.error().recv().await.unwrap();
        assert!(matches!(error, AuthError::Callback(CallbackError::Provider { .. })));
        assert!(!f.service.state().loading());
    }

    #[tokio::test]
    async fn test_local_logout_is_immediate() {
        let client = MockAuthClient::new();
        client.set_authenticated(true);
        client.set_user(Some(UserProfile::with_sub("auth0|1")));
        let f = create_fixture("/", client).await;
        assert!(timeout(WAIT, f.service.state().wait_for_authenticated())
            .await
            .unwrap()
            .unwrap());

        f.service.logout(LogoutOptions::local_only());

        assert_eq!(f.service.is_authenticated().try_recv(), Some(false));
        assert_eq!(f.service.user().try_recv(), Some(None));
        assert_eq!(f.service.id_token_claims().try_recv(), Some(None));
        assert_eq!(f.client.network_logouts(), 0);
        assert_eq!(f.client.get_logout_history().len(), 1);
    }

    #[tokio::test]
    async fn test_local_logout_wins_over_check_in_flight() {
        let client = MockAuthClient::new();
        client.set_authenticated(true);
        let f = create_fixture("/", client).await;
        let mut authenticated = f.service.is_authenticated();
        assert_eq!(timeout(WAIT, authenticated.recv()).await.unwrap(), Some(true));

        f.client.push_is_authenticated(Ok(true), Duration::from_millis(50));
        f.service.refresh();
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.service.logout(LogoutOptions::local_only());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(authenticated.drain(), vec![false]);
        assert_eq!(f.service.state().authenticated(), Some(false));
    }

    #[tokio::test]
    async fn test_destroy_before_session_check_resolves() {
        let client = MockAuthClient::new();
        client.block_check_session();
        let f = create_fixture("/", client).await;
        let loading = f.service.is_loading();

        f.service.destroy();
        f.client.release_check_session();

        assert_eq!(
            f.service.startup_outcome().await,
            Some(CallbackOutcome::Abandoned)
        );
        assert_eq!(loading.collect::<Vec<bool>>().await, vec![true]);
        assert!(f.navigator.get_history().is_empty());
        assert_eq!(f.client.calls(ClientOperation::IsAuthenticated), 0);
    }

    #[tokio::test]
    async fn test_user_consistent_with_authentication() {
        let client = MockAuthClient::new();
        client.set_authenticated(true);
        client.set_user(Some(UserProfile::with_sub("auth0|1")));
        let f = create_fixture("/", client).await;
        let mut authenticated = f.service.is_authenticated();
        let mut user = f.service.user();

        assert_eq!(timeout(WAIT, authenticated.recv()).await.unwrap(), Some(true));
        let observed = user.try_recv().unwrap();
        assert_eq!(observed.unwrap().sub.as_deref(), Some("auth0|1"));

        f.client.set_authenticated(false);
        f.service.refresh();

        assert_eq!(timeout(WAIT, authenticated.recv()).await.unwrap(), Some(false));
        assert_eq!(user.try_recv(), Some(None));
    }

    #[tokio::test]
    async fn test_failed_check_keeps_previous_value() {
        let client = MockAuthClient::new();
        client.set_authenticated(true);
        let f = create_fixture("/", client).await;
        let mut authenticated = f.service.is_authenticated();
        let mut errors = f.service.error();
        assert_eq!(timeout(WAIT, authenticated.recv()).await.unwrap(), Some(true));

        f.client.push_is_authenticated(
            Err(ClientError::RequestFailed {
                message: "offline".to_string(),
            }
            .into()),
            Duration::ZERO,
        );
        f.service.refresh();

        let error = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
        assert_eq!(error.error_code(), "AUTH_CLIENT");
        assert!(authenticated.try_recv().is_none());
        assert_eq!(f.service.state().authenticated(), Some(true));
    }

    #[tokio::test]
    async fn test_token_failure_recorded_and_returned() {
        let client = MockAuthClient::new();
        client.fail_next(
            ClientOperation::GetTokenSilently,
            ClientError::from_oauth("login_required", None),
        );
        let f = create_fixture("/", client).await;
        let mut errors = f.service.error();

        let result = f
            .service
            .get_access_token_silently(GetTokenSilentlyOptions::default())
            .await;

        let error = result.unwrap_err();
        assert!(error.is_login_required());
        assert_eq!(errors.recv().await, Some(error));
    }
}
