//! Navigation
//!
//! Router and location collaborators.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{AuthResult, NavigationError};

/// Application router interface.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Navigate to an application path. Resolves to whether navigation happened.
    async fn navigate_by_url(&self, url: &str) -> AuthResult<bool>;
}

/// Access to the current browser location.
pub trait Location: Send + Sync {
    /// Current URL, absolute or as path plus query.
    fn current_url(&self) -> String;
}

/// Location fixed at construction.
#[derive(Clone, Debug)]
pub struct StaticLocation {
    url: String,
}

impl StaticLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for StaticLocation {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Location for StaticLocation {
    fn current_url(&self) -> String {
        self.url.clone()
    }
}

/// Mock navigator for testing.
#[derive(Default)]
pub struct MockNavigator {
    history: Mutex<Vec<String>>,
    fail_with: Mutex<Option<String>>,
}

impl MockNavigator {
    /// Create new mock navigator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next navigation fail.
    pub fn fail_next(&self, message: impl Into<String>) -> &Self {
        *self.fail_with.lock().unwrap() = Some(message.into());
        self
    }

    /// Get navigation history.
    pub fn get_history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for MockNavigator {
    async fn navigate_by_url(&self, url: &str) -> AuthResult<bool> {
        self.history.lock().unwrap().push(url.to_string());

        if let Some(message) = self.fail_with.lock().unwrap().take() {
            return Err(NavigationError::Failed {
                url: url.to_string(),
                message,
            }
            .into());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_navigator_records() {
        let navigator = MockNavigator::new();
        assert!(navigator.navigate_by_url("/profile").await.unwrap());

        navigator.fail_next("route not found");
        assert!(navigator.navigate_by_url("/missing").await.is_err());

        assert_eq!(navigator.get_history(), vec!["/profile", "/missing"]);
    }

    #[test]
    fn test_static_location() {
        assert_eq!(StaticLocation::default().current_url(), "/");
        assert_eq!(
            StaticLocation::new("/callback?code=1&state=2").current_url(),
            "/callback?code=1&state=2"
        );
    }
}
