//! Callback Types
//!
//! Detecting an authorization response on the current location.

use url::Url;

/// Base used to resolve relative locations such as `/callback?code=1`.
const RELATIVE_BASE: &str = "http://localhost/";

/// Authorization response parameters found on a location.
///
/// Only the first occurrence of each parameter counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// OAuth error code, e.g. `access_denied`.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Read the response parameters from the query of `url`.
    pub fn from_url(url: &Url) -> Self {
        let first = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        Self {
            code: first("code"),
            state: first("state"),
            error: first("error"),
            error_description: first("error_description"),
        }
    }

    /// Parse callback parameters from an absolute URL, a path with a
    /// query, or a bare `?query` string.
    pub fn from_location(location: &str) -> Result<Self, url::ParseError> {
        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(RELATIVE_BASE)?.join(location)?
            }
            Err(e) => return Err(e),
        };
        Ok(Self::from_url(&url))
    }

    /// Check if the location carries an authorization response:
    /// `code` + `state`, or `error` + `state`.
    pub fn is_authorization_response(&self) -> bool {
        self.state.is_some() && (self.code.is_some() || self.error.is_some())
    }

    /// Whether the provider reported a failure instead of a code.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_state() {
        let params = CallbackParams::from_location("?code=123&state=456").unwrap();

        assert_eq!(params.code.as_deref(), Some("123"));
        assert_eq!(params.state.as_deref(), Some("456"));
        assert!(params.is_authorization_response());
        assert!(!params.has_error());
    }

    #[test]
    fn test_error_and_state() {
        let params = CallbackParams::from_location(
            "https://app.example.com/callback?error=access_denied&error_description=User%20denied&state=456",
        )
        .unwrap();

        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("User denied"));
        assert!(params.is_authorization_response());
        assert!(params.has_error());
    }

    #[test]
    fn test_missing_state_is_not_a_callback() {
        let params = CallbackParams::from_location("/callback?code=123").unwrap();
        assert!(!params.is_authorization_response());

        let params = CallbackParams::from_location("/callback?state=456").unwrap();
        assert!(!params.is_authorization_response());

        let params = CallbackParams::from_location("/").unwrap();
        assert!(!params.is_authorization_response());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let params = CallbackParams::from_location("/cb?state=a&code=1&state=b").unwrap();

        assert_eq!(params.state.as_deref(), Some("a"));
        assert_eq!(params.code.as_deref(), Some("1"));
    }
}
