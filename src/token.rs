use std::fmt;

use serde::Deserialize;

pub type AccessToken = String;

/// A cached token is not served once it is this close to its expiry, so it never
/// expires while a request carrying it is in flight.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct TokenResponseFields {
    #[serde(default)]
    access_token: Option<AccessToken>,
    /// The lifetime in seconds of the access token.
    expires_in: u64,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// A successful token endpoint response. The raw body is kept untouched and is
/// what gets handed to callers.
#[derive(Clone, PartialEq)]
pub struct TokenResponse {
    raw: String,
    fields: TokenResponseFields,
}

impl TryFrom<String> for TokenResponse {
    type Error = serde_json::Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let fields = serde_json::from_str(&raw)?;
        Ok(Self { raw, fields })
    }
}

impl TokenResponse {
    /// The response body exactly as returned by the token endpoint.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn access_token(&self) -> Option<&str> {
        self.fields.access_token.as_deref()
    }

    pub fn expires_in(&self) -> u64 {
        self.fields.expires_in
    }

    pub fn token_type(&self) -> Option<&str> {
        self.fields.token_type.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.fields.scope.as_deref()
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<hidden>")
            .field("expires_in", &self.fields.expires_in)
            .field("token_type", &self.fields.token_type)
            .field("scope", &self.fields.scope)
            .finish()
    }
}

/// A token response together with the absolute time (seconds since epoch) it expires at.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    response: TokenResponse,
    expires_at: i64,
}

impl CachedToken {
    pub fn new(response: TokenResponse, expires_at: i64) -> Self {
        Self {
            response,
            expires_at,
        }
    }

    pub fn response(&self) -> &TokenResponse {
        &self.response
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Whether the token can still be handed out at `now`.
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_SAFETY_MARGIN_SECS
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const BODY: &str = r#"{"access_token":"abc","token_type":"bearer","expires_in":300,"scope":"system/Patient.read"}"#;

    #[test]
    fn raw_body_is_preserved() {
        let response = TokenResponse::try_from(BODY.to_string()).unwrap();

        assert_eq!(response.raw(), BODY);
        assert_eq!(response.access_token(), Some("abc"));
        assert_eq!(response.expires_in(), 300);
        assert_eq!(response.token_type(), Some("bearer"));
        assert_eq!(response.scope(), Some("system/Patient.read"));
    }

    #[test]
    fn expires_in_is_required() {
        assert!(TokenResponse::try_from(r#"{"access_token":"abc"}"#.to_string()).is_err());
        assert!(TokenResponse::try_from("not json".to_string()).is_err());
    }

    #[test]
    fn debug_hides_the_token() {
        let response = TokenResponse::try_from(BODY.to_string()).unwrap();
        assert!(!format!("{response:?}").contains("abc"));
    }

    #[rstest]
    #[case::just_issued(1_000, true)]
    #[case::well_within_lifetime(1_100, true)]
    #[case::last_fresh_second(1_284, true)]
    #[case::inside_safety_margin(1_285, false)]
    #[case::almost_expired(1_290, false)]
    #[case::expired(1_400, false)]
    fn freshness_keeps_a_safety_margin(#[case] now: i64, #[case] fresh: bool) {
        let response = TokenResponse::try_from(BODY.to_string()).unwrap();
        let cached = CachedToken::new(response, 1_300);

        assert_eq!(cached.is_fresh(now), fresh);
    }
}
