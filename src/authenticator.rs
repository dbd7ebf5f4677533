use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Request, StatusCode};
use thiserror::Error;
use url::form_urlencoded;

use crate::http_client::HttpClient;
use crate::jwt::signed::SignedJwt;
use crate::token::TokenResponse;

/// Scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "system/Patient.read";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";

#[derive(Error, Debug)]
pub enum AuthenticateError {
    #[error("unable to serialize request: `{0}`")]
    SerializeError(String),
    #[error("unable to deserialize token: `{0}`")]
    DeserializeError(String),
    #[error("authorization server error: Status code: `{0}`, Reason: `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
}

/// Exchanges a client assertion for an access token.
#[cfg_attr(test, mockall::automock)]
pub trait Authenticator {
    fn authenticate(
        &self,
        token_endpoint: &str,
        req: TokenRequest,
    ) -> Result<TokenResponse, AuthenticateError>;
}

/// The Authenticator posting form-encoded token requests to the authorization server.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator<C> {
    /// HTTP client
    http_client: C,
}

impl<C> HttpAuthenticator<C> {
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }
}

impl<C> Authenticator for HttpAuthenticator<C>
where
    C: HttpClient,
{
    /// Executes a POST request to the token endpoint with the `TokenRequest` as a form body.
    /// Only `200 OK` and `201 Created` are accepted as success.
    fn authenticate(
        &self,
        token_endpoint: &str,
        req: TokenRequest,
    ) -> Result<TokenResponse, AuthenticateError> {
        let request = Request::post(token_endpoint)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .header(ACCEPT, JSON)
            .body(req.form_encoded().into_bytes())
            .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| AuthenticateError::HttpTransportError(e.to_string()))?;

        let body = String::from_utf8(response.body().clone()).map_err(|e| {
            AuthenticateError::DeserializeError(format!("invalid utf8 response: {e}"))
        })?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => TokenResponse::try_from(body)
                .map_err(|e| AuthenticateError::DeserializeError(e.to_string())),
            status => Err(AuthenticateError::HttpResponseError(status.as_u16(), body)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrantType {
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientAssertionType {
    JwtBearer,
}

impl ClientAssertionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JwtBearer => "urn:ietf:params:oauth:client-assertion-type:jwt-bearer",
        }
    }
}

/// Body of a client-credentials token request authenticated with a signed assertion.
#[derive(Clone, PartialEq)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    pub scope: String,
    pub client_assertion_type: ClientAssertionType,
    pub client_assertion: SignedJwt,
}

impl TokenRequest {
    pub fn client_credentials(scope: impl Into<String>, client_assertion: SignedJwt) -> Self {
        Self {
            grant_type: GrantType::ClientCredentials,
            scope: scope.into(),
            client_assertion_type: ClientAssertionType::JwtBearer,
            client_assertion,
        }
    }

    pub fn form_encoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", self.grant_type.as_str())
            .append_pair("scope", &self.scope)
            .append_pair("client_assertion_type", self.client_assertion_type.as_str())
            .append_pair("client_assertion", self.client_assertion.value())
            .finish()
    }
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .field("client_assertion_type", &self.client_assertion_type)
            .field("client_assertion", &self.client_assertion)
            .finish()
    }
}
