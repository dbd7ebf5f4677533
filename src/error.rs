use thiserror::Error;

use crate::authenticator::AuthenticateError;
use crate::discovery::DiscoveryError;
use crate::jwt::error::JwtEncoderError;

#[derive(Error, Debug)]
pub enum TokenManagerError {
    #[error("token manager is not configured: `{0}`")]
    NotConfigured(String),
    #[error("no token endpoint advertised by `{0}`")]
    EndpointNotFound(String),
    #[error("resolving token endpoint: `{0}`")]
    ResolutionFailed(String),
    #[error("signing client assertion: `{0}`")]
    SigningFailed(String),
    #[error("exchanging client assertion: `{0}`")]
    ExchangeFailed(String),
    #[error("acquiring token cache lock")]
    PoisonError,
}

impl TokenManagerError {
    /// Exchange failures are the only errors worth retrying without reconfiguring.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ExchangeFailed(_))
    }
}

impl From<DiscoveryError> for TokenManagerError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::EndpointNotFound(url) => Self::EndpointNotFound(url),
            err @ DiscoveryError::ResolutionFailed(..) => Self::ResolutionFailed(err.to_string()),
        }
    }
}

impl From<JwtEncoderError> for TokenManagerError {
    fn from(err: JwtEncoderError) -> Self {
        Self::SigningFailed(err.to_string())
    }
}

impl From<AuthenticateError> for TokenManagerError {
    fn from(err: AuthenticateError) -> Self {
        Self::ExchangeFailed(err.to_string())
    }
}
