pub mod authenticator;
pub mod binding;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod http_client;
pub mod jwt;
pub mod key;
pub mod parameters;
pub mod token;
pub mod token_manager;

pub use error::TokenManagerError;

use crate::token::TokenResponse;

pub type ClientID = String;

/// Base URL of a FHIR server, used as the key of its server binding.
pub type FhirServerUrl = String;

/// A TokenProvider yields an access token for the FHIR server it currently targets.
///
/// `Ok(None)` means no token could be obtained right now and the caller may retry later.
pub trait TokenProvider {
    fn retrieve(&self) -> Result<Option<TokenResponse>, TokenManagerError>;
}
