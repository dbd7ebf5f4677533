use std::path::PathBuf;

use thiserror::Error;

use crate::authenticator::DEFAULT_SCOPE;
use crate::http::client::HttpBuildError;
use crate::http::config::HttpConfig;
use crate::jwt::claims::DEFAULT_ASSERTION_LIFETIME;
use crate::jwt::signer::SigningAlgorithm;
use crate::key::PublishedKeys;
use crate::token_manager::{ClientIdentity, DEFAULT_KEY_ID};
use crate::{ClientID, FhirServerUrl};

pub const DEFAULT_PRIVATE_KEY_FILE: &str = ".privateKey";
pub const DEFAULT_PUBLIC_KEY_FILE: &str = "publicKey";
pub const DEFAULT_JWKS_FILE: &str = "jwks.json";
pub const DEFAULT_KEYSTORE_FILE: &str = "bserKeystore.pem";

/// Value of `SMARTONFHIR` turning the token manager off.
pub const DISABLED_FLAG: &str = "disabled";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for `{0}`: {1}")]
    InvalidValue(&'static str, String),
    #[error("building http client: `{0}`")]
    HttpClient(#[from] HttpBuildError),
}

/// Everything needed to build a token manager and publish its keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartClientConfig {
    pub client_id: Option<ClientID>,
    pub fhir_server_url: Option<FhirServerUrl>,
    /// Assertion lifetime in seconds.
    pub jwt_exp: u64,
    pub disabled: bool,
    pub private_key_file: PathBuf,
    pub public_key_file: PathBuf,
    pub jwks_file: PathBuf,
    pub keystore_file: PathBuf,
    pub key_id: String,
    pub scope: String,
    pub algorithm: SigningAlgorithm,
    pub http: HttpConfig,
}

impl Default for SmartClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            fhir_server_url: None,
            jwt_exp: DEFAULT_ASSERTION_LIFETIME,
            disabled: false,
            private_key_file: PathBuf::from(DEFAULT_PRIVATE_KEY_FILE),
            public_key_file: PathBuf::from(DEFAULT_PUBLIC_KEY_FILE),
            jwks_file: PathBuf::from(DEFAULT_JWKS_FILE),
            keystore_file: PathBuf::from(DEFAULT_KEYSTORE_FILE),
            key_id: DEFAULT_KEY_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            algorithm: SigningAlgorithm::default(),
            http: HttpConfig::default(),
        }
    }
}

impl SmartClientConfig {
    /// Rejects values no manager could work with. Missing client id or server are not
    /// errors here: they only leave the manager inactive.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.jwt_exp == 0 {
            return Err(ConfigError::InvalidValue(
                "jwt_exp",
                "assertion lifetime must be positive".into(),
            ));
        }
        if self.key_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("key_id", "must not be empty".into()));
        }
        if self.scope.trim().is_empty() {
            return Err(ConfigError::InvalidValue("scope", "must not be empty".into()));
        }
        Ok(self)
    }

    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity::new(self.client_id.clone().unwrap_or_default())
            .with_key_id(self.key_id.clone())
            .with_assertion_lifetime(self.jwt_exp)
            .with_scope(self.scope.clone())
    }

    /// Public key documents are served from their own files whether or not the
    /// manager is enabled.
    pub fn published_keys(&self) -> PublishedKeys {
        PublishedKeys::new(&self.public_key_file, &self.jwks_file)
    }

    /// Why a manager built from this configuration can never serve tokens, ignoring
    /// the key source.
    pub fn unavailable_reason(&self) -> Option<String> {
        if self.disabled {
            return Some("SMART backend services disabled by configuration".into());
        }
        match self.client_id.as_deref() {
            None | Some("") => Some("no client id configured".into()),
            Some(_) => None,
        }
    }
}

/// Whether `SMARTONFHIR` carries the value disabling the manager.
pub fn is_disabled_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(DISABLED_FLAG)
}
