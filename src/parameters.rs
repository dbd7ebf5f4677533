use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use crate::authenticator::DEFAULT_SCOPE;
use crate::config::{
    ConfigError, DEFAULT_JWKS_FILE, DEFAULT_KEYSTORE_FILE, DEFAULT_PRIVATE_KEY_FILE,
    DEFAULT_PUBLIC_KEY_FILE, SmartClientConfig, is_disabled_flag,
};
use crate::http::config::{DEFAULT_HTTP_TIMEOUT, HttpConfig};
use crate::jwt::claims::DEFAULT_ASSERTION_LIFETIME;
use crate::jwt::signer::SigningAlgorithm;
use crate::token::TokenResponse;
use crate::token_manager::DEFAULT_KEY_ID;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Retrieve an access token for the configured FHIR server.
    Token {
        /// Post the token request here instead of the discovered token endpoint.
        /// The assertion audience is still the discovered endpoint.
        #[arg(long)]
        token_endpoint: Option<String>,

        /// Select how the token response is printed
        #[arg(long, value_enum, default_value_t = OutputTokenFormat::Json)]
        output_format: OutputTokenFormat,
    },
    /// Print the token endpoint discovered for the configured FHIR server.
    Endpoint,
    /// Print a freshly signed client assertion.
    Assertion,
    /// Print the published JSON Web Key Set.
    Jwks,
    /// Print the published public key.
    PublicKey,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputTokenFormat {
    /// Returns only the access token
    Plain,
    /// Returns the token endpoint response exactly as received
    Json,
}

impl OutputTokenFormat {
    /// `None` when `plain` is requested but the response carries no access token.
    pub fn render(&self, token: &TokenResponse) -> Option<String> {
        match self {
            Self::Plain => token.access_token().map(String::from),
            Self::Json => Some(token.raw().to_string()),
        }
    }
}

/// Client settings. Every flag falls back to the environment variable of the same purpose.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct SmartArgs {
    /// Client id registered with the authorization server
    #[arg(long, env = "CLIENTID")]
    client_id: Option<String>,

    /// Base URL of the FHIR server to target
    #[arg(long, env = "FHIRSERVER_URL")]
    fhir_server_url: Option<String>,

    /// Lifetime of each client assertion, in seconds
    #[arg(long, env = "JWT_EXP", default_value_t = DEFAULT_ASSERTION_LIFETIME)]
    jwt_exp: u64,

    /// Set to `disabled` to turn token retrieval off
    #[arg(long, env = "SMARTONFHIR")]
    smartonfhir: Option<String>,

    /// PEM private key used when the key store is missing
    #[arg(long, env = "PRIVATE_KEY_FILE", default_value = DEFAULT_PRIVATE_KEY_FILE)]
    private_key_file: PathBuf,

    /// Public key published for verification
    #[arg(long, env = "PUBLIC_KEY_FILE", default_value = DEFAULT_PUBLIC_KEY_FILE)]
    public_key_file: PathBuf,

    /// JWK or JWK Set published for verification
    #[arg(long, env = "JWKS_FILE", default_value = DEFAULT_JWKS_FILE)]
    jwks_file: PathBuf,

    /// PEM private key read every time an assertion is signed
    #[arg(long, env = "KEYSTORE_FILE", default_value = DEFAULT_KEYSTORE_FILE)]
    keystore_file: PathBuf,

    /// Key identifier announced in the assertion header
    #[arg(long, env = "KEY_ID", default_value = DEFAULT_KEY_ID)]
    key_id: String,

    /// Scope requested with every token
    #[arg(long, env = "SCOPE", default_value = DEFAULT_SCOPE)]
    scope: String,

    /// Assertion signing algorithm (RS256, RS384, RS512, ES256, ES384)
    #[arg(long, env = "JWT_ALG", default_value_t = SigningAlgorithm::default())]
    algorithm: SigningAlgorithm,

    /// Timeout for every HTTP request, in seconds
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

impl TryFrom<SmartArgs> for SmartClientConfig {
    type Error = ConfigError;

    fn try_from(args: SmartArgs) -> Result<Self, Self::Error> {
        let timeout = Duration::from_secs(args.timeout_secs);
        SmartClientConfig {
            client_id: args.client_id.filter(|id| !id.is_empty()),
            fhir_server_url: args.fhir_server_url.filter(|url| !url.is_empty()),
            jwt_exp: args.jwt_exp,
            disabled: args.smartonfhir.as_deref().is_some_and(is_disabled_flag),
            private_key_file: args.private_key_file,
            public_key_file: args.public_key_file,
            jwks_file: args.jwks_file,
            keystore_file: args.keystore_file,
            key_id: args.key_id,
            scope: args.scope,
            algorithm: args.algorithm,
            http: HttpConfig::new(timeout, timeout),
        }
        .validate()
    }
}
