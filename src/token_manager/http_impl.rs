use tracing::{debug, warn};

use crate::authenticator::HttpAuthenticator;
use crate::config::{ConfigError, SmartClientConfig};
use crate::discovery::HttpEndpointResolver;
use crate::http::client::BlockingHttpClient;
use crate::jwt::signer::key_store::KeyStoreSigner;
use crate::jwt::signer::local::LocalPrivateKeySigner;
use crate::jwt::signer::JwtSignerImpl;
use crate::key::FileKeyStore;

use super::TokenManager;

/// Token manager talking to real FHIR and authorization servers.
pub type HttpTokenManager = TokenManager<
    HttpEndpointResolver<BlockingHttpClient>,
    JwtSignerImpl,
    HttpAuthenticator<BlockingHttpClient>,
>;

impl HttpTokenManager {
    /// Builds a manager from `config` without any network I/O.
    ///
    /// Only an unusable HTTP client is an error. A disabled configuration, a missing
    /// client id or the lack of any private key yield a manager that refuses every
    /// request with [`crate::TokenManagerError::NotConfigured`].
    pub fn from_config(config: &SmartClientConfig) -> Result<Self, ConfigError> {
        let http_client = BlockingHttpClient::new(&config.http)?;

        let mut unavailable = config.unavailable_reason();
        let signer = if unavailable.is_some() {
            key_store_signer(config)
        } else {
            select_signer(config).unwrap_or_else(|reason| {
                unavailable = Some(reason);
                key_store_signer(config)
            })
        };

        let mut manager = TokenManager::new(
            config.client_identity(),
            HttpEndpointResolver::new(http_client.clone()),
            signer,
            HttpAuthenticator::new(http_client),
        );
        if let Some(fhir_server_url) = &config.fhir_server_url {
            manager = manager.with_fhir_server(fhir_server_url.clone());
        }
        if let Some(reason) = unavailable {
            warn!(%reason, "token manager is not available");
            manager = manager.unavailable(reason);
        }

        Ok(manager)
    }
}

fn key_store_signer(config: &SmartClientConfig) -> JwtSignerImpl {
    JwtSignerImpl::KeyStore(KeyStoreSigner::new(
        FileKeyStore::new(&config.keystore_file),
        config.algorithm,
    ))
}

/// The key store is preferred and read on every signature. Without it, the private key
/// file is loaded once.
fn select_signer(config: &SmartClientConfig) -> Result<JwtSignerImpl, String> {
    if FileKeyStore::new(&config.keystore_file).exists() {
        debug!(key_store = %config.keystore_file.display(), "signing with key store");
        return Ok(key_store_signer(config));
    }

    LocalPrivateKeySigner::from_file(&config.private_key_file, config.algorithm)
        .map(|signer| {
            debug!(private_key = %config.private_key_file.display(), "signing with private key file");
            JwtSignerImpl::Local(signer)
        })
        .map_err(|e| {
            format!(
                "no working key source: `{}` is missing and `{}` is unusable: {e}",
                config.keystore_file.display(),
                config.private_key_file.display()
            )
        })
}
