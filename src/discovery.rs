//! Token endpoint discovery for a FHIR server.
//!
//! The SMART configuration document (`.well-known/smart-configuration`) is tried first.
//! Whatever happens there, the server's CapabilityStatement (`metadata`) is the fallback.
use http::header::ACCEPT;
use http::{Request, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::http_client::HttpClient;

pub mod capability;

use capability::CapabilityStatement;

pub const SMART_CONFIGURATION_PATH: &str = ".well-known/smart-configuration";
pub const METADATA_PATH: &str = "metadata";
const FHIR_JSON: &str = "application/fhir+json";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("no token endpoint advertised by `{0}`")]
    EndpointNotFound(String),
    #[error("discovering token endpoint of `{0}`: `{1}`")]
    ResolutionFailed(String, String),
}

/// Maps a FHIR server base URL to the URL of its OAuth2 token endpoint.
#[cfg_attr(test, mockall::automock)]
pub trait TokenEndpointResolver {
    fn resolve_token_endpoint(&self, fhir_server_url: &str) -> Result<String, DiscoveryError>;
}

/// Subset of the SMART configuration document.
#[derive(Debug, Deserialize)]
struct SmartConfiguration {
    #[serde(default)]
    token_endpoint: Option<String>,
}

/// Resolver querying the FHIR server over HTTP. Results are not cached here.
#[derive(Debug, Clone)]
pub struct HttpEndpointResolver<C> {
    http_client: C,
}

impl<C> HttpEndpointResolver<C>
where
    C: HttpClient,
{
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    fn get(&self, url: &str) -> Result<Response<Vec<u8>>, String> {
        let request = Request::get(url)
            .header(ACCEPT, FHIR_JSON)
            .body(Vec::new())
            .map_err(|e| format!("building request for `{url}`: {e}"))?;

        self.http_client.send(request).map_err(|e| e.to_string())
    }

    /// `Ok(None)` when the document is missing or does not carry a token endpoint.
    fn from_smart_configuration(&self, base_url: &str) -> Result<Option<String>, String> {
        let url = format!("{base_url}{SMART_CONFIGURATION_PATH}");
        debug!(%url, "fetching SMART configuration");

        let response = self.get(&url)?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "SMART configuration not available");
            return Ok(None);
        }

        let config: SmartConfiguration = serde_json::from_slice(response.body())
            .map_err(|e| format!("invalid SMART configuration: {e}"))?;

        Ok(config.token_endpoint.filter(|endpoint| !endpoint.is_empty()))
    }

    fn from_capability_statement(&self, base_url: &str) -> Result<Option<String>, String> {
        let url = format!("{base_url}{METADATA_PATH}");
        debug!(%url, "fetching CapabilityStatement");

        let response = self.get(&url)?;
        if !response.status().is_success() {
            return Err(format!(
                "unsuccessful response from `{url}`: {}",
                response.status()
            ));
        }

        let statement =
            CapabilityStatement::try_from(response.body().as_slice()).map_err(|e| e.to_string())?;

        Ok(statement.token_endpoint().map(String::from))
    }
}

impl<C> TokenEndpointResolver for HttpEndpointResolver<C>
where
    C: HttpClient,
{
    fn resolve_token_endpoint(&self, fhir_server_url: &str) -> Result<String, DiscoveryError> {
        let base_url = normalize_base_url(fhir_server_url);

        match self.from_smart_configuration(&base_url) {
            Ok(Some(endpoint)) => {
                info!(fhir_server = fhir_server_url, token_endpoint = %endpoint, "token endpoint found in SMART configuration");
                return Ok(endpoint);
            }
            Ok(None) => debug!("falling back to the CapabilityStatement"),
            Err(err) => debug!(%err, "SMART configuration lookup failed, falling back to the CapabilityStatement"),
        }

        let endpoint = self
            .from_capability_statement(&base_url)
            .map_err(|e| DiscoveryError::ResolutionFailed(fhir_server_url.to_string(), e))?
            .ok_or_else(|| DiscoveryError::EndpointNotFound(fhir_server_url.to_string()))?;

        info!(fhir_server = fhir_server_url, token_endpoint = %endpoint, "token endpoint found in CapabilityStatement");
        Ok(endpoint)
    }
}

/// Ensures the base URL ends with exactly one `/` so well-known paths can be appended.
pub fn normalize_base_url(fhir_server_url: &str) -> String {
    format!("{}/", fhir_server_url.trim_end_matches('/'))
}
