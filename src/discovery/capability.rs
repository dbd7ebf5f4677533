//! The slice of a FHIR CapabilityStatement needed to find the OAuth2 token endpoint.
use serde::Deserialize;

const CAPABILITY_STATEMENT: &str = "CapabilityStatement";
/// Url of the extension carrying the token endpoint.
pub const TOKEN_EXTENSION_URL: &str = "token";
/// SMART extension grouping the OAuth2 endpoints as nested extensions.
pub const OAUTH_URIS_EXTENSION_URL: &str =
    "http://fhir-registry.smarthealthit.org/StructureDefinition/oauth-uris";

#[derive(thiserror::Error, Debug)]
pub enum CapabilityStatementError {
    #[error("invalid CapabilityStatement JSON: `{0}`")]
    Decode(#[from] serde_json::Error),
    #[error("expected a CapabilityStatement, got `{0}`")]
    UnexpectedResourceType(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStatement {
    resource_type: String,
    #[serde(default)]
    rest: Vec<RestComponent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestComponent {
    #[serde(default)]
    security: Option<SecurityComponent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityComponent {
    #[serde(default)]
    extension: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    url: String,
    #[serde(default)]
    value_uri: Option<String>,
    #[serde(default)]
    value_url: Option<String>,
    #[serde(default)]
    extension: Vec<Extension>,
}

impl Extension {
    fn value(&self) -> Option<&str> {
        self.value_uri
            .as_deref()
            .or(self.value_url.as_deref())
            .filter(|v| !v.is_empty())
    }

    fn token_endpoint(&self) -> Option<&str> {
        match self.url.as_str() {
            TOKEN_EXTENSION_URL => self.value(),
            OAUTH_URIS_EXTENSION_URL => self.extension.iter().find_map(Extension::token_endpoint),
            _ => None,
        }
    }
}

impl TryFrom<&[u8]> for CapabilityStatement {
    type Error = CapabilityStatementError;

    fn try_from(body: &[u8]) -> Result<Self, Self::Error> {
        let statement: CapabilityStatement = serde_json::from_slice(body)?;
        if statement.resource_type != CAPABILITY_STATEMENT {
            return Err(CapabilityStatementError::UnexpectedResourceType(
                statement.resource_type,
            ));
        }
        Ok(statement)
    }
}

impl CapabilityStatement {
    /// Returns the first token endpoint advertised by a `rest.security` extension.
    pub fn token_endpoint(&self) -> Option<&str> {
        self.rest
            .iter()
            .filter_map(|rest| rest.security.as_ref())
            .flat_map(|security| security.extension.iter())
            .find_map(Extension::token_endpoint)
    }
}
