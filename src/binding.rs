//! Per FHIR server state: the resolved token endpoint and the last token obtained from it.
use std::collections::HashMap;

use crate::FhirServerUrl;
use crate::token::CachedToken;

/// State kept for one FHIR server. The token endpoint never changes once resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerBinding {
    fhir_server_url: FhirServerUrl,
    token_endpoint: String,
    cached_token: Option<CachedToken>,
}

impl ServerBinding {
    pub fn new(fhir_server_url: FhirServerUrl, token_endpoint: String) -> Self {
        Self {
            fhir_server_url,
            token_endpoint,
            cached_token: None,
        }
    }

    pub fn fhir_server_url(&self) -> &str {
        &self.fhir_server_url
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    pub fn cached_token(&self) -> Option<&CachedToken> {
        self.cached_token.as_ref()
    }

    /// The cached token, if it can still be handed out at `now`.
    pub fn fresh_token(&self, now: i64) -> Option<&CachedToken> {
        self.cached_token.as_ref().filter(|token| token.is_fresh(now))
    }

    pub fn store_token(&mut self, token: CachedToken) {
        self.cached_token = Some(token);
    }
}

/// All known server bindings, keyed by FHIR server URL, plus the one currently targeted.
#[derive(Debug, Default)]
pub struct BindingStore {
    bindings: HashMap<FhirServerUrl, ServerBinding>,
    current: Option<FhirServerUrl>,
}

impl BindingStore {
    pub fn contains(&self, fhir_server_url: &str) -> bool {
        self.bindings.contains_key(fhir_server_url)
    }

    /// Stores `binding`, replacing any binding for the same server, and makes it current.
    pub fn insert_current(&mut self, binding: ServerBinding) {
        let url = binding.fhir_server_url.clone();
        self.bindings.insert(url.clone(), binding);
        self.current = Some(url);
    }

    /// Targets an already known server. Returns false when the server is unknown.
    pub fn select(&mut self, fhir_server_url: &str) -> bool {
        if !self.contains(fhir_server_url) {
            return false;
        }
        self.current = Some(fhir_server_url.to_string());
        true
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&ServerBinding> {
        self.current.as_deref().and_then(|url| self.bindings.get(url))
    }

    pub fn current_mut(&mut self) -> Option<&mut ServerBinding> {
        let url = self.current.as_deref()?;
        self.bindings.get_mut(url)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
