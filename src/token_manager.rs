use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};
use url::Url;

use crate::authenticator::{Authenticator, DEFAULT_SCOPE, TokenRequest};
use crate::binding::{BindingStore, ServerBinding};
use crate::clock::{Clock, SystemClock};
use crate::discovery::TokenEndpointResolver;
use crate::jwt::claims::{Claims, DEFAULT_ASSERTION_LIFETIME};
use crate::jwt::signed::SignedJwt;
use crate::jwt::signer::JwtSigner;
use crate::token::{CachedToken, TokenResponse};
use crate::{ClientID, FhirServerUrl, TokenManagerError, TokenProvider};

mod http_impl;

pub use http_impl::HttpTokenManager;

/// Key identifier announced in assertion headers when none is configured.
pub const DEFAULT_KEY_ID: &str = "bserengine072222";

/// Who the client is. Fixed at startup and shared by every server binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIdentity {
    client_id: ClientID,
    key_id: String,
    assertion_lifetime: u64,
    scope: String,
}

impl ClientIdentity {
    pub fn new(client_id: ClientID) -> Self {
        Self {
            client_id,
            key_id: DEFAULT_KEY_ID.to_string(),
            assertion_lifetime: DEFAULT_ASSERTION_LIFETIME,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_key_id(self, key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            ..self
        }
    }

    /// Lifetime of each assertion, in seconds.
    pub fn with_assertion_lifetime(self, assertion_lifetime: u64) -> Self {
        Self {
            assertion_lifetime,
            ..self
        }
    }

    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn assertion_lifetime(&self) -> u64 {
        self.assertion_lifetime
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

#[derive(Debug, Default)]
struct ManagerState {
    store: BindingStore,
    /// Server given at construction. It is adopted on first use so building a manager
    /// never touches the network.
    pending_server: Option<FhirServerUrl>,
    active: bool,
}

/// Serves access tokens for the FHIR server currently targeted, resolving token
/// endpoints and exchanging signed assertions only when nothing usable is cached.
///
/// The whole state sits behind a single mutex, held for the duration of a resolution
/// or an exchange, so concurrent callers never race past the freshness check.
pub struct TokenManager<R, J, A, K = SystemClock> {
    identity: ClientIdentity,
    resolver: R,
    signer: J,
    authenticator: A,
    clock: K,
    /// Why this manager can never serve tokens, e.g. it was explicitly disabled.
    unavailable: Option<String>,
    state: Mutex<ManagerState>,
}

impl<R, J, A> TokenManager<R, J, A, SystemClock> {
    /// Creates a manager without a target server. It stays inactive until
    /// [`TokenManager::set_target_server`] succeeds.
    pub fn new(identity: ClientIdentity, resolver: R, signer: J, authenticator: A) -> Self {
        Self {
            identity,
            resolver,
            signer,
            authenticator,
            clock: SystemClock,
            unavailable: None,
            state: Mutex::new(ManagerState::default()),
        }
    }
}

impl<R, J, A, K> TokenManager<R, J, A, K> {
    pub fn with_clock<C>(self, clock: C) -> TokenManager<R, J, A, C> {
        TokenManager {
            identity: self.identity,
            resolver: self.resolver,
            signer: self.signer,
            authenticator: self.authenticator,
            clock,
            unavailable: self.unavailable,
            state: self.state,
        }
    }

    /// Targets `fhir_server_url` once the first assertion or token is requested.
    /// An unusable URL leaves the manager inactive with nothing to adopt.
    pub fn with_fhir_server(self, fhir_server_url: impl Into<FhirServerUrl>) -> Self {
        let fhir_server_url = fhir_server_url.into();
        let state = if is_http_url(&fhir_server_url) {
            ManagerState {
                pending_server: Some(fhir_server_url),
                active: true,
                ..ManagerState::default()
            }
        } else {
            warn!(fhir_server = %fhir_server_url, "ignoring invalid FHIR server URL");
            ManagerState::default()
        };
        Self {
            state: Mutex::new(state),
            ..self
        }
    }

    /// Permanently refuses every request, whatever the rest of the configuration says.
    pub fn unavailable(self, reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..self
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    fn lock(&self) -> Result<MutexGuard<'_, ManagerState>, TokenManagerError> {
        self.state.lock().map_err(|_| TokenManagerError::PoisonError)
    }

    pub fn is_active(&self) -> bool {
        self.unavailable.is_none() && self.lock().is_ok_and(|state| state.active)
    }

    /// The FHIR server currently targeted, or the one pending adoption.
    pub fn current_server(&self) -> Option<FhirServerUrl> {
        let state = self.lock().ok()?;
        state
            .store
            .current_url()
            .or(state.pending_server.as_deref())
            .map(String::from)
    }

    /// Token endpoint resolved for the current server.
    pub fn token_endpoint(&self) -> Option<String> {
        let state = self.lock().ok()?;
        state
            .store
            .current()
            .map(|binding| binding.token_endpoint().to_string())
    }
}

impl<R, J, A, K> TokenManager<R, J, A, K>
where
    R: TokenEndpointResolver,
    J: JwtSigner,
    A: Authenticator,
    K: Clock,
{
    /// Targets `fhir_server_url`. A server visited before reuses its resolved endpoint and
    /// cached token without any network call. A failed switch deactivates the manager but
    /// leaves the previous binding in place.
    pub fn set_target_server(&self, fhir_server_url: &str) -> Result<(), TokenManagerError> {
        if let Some(reason) = &self.unavailable {
            return Err(TokenManagerError::NotConfigured(reason.clone()));
        }
        let mut state = self.lock()?;
        if !is_http_url(fhir_server_url) {
            return reject_invalid_url(&mut state, fhir_server_url);
        }
        state.pending_server = None;
        self.switch_to(&mut state, fhir_server_url)
    }

    fn switch_to(
        &self,
        state: &mut ManagerState,
        fhir_server_url: &str,
    ) -> Result<(), TokenManagerError> {
        if !is_http_url(fhir_server_url) {
            return reject_invalid_url(state, fhir_server_url);
        }

        if state.store.current_url() == Some(fhir_server_url) {
            debug!(fhir_server = fhir_server_url, "already targeting FHIR server");
            state.active = true;
            return Ok(());
        }

        if state.store.select(fhir_server_url) {
            debug!(fhir_server = fhir_server_url, "reusing resolved token endpoint");
            state.active = true;
            return Ok(());
        }

        let token_endpoint = match self.resolver.resolve_token_endpoint(fhir_server_url) {
            Ok(endpoint) if !endpoint.is_empty() => endpoint,
            Ok(_) => {
                state.active = false;
                return Err(TokenManagerError::EndpointNotFound(
                    fhir_server_url.to_string(),
                ));
            }
            Err(err) => {
                warn!(fhir_server = fhir_server_url, %err, "token endpoint discovery failed, deactivating");
                state.active = false;
                return Err(err.into());
            }
        };

        info!(fhir_server = fhir_server_url, %token_endpoint, "targeting FHIR server");
        state.store.insert_current(ServerBinding::new(
            fhir_server_url.to_string(),
            token_endpoint,
        ));
        state.active = true;
        Ok(())
    }

    /// Locks the state once the manager is known to be usable, adopting the server given
    /// at construction if that has not happened yet.
    fn active_state(&self) -> Result<MutexGuard<'_, ManagerState>, TokenManagerError> {
        if let Some(reason) = &self.unavailable {
            return Err(TokenManagerError::NotConfigured(reason.clone()));
        }
        let mut state = self.lock()?;
        if state.active {
            if let Some(fhir_server_url) = state.pending_server.take() {
                self.switch_to(&mut state, &fhir_server_url)?;
            }
        }
        if !state.active || state.store.current().is_none() {
            return Err(TokenManagerError::NotConfigured(
                "no usable FHIR server is targeted".to_string(),
            ));
        }
        Ok(state)
    }

    fn sign_assertion(&self, audience: &str, now: i64) -> Result<SignedJwt, TokenManagerError> {
        let issued_at = u64::try_from(now).map_err(|_| {
            TokenManagerError::SigningFailed("current time is before the Unix epoch".into())
        })?;
        let claims = Claims::new(
            self.identity.client_id.clone(),
            audience,
            issued_at,
            self.identity.assertion_lifetime,
        );

        Ok(self.signer.sign(&self.identity.key_id, claims)?)
    }

    /// Signs a fresh assertion whose audience is the current server's token endpoint.
    pub fn build_signed_assertion(&self) -> Result<SignedJwt, TokenManagerError> {
        let state = self.active_state()?;
        let audience = state
            .store
            .current()
            .map(|binding| binding.token_endpoint().to_string())
            .ok_or_else(|| TokenManagerError::NotConfigured("no FHIR server targeted".into()))?;
        drop(state);

        self.sign_assertion(&audience, self.clock.now())
    }

    /// Like [`TokenManager::get_access_token`], but exchange failures are returned as
    /// [`TokenManagerError::ExchangeFailed`].
    pub fn try_get_access_token(
        &self,
        token_endpoint_override: Option<&str>,
    ) -> Result<TokenResponse, TokenManagerError> {
        let mut state = self.active_state()?;
        let now = self.clock.now();

        let binding = state
            .store
            .current()
            .ok_or_else(|| TokenManagerError::NotConfigured("no FHIR server targeted".into()))?;
        if let Some(cached) = binding.fresh_token(now) {
            debug!(fhir_server = binding.fhir_server_url(), "serving cached access token");
            return Ok(cached.response().clone());
        }

        let audience = binding.token_endpoint().to_string();
        let token_endpoint = token_endpoint_override
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or(&audience)
            .to_string();

        let assertion = self.sign_assertion(&audience, now)?;
        let request = TokenRequest::client_credentials(self.identity.scope(), assertion);
        debug!(%token_endpoint, "requesting access token");
        let response = self.authenticator.authenticate(&token_endpoint, request)?;

        let received_at = self.clock.now();
        let expires_at = i64::try_from(response.expires_in())
            .ok()
            .and_then(|expires_in| received_at.checked_add(expires_in))
            .ok_or_else(|| {
                TokenManagerError::ExchangeFailed(format!(
                    "`expires_in` out of range: {}",
                    response.expires_in()
                ))
            })?;

        if let Some(binding) = state.store.current_mut() {
            info!(
                fhir_server = binding.fhir_server_url(),
                expires_in = response.expires_in(),
                "access token obtained"
            );
            binding.store_token(CachedToken::new(response.clone(), expires_at));
        }

        Ok(response)
    }

    /// Returns a token for the current server, from cache when it is still fresh.
    ///
    /// `Ok(None)` means the exchange with the authorization server failed; the caller may
    /// retry later. Configuration, discovery and signing problems are returned as errors.
    pub fn get_access_token(
        &self,
        token_endpoint_override: Option<&str>,
    ) -> Result<Option<TokenResponse>, TokenManagerError> {
        match self.try_get_access_token(token_endpoint_override) {
            Ok(response) => Ok(Some(response)),
            Err(err) if err.is_transient() => {
                warn!(%err, "no access token available");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl<R, J, A, K> TokenProvider for TokenManager<R, J, A, K>
where
    R: TokenEndpointResolver,
    J: JwtSigner,
    A: Authenticator,
    K: Clock,
{
    fn retrieve(&self) -> Result<Option<TokenResponse>, TokenManagerError> {
        self.get_access_token(None)
    }
}

/// Deactivates the manager and leaves every binding, and any pending server, untouched.
fn reject_invalid_url(
    state: &mut ManagerState,
    fhir_server_url: &str,
) -> Result<(), TokenManagerError> {
    warn!(fhir_server = fhir_server_url, "rejecting invalid FHIR server URL");
    state.active = false;
    Err(TokenManagerError::NotConfigured(format!(
        "`{fhir_server_url}` is not a valid FHIR server URL"
    )))
}

fn is_http_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}
