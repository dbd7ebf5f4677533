use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ClientID;

/// Default lifetime of a client assertion, in seconds.
pub const DEFAULT_ASSERTION_LIFETIME: u64 = 300;

/// Claims of a client assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Issuer. Client ID will be used here.
    pub(crate) iss: String,
    /// Subject (whom token refers to). Client ID will be used here.
    pub(crate) sub: String,
    /// Audience. Full URL of the token endpoint the assertion is presented to.
    pub(crate) aud: String,
    /// Expiration time (as UTC timestamp).
    pub(crate) exp: u64,
    /// JWT ID. Time-ordered, never reused.
    pub(crate) jti: String,
}

impl Claims {
    /// Claims issued at `issued_at` (seconds since epoch) and valid for `lifetime` seconds.
    pub fn new(client_id: ClientID, token_endpoint: &str, issued_at: u64, lifetime: u64) -> Self {
        Self {
            iss: client_id.clone(),
            sub: client_id,
            aud: token_endpoint.to_string(),
            exp: issued_at.saturating_add(lifetime),
            jti: Uuid::now_v7().to_string(),
        }
    }

    pub fn audience(&self) -> &str {
        &self.aud
    }

    pub fn expiration(&self) -> u64 {
        self.exp
    }
}
