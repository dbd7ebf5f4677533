use std::fmt;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use thiserror::Error;

use super::{claims::Claims, error::JwtEncoderError, signed::SignedJwt};
use crate::key::FileKeyStore;
use key_store::KeyStoreSigner;
use local::LocalPrivateKeySigner;

pub mod key_store;
pub mod local;

/// Type marker set in the header of every client assertion.
pub const ASSERTION_TYPE: &str = "JWT";

/// A JWT signer.
#[cfg_attr(test, mockall::automock)]
pub trait JwtSigner {
    /// Signs `claims`, announcing `key_id` as the `kid` header so the server can pick
    /// the matching key from the published JWKS.
    fn sign(&self, key_id: &str, claims: Claims) -> Result<SignedJwt, JwtEncoderError>;
}

/// Enumerates all implementations for `JwtSigner` for static dispatching reasons.
pub enum JwtSignerImpl {
    Local(LocalPrivateKeySigner),
    KeyStore(KeyStoreSigner<FileKeyStore>),
}

impl JwtSigner for JwtSignerImpl {
    fn sign(&self, key_id: &str, claims: Claims) -> Result<SignedJwt, JwtEncoderError> {
        match self {
            Self::Local(local_signer) => local_signer.sign(key_id, claims),
            Self::KeyStore(key_store_signer) => key_store_signer.sign(key_id, claims),
        }
    }
}

/// Asymmetric algorithms accepted by SMART backend services token endpoints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    RS256,
    #[default]
    RS384,
    RS512,
    ES256,
    ES384,
}

impl SigningAlgorithm {
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384 | Self::RS512)
    }
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(value: SigningAlgorithm) -> Self {
        match value {
            SigningAlgorithm::RS256 => Algorithm::RS256,
            SigningAlgorithm::RS384 => Algorithm::RS384,
            SigningAlgorithm::RS512 => Algorithm::RS512,
            SigningAlgorithm::ES256 => Algorithm::ES256,
            SigningAlgorithm::ES384 => Algorithm::ES384,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unsupported signing algorithm: `{0}`")]
pub struct UnsupportedAlgorithm(String);

impl FromStr for SigningAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            _ => Err(UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("RS384", SigningAlgorithm::RS384)]
    #[case("rs256", SigningAlgorithm::RS256)]
    #[case("Es384", SigningAlgorithm::ES384)]
    fn algorithm_names_are_case_insensitive(#[case] name: &str, #[case] expected: SigningAlgorithm) {
        assert_eq!(name.parse::<SigningAlgorithm>().unwrap(), expected);
        assert_eq!(expected.to_string(), name.to_ascii_uppercase());
    }

    #[test]
    fn symmetric_algorithms_are_not_supported() {
        assert_eq!(
            "HS256".parse::<SigningAlgorithm>().unwrap_err(),
            UnsupportedAlgorithm("HS256".into())
        );
    }

    #[test]
    fn default_is_rs384() {
        assert_eq!(SigningAlgorithm::default(), SigningAlgorithm::RS384);
        assert!(SigningAlgorithm::default().is_rsa());
        assert!(!SigningAlgorithm::ES384.is_rsa());
    }
}
