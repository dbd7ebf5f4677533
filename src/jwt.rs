//! Client assertions: the signed JWTs presented to the token endpoint instead of a secret.
pub mod claims;
pub mod error;
pub mod signed;
pub mod signer;
