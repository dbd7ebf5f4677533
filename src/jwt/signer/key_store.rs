use super::local::LocalPrivateKeySigner;
use super::{JwtSigner, SigningAlgorithm};
use crate::jwt::{claims::Claims, error::JwtEncoderError, signed::SignedJwt};
use crate::key::PrivateKeyProvider;

/// Signer loading its key from a [`PrivateKeyProvider`] each time an assertion is signed.
#[derive(Debug)]
pub struct KeyStoreSigner<K> {
    key_store: K,
    algorithm: SigningAlgorithm,
}

impl<K> KeyStoreSigner<K>
where
    K: PrivateKeyProvider,
{
    pub fn new(key_store: K, algorithm: SigningAlgorithm) -> Self {
        Self {
            key_store,
            algorithm,
        }
    }
}

impl<K> JwtSigner for KeyStoreSigner<K>
where
    K: PrivateKeyProvider,
{
    fn sign(&self, key_id: &str, claims: Claims) -> Result<SignedJwt, JwtEncoderError> {
        let pem = self
            .key_store
            .private_key()
            .map_err(|e| JwtEncoderError::KeyUnavailable(e.to_string()))?;
        let signer = LocalPrivateKeySigner::try_new(&pem, self.algorithm)
            .map_err(|e| JwtEncoderError::KeyUnavailable(e.to_string()))?;

        signer.sign(key_id, claims)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use super::*;
    use crate::jwt::signer::local::tests::RSA_PRIVATE_KEY;
    use crate::key::{KeyError, MockPrivateKeyProvider, PrivateKeyPem};

    fn claims() -> Claims {
        Claims::new(
            "client".into(),
            "https://auth.example.org/token",
            jsonwebtoken::get_current_timestamp(),
            300,
        )
    }

    #[test]
    fn signs_with_the_loaded_key() {
        let mut key_store = MockPrivateKeyProvider::new();
        key_store
            .expect_private_key()
            .times(2)
            .returning(|| Ok(PrivateKeyPem::from(RSA_PRIVATE_KEY)));

        let signer = KeyStoreSigner::new(key_store, SigningAlgorithm::RS384);

        assert!(signer.sign("kid", claims()).is_ok());
        assert!(signer.sign("kid", claims()).is_ok());
    }

    #[test]
    fn unreadable_key_store() {
        let mut key_store = MockPrivateKeyProvider::new();
        key_store.expect_private_key().once().returning(|| {
            Err(KeyError::Read(
                PathBuf::from("bserKeystore.pem"),
                io::Error::from(io::ErrorKind::NotFound),
            ))
        });

        let signer = KeyStoreSigner::new(key_store, SigningAlgorithm::RS384);

        assert_matches!(
            signer.sign("kid", claims()),
            Err(JwtEncoderError::KeyUnavailable(msg)) if msg.contains("bserKeystore.pem")
        );
    }

    #[test]
    fn unusable_key() {
        let mut key_store = MockPrivateKeyProvider::new();
        key_store
            .expect_private_key()
            .once()
            .returning(|| Ok(PrivateKeyPem::from("not a key")));

        let signer = KeyStoreSigner::new(key_store, SigningAlgorithm::RS384);

        assert_matches!(
            signer.sign("kid", claims()),
            Err(JwtEncoderError::KeyUnavailable(_))
        );
    }
}
