//! Key material: the private key used to sign assertions and the public documents
//! (public key, JWKS) the authorization server uses to verify them.
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Represents a PEM-encoded private key "byte string".
#[derive(Clone, PartialEq)]
pub struct PrivateKeyPem(Vec<u8>);

impl<S: AsRef<[u8]>> From<S> for PrivateKeyPem {
    fn from(key: S) -> Self {
        PrivateKeyPem(key.as_ref().to_vec())
    }
}

impl PrivateKeyPem {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKeyPem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKeyPem").field(&"<hidden>").finish()
    }
}

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("reading `{0}`: `{1}`")]
    Read(PathBuf, io::Error),
    #[error("`{0}` is empty")]
    Empty(PathBuf),
}

/// Supplies the private key assertions are signed with.
#[cfg_attr(test, mockall::automock)]
pub trait PrivateKeyProvider {
    fn private_key(&self) -> Result<PrivateKeyPem, KeyError>;
}

/// Key store kept on the local filesystem as a PEM file. It is read on every call so a
/// rotated key is picked up without restarting.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether the key store can currently be used as a key source.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl PrivateKeyProvider for FileKeyStore {
    fn private_key(&self) -> Result<PrivateKeyPem, KeyError> {
        let pem = read(&self.path)?;
        Ok(PrivateKeyPem::from(pem))
    }
}

/// The public key documents published for server-side verification of assertions.
#[derive(Debug, Clone)]
pub struct PublishedKeys {
    public_key_path: PathBuf,
    jwks_path: PathBuf,
}

impl PublishedKeys {
    pub fn new(public_key_path: impl Into<PathBuf>, jwks_path: impl Into<PathBuf>) -> Self {
        Self {
            public_key_path: public_key_path.into(),
            jwks_path: jwks_path.into(),
        }
    }

    /// The public key file, verbatim.
    pub fn public_key(&self) -> Result<String, KeyError> {
        read_to_string(&self.public_key_path)
    }

    /// The JSON Web Key Set. A file holding a single JWK is wrapped as `{"keys": [<jwk>]}`,
    /// a file that already is a key set is returned verbatim.
    pub fn jwks(&self) -> Result<String, KeyError> {
        let content = read_to_string(&self.jwks_path)?;
        if is_key_set(&content) {
            return Ok(content);
        }
        Ok(format!("{{\"keys\": [{}]}}", content.trim()))
    }
}

fn is_key_set(content: &str) -> bool {
    serde_json::from_str::<Value>(content)
        .ok()
        .and_then(|value| value.get("keys").map(Value::is_array))
        .unwrap_or(false)
}

fn read(path: &Path) -> Result<Vec<u8>, KeyError> {
    let content = fs::read(path).map_err(|e| KeyError::Read(path.to_path_buf(), e))?;
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(KeyError::Empty(path.to_path_buf()));
    }
    Ok(content)
}

fn read_to_string(path: &Path) -> Result<String, KeyError> {
    let content = fs::read_to_string(path).map_err(|e| KeyError::Read(path.to_path_buf(), e))?;
    if content.trim().is_empty() {
        return Err(KeyError::Empty(path.to_path_buf()));
    }
    Ok(content)
}
