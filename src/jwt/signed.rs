use std::fmt;

/// A compact, signed JWT.
#[derive(Clone, PartialEq)]
pub struct SignedJwt {
    /// Encoded value
    pub(crate) value: String,
}

impl SignedJwt {
    /// Get the encoded value
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SignedJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedJwt")
            .field("value", &"<hidden>")
            .finish()
    }
}
