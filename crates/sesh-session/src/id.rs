//! Session identifiers.

use std::borrow::Borrow;
use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Number of random bytes behind every identifier.
pub const SESSION_ID_BYTES: usize = 32;

/// Opaque, cookie-safe session identifier.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionId(Box<str>);

impl SessionId {
    /// Generate a fresh identifier from the OS random source.
    ///
    /// The bytes are base64 encoded with the URL-safe alphabet and then
    /// percent-escaped, so the result can be used verbatim as a cookie value.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Entropy(e.to_string()))?;

        let encoded = URL_SAFE.encode(bytes);
        Ok(Self(urlencoding::encode(&encoded).into_owned().into_boxed_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0.into_string()
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
