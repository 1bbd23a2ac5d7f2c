use std::fmt;

use http::HeaderValue;
use http::header::InvalidHeaderValue;
use serde::{Deserialize, Deserializer};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A credential string (access or refresh token).
///
/// Formatting never reveals the value: `Debug` and `Display` print
/// `[REDACTED]`. The buffer is zeroed on drop. Token contents are opaque to
/// the client; nothing here parses them.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value. Do not log or persist the returned slice outside the
    /// token store.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `Bearer <token>` as a header value flagged sensitive, so it is left
    /// out of HPACK tables and debug output.
    ///
    /// # Errors
    /// Returns [`InvalidHeaderValue`] if the token contains bytes that are
    /// not valid in a header.
    pub fn bearer_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let raw = Zeroizing::new(format!("Bearer {}", self.0));
        HeaderValue::from_str(&raw).map(academy_http::security::sensitive)
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
