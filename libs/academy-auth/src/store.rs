use std::sync::Arc;

use academy_storage::KeyValueStore;
use serde::Deserialize;

use crate::secret::SecretString;

/// Storage key of the access token.
pub const ACCESS_KEY: &str = "access";
/// Storage key of the refresh token.
pub const REFRESH_KEY: &str = "refresh";

/// Access/refresh credential pair as issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: SecretString,
}

/// Durable storage for the current session's tokens.
///
/// At most one access and one refresh token exist at a time. Storage
/// failures are logged and then treated as "no token"; they never reach
/// callers.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn access(&self) -> Option<SecretString> {
        self.read(ACCESS_KEY)
    }

    #[must_use]
    pub fn refresh(&self) -> Option<SecretString> {
        self.read(REFRESH_KEY)
    }

    /// Replace the access token, keeping the refresh token.
    pub fn set_access(&self, access: &SecretString) {
        self.write(ACCESS_KEY, access);
    }

    /// Store a full pair (login, or refresh with rotation) in one write, so
    /// a new access token is never left beside a stale refresh token.
    pub fn set_pair(&self, pair: &TokenPair) {
        let entries = [
            (ACCESS_KEY, pair.access.expose()),
            (REFRESH_KEY, pair.refresh.expose()),
        ];
        if let Err(e) = self.store.set_many(&entries) {
            tracing::warn!(error = %e, "failed to persist token pair");
        }
    }

    /// Drop both tokens.
    pub fn clear_all(&self) {
        if let Err(e) = self.store.remove_many(&[ACCESS_KEY, REFRESH_KEY]) {
            tracing::warn!(error = %e, "failed to remove tokens");
        }
    }

    fn read(&self, key: &str) -> Option<SecretString> {
        match self.store.get(key) {
            Ok(value) => value.map(SecretString::from).filter(|t| !t.is_blank()),
            Err(e) => {
                tracing::warn!(key, error = %e, "token unreadable; treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, token: &SecretString) {
        if let Err(e) = self.store.set(key, token.expose()) {
            tracing::warn!(key, error = %e, "failed to persist token");
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access", &self.access().is_some())
            .finish_non_exhaustive()
    }
}
