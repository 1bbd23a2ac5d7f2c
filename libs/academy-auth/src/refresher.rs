use academy_http::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RefreshError;
use crate::secret::SecretString;

/// New credentials returned by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access: SecretString,
    /// Present when the backend rotates refresh tokens.
    pub refresh: Option<SecretString>,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// # Errors
    /// Returns [`RefreshError`] on any failure; the caller then ends the
    /// session.
    async fn refresh(&self, refresh: &SecretString) -> Result<RefreshedTokens, RefreshError>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<SecretString>,
    #[serde(default)]
    refresh: Option<SecretString>,
}

/// `POST {endpoint}` with `{"refresh": ...}`, expecting `{"access", "refresh"?}`.
///
/// The request goes straight to the transport, so it never carries an
/// `Authorization` header.
#[derive(Clone)]
pub struct HttpTokenRefresher {
    client: HttpClient,
    endpoint: String,
}

impl HttpTokenRefresher {
    #[must_use]
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh: &SecretString) -> Result<RefreshedTokens, RefreshError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RefreshRequest {
                refresh: refresh.expose(),
            })
            .map_err(|e| RefreshError::http(&e))?
            .send()
            .await
            .map_err(|e| RefreshError::http(&e))?;

        let body: RefreshResponse = response
            .error_for_status()
            .map_err(|e| RefreshError::http(&e))?
            .json()
            .await
            .map_err(|e| RefreshError::http(&e))?;

        let access = body
            .access
            .filter(|t| !t.is_blank())
            .ok_or_else(|| RefreshError::InvalidResponse("missing access token".into()))?;

        Ok(RefreshedTokens {
            access,
            refresh: body.refresh.filter(|t| !t.is_blank()),
        })
    }
}

impl std::fmt::Debug for HttpTokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTokenRefresher")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
