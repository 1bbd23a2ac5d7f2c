use std::sync::Arc;

use crate::coordinator::{Acquired, RefreshCoordinator};
use crate::error::RefreshError;
use crate::refresher::TokenRefresher;
use crate::secret::SecretString;
use crate::store::{TokenPair, TokenStore};

/// Session state shared by all clones of an API client: stored tokens plus
/// the refresh gate.
pub struct AuthSession {
    tokens: TokenStore,
    coordinator: RefreshCoordinator,
    refresher: Arc<dyn TokenRefresher>,
}

impl AuthSession {
    #[must_use]
    pub fn new(tokens: TokenStore, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            tokens,
            coordinator: RefreshCoordinator::new(),
            refresher,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.tokens.access()
    }

    /// Start a session with freshly issued credentials.
    pub fn sign_in(&self, pair: &TokenPair) {
        self.tokens.set_pair(pair);
        tracing::info!("session started");
    }

    /// End the session locally.
    pub fn sign_out(&self) {
        self.tokens.clear_all();
        tracing::info!("session cleared");
    }

    /// Obtain an access token to replay a request that got 401 while
    /// carrying `sent`.
    ///
    /// Only one refresh runs at a time; concurrent callers share its
    /// outcome. If the stored token already differs from `sent`, another
    /// request refreshed in the meantime and that token is returned
    /// without a new refresh. `None` means the session is over: the refresh
    /// failed and both tokens were cleared.
    pub async fn refresh_access(&self, sent: Option<&SecretString>) -> Option<SecretString> {
        let guard = match self.coordinator.acquire() {
            Acquired::Follower(waiter) => return waiter.wait().await,
            Acquired::Leader(guard) => guard,
        };

        if let Some(current) = self.tokens.access()
            && sent != Some(&current)
        {
            tracing::debug!("access token already replaced; skipping refresh");
            guard.release(Some(current.clone()));
            return Some(current);
        }

        let outcome = match self.run_refresh().await {
            Ok(access) => Some(access),
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; clearing session");
                self.tokens.clear_all();
                None
            }
        };
        let released = guard.release(outcome.clone());
        tracing::debug!(released, ok = outcome.is_some(), "refresh finished");
        outcome
    }

    async fn run_refresh(&self) -> Result<SecretString, RefreshError> {
        let refresh = self
            .tokens
            .refresh()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let refreshed = self.refresher.refresh(&refresh).await?;
        match refreshed.refresh {
            Some(rotated) => self.tokens.set_pair(&TokenPair {
                access: refreshed.access.clone(),
                refresh: rotated,
            }),
            None => self.tokens.set_access(&refreshed.access),
        }
        tracing::info!("access token refreshed");
        Ok(refreshed.access)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("tokens", &self.tokens)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
