use academy_auth::TokenPair;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::client::ApiClient;
use crate::config::{LOGIN_PATH, ME_PATH};
use crate::error::{ApiError, ApiErrorKind};

/// Role of the signed-in user within the current tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Owner,
    Admin,
    Teacher,
    Staff,
    Student,
    Parent,
    #[serde(other)]
    Unknown,
}

/// `GET /core/me/` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default, rename = "tenantRole")]
    pub tenant_role: Option<TenantRole>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Exchange credentials for a token pair and store it.
    ///
    /// # Errors
    /// `Unauthorized` for wrong credentials; transport and status errors
    /// otherwise. Nothing is stored on failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let password = Zeroizing::new(password.to_owned());
        let pair: TokenPair = self
            .post(LOGIN_PATH)
            .json(&Credentials {
                username,
                password: &password,
            })
            .send_json()
            .await?;
        self.session().sign_in(&pair);
        tracing::info!(username, "logged in");
        Ok(())
    }

    /// Forget the stored tokens. Local only.
    pub fn logout(&self) {
        self.session().sign_out();
    }

    /// The signed-in user, or `None` without a stored access token (no
    /// request is made then).
    ///
    /// This endpoint never triggers a refresh. A 401 or 403 ends the local
    /// session before the error is returned.
    ///
    /// # Errors
    /// Returns [`ApiError`] for any failed request.
    pub async fn current_user(&self) -> Result<Option<User>, ApiError> {
        if self.session().access_token().is_none() {
            return Ok(None);
        }
        match self.get(ME_PATH).send_json::<User>().await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                if matches!(
                    e.kind(),
                    ApiErrorKind::Unauthorized | ApiErrorKind::Forbidden
                ) {
                    tracing::info!(status = ?e.status(), "session rejected by backend; clearing");
                    self.session().sign_out();
                }
                Err(e)
            }
        }
    }
}
