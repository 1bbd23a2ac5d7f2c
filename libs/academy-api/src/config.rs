use serde::{Deserialize, Serialize};

/// Login endpoint, relative to the API root.
pub const LOGIN_PATH: &str = "/token/";
/// Refresh endpoint, relative to the API root.
pub const REFRESH_PATH: &str = "/token/refresh/";
/// Current-user endpoint, relative to the API root.
pub const ME_PATH: &str = "/core/me/";

/// Academy REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Backend origin, e.g. `https://api.hakwonplus.com`.
    pub base_url: String,

    /// Prefix of every API path (default `/api/v1`).
    pub path_prefix: String,

    /// Hostname the client is serving; input to tenant resolution.
    pub host: Option<String>,

    /// Paths that issue or refresh tokens. They never carry
    /// `Authorization` and a 401 on them is never refreshed.
    pub token_paths: Vec<String>,

    /// Paths whose 401 is surfaced without attempting a refresh.
    pub no_refresh_paths: Vec<String>,

    /// Fail with `AmbiguousTenant` instead of sending requests without
    /// `X-Tenant-Code`.
    pub require_tenant: bool,

    /// Value of `X-Client`.
    pub client_name: String,

    /// Value of `X-Client-Version`; defaults to the crate version.
    pub client_version: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            path_prefix: "/api/v1".to_owned(),
            host: None,
            token_paths: vec![LOGIN_PATH.to_owned(), REFRESH_PATH.to_owned()],
            no_refresh_paths: vec![ME_PATH.to_owned()],
            require_tenant: false,
            client_name: academy_http::DEFAULT_CLIENT_NAME.to_owned(),
            client_version: None,
        }
    }
}

impl ApiConfig {
    /// Absolute API root: `base_url` without trailing slash plus the prefix.
    #[must_use]
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_owned()
        } else {
            format!("{base}/{prefix}")
        }
    }

    /// Client identity sent on every request.
    #[must_use]
    pub fn identity(&self) -> academy_http::ClientIdentity {
        academy_http::ClientIdentity::new(
            self.client_name.clone(),
            self.client_version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_owned()),
        )
    }
}

/// Path without query string or fragment, with a leading slash.
pub(crate) fn route_of(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

pub(crate) fn matches_any(path: &str, routes: &[String]) -> bool {
    let route = route_of(path);
    routes.iter().any(|r| r == route)
}
