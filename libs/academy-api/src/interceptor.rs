use academy_auth::SecretString;
use academy_tenant::{TenantResolution, TenantResolver};
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};

use crate::config::matches_any;

/// Tenant scoping header.
pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant-code");

/// Headers computed for one request attempt.
#[derive(Debug)]
pub struct PreparedHeaders {
    pub tenant: TenantResolution,
    /// Token placed in `Authorization`, kept to detect stale tokens on 401.
    pub bearer: Option<SecretString>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

/// Computes the per-request `X-Tenant-Code` and `Authorization` headers.
///
/// Pure: reads the tenant inputs and the given token, mutates nothing.
/// Static client identification headers are added by the transport layer.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    resolver: TenantResolver,
    host: Option<String>,
    token_paths: Vec<String>,
}

impl RequestInterceptor {
    #[must_use]
    pub fn new(resolver: TenantResolver, host: Option<String>, token_paths: Vec<String>) -> Self {
        Self {
            resolver,
            host,
            token_paths,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    #[must_use]
    pub fn resolve_tenant(&self) -> TenantResolution {
        self.resolver.resolve(self.host.as_deref())
    }

    /// Token issuance and refresh endpoints never carry `Authorization`.
    #[must_use]
    pub fn is_token_path(&self, path: &str) -> bool {
        matches_any(path, &self.token_paths)
    }

    /// Headers for a request to `path` made with `access` (the stored token,
    /// or the refreshed one on replay).
    #[must_use]
    pub fn prepare(&self, path: &str, access: Option<SecretString>) -> PreparedHeaders {
        let tenant = self.resolve_tenant();
        let mut headers = Vec::with_capacity(2);

        if let Some(code) = tenant.code() {
            match HeaderValue::from_str(code) {
                Ok(value) => headers.push((TENANT_HEADER, value)),
                Err(_) => tracing::warn!(tenant = code, "tenant code is not a valid header value"),
            }
        }

        let bearer = access.filter(|_| !self.is_token_path(path));
        if let Some(token) = &bearer {
            match token.bearer_header() {
                Ok(value) => headers.push((AUTHORIZATION, value)),
                Err(_) => tracing::warn!("access token is not a valid header value; sending without it"),
            }
        }

        PreparedHeaders {
            tenant,
            bearer,
            headers,
        }
    }
}
