use std::sync::Arc;

use academy_auth::{AuthSession, HttpTokenRefresher, SecretString, TokenStore};
use academy_http::{HttpClient, HttpResponse};
use academy_storage::KeyValueStore;
use academy_tenant::{
    TenantOverrideStore, TenantRegistry, TenantResolution, TenantResolver, TenantResolverConfig,
};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{ApiConfig, REFRESH_PATH, matches_any};
use crate::error::ApiError;
use crate::interceptor::RequestInterceptor;

struct Inner {
    http: HttpClient,
    root: String,
    interceptor: RequestInterceptor,
    session: Arc<AuthSession>,
    no_refresh_paths: Vec<String>,
    require_tenant: bool,
}

/// Academy REST client.
///
/// Every request gets the tenant and bearer headers from the
/// [`RequestInterceptor`]. A 401 triggers one shared token refresh and a
/// single replay; see [`AuthSession::refresh_access`].
///
/// Cloning is cheap; clones share the session and its refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Assemble a client from already-built parts.
    ///
    /// # Errors
    /// Returns a `Validation` error if `config.base_url` is not an absolute URL.
    pub fn new(
        config: &ApiConfig,
        http: HttpClient,
        resolver: TenantResolver,
        session: Arc<AuthSession>,
    ) -> Result<Self, ApiError> {
        let root = config.api_root();
        url::Url::parse(&root)
            .map_err(|e| ApiError::invalid_request(format!("invalid base_url '{root}': {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                root,
                interceptor: RequestInterceptor::new(
                    resolver,
                    config.host.clone(),
                    config.token_paths.clone(),
                ),
                session,
                no_refresh_paths: config.no_refresh_paths.clone(),
                require_tenant: config.require_tenant,
            }),
        })
    }

    /// Build the whole stack (tenant resolver, token store, refresher) over
    /// one key-value store.
    ///
    /// # Errors
    /// Returns a `Validation` error if `config.base_url` is not an absolute URL.
    pub fn from_config(
        config: &ApiConfig,
        tenant: &TenantResolverConfig,
        http: HttpClient,
        store: &Arc<dyn KeyValueStore>,
    ) -> Result<Self, ApiError> {
        let refresher = HttpTokenRefresher::new(
            http.clone(),
            format!("{}{REFRESH_PATH}", config.api_root()),
        );
        let session = AuthSession::new(TokenStore::new(Arc::clone(store)), Arc::new(refresher));
        let resolver = TenantResolver::new(
            TenantRegistry::builtin(),
            tenant,
            TenantOverrideStore::new(Arc::clone(store)),
        );
        Self::new(config, http, resolver, Arc::new(session))
    }

    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    #[must_use]
    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.inner.interceptor
    }

    /// The tenant the next request will be scoped to.
    #[must_use]
    pub fn tenant(&self) -> TenantResolution {
        self.inner.interceptor.resolve_tenant()
    }

    /// Absolute URL of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.inner.root)
        } else {
            format!("{}/{path}", self.inner.root)
        }
    }

    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest {
            client: self.clone(),
            method,
            path: if path.starts_with('/') {
                path.to_owned()
            } else {
                format!("/{path}")
            },
            query: Vec::new(),
            body: None,
            error: None,
        }
    }

    pub fn get(&self, path: &str) -> ApiRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> ApiRequest {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> ApiRequest {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> ApiRequest {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> ApiRequest {
        self.request(Method::DELETE, path)
    }

    fn may_refresh(&self, path: &str) -> bool {
        !self.inner.interceptor.is_token_path(path)
            && !matches_any(path, &self.inner.no_refresh_paths)
    }

    async fn execute(
        &self,
        method: &Method,
        path: &str,
        url: &str,
        body: Option<&Bytes>,
    ) -> Result<ApiResponse, ApiError> {
        let session = &self.inner.session;
        let (response, sent) = self
            .attempt(method, path, url, body, session.access_token())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.may_refresh(path) {
            return finish(response).await;
        }

        tracing::debug!(%method, path, "401 received; refreshing access token");
        let Some(token) = session.refresh_access(sent.as_ref()).await else {
            return finish(response).await;
        };

        // The replay is final: a second 401 is returned as-is.
        let (replayed, _) = self.attempt(method, path, url, body, Some(token)).await?;
        finish(replayed).await
    }

    async fn attempt(
        &self,
        method: &Method,
        path: &str,
        url: &str,
        body: Option<&Bytes>,
        access: Option<SecretString>,
    ) -> Result<(HttpResponse, Option<SecretString>), ApiError> {
        let prepared = self.inner.interceptor.prepare(path, access);
        if self.inner.require_tenant
            && let TenantResolution::Unresolved { reason } = prepared.tenant
        {
            return Err(ApiError::ambiguous_tenant(reason));
        }

        let mut builder = self.inner.http.request(method.clone(), url);
        for (name, value) in prepared.headers {
            builder = builder.typed_header(name, value);
        }
        if let Some(body) = body {
            builder = builder.json_bytes(body.clone());
        }

        let response = builder.send().await?;
        tracing::debug!(%method, path, status = response.status().as_u16(), "api response");
        Ok((response, prepared.bearer))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("root", &self.inner.root)
            .field("require_tenant", &self.inner.require_tenant)
            .finish_non_exhaustive()
    }
}

async fn finish(response: HttpResponse) -> Result<ApiResponse, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let preview = response.preview().await?;
        return Err(ApiError::from_response(status, &preview));
    }
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Ok(ApiResponse {
        status,
        headers,
        body,
    })
}

/// One API call under construction.
#[must_use = "ApiRequest does nothing until .send() is called"]
pub struct ApiRequest {
    client: ApiClient,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
    error: Option<ApiError>,
}

impl ApiRequest {
    /// Append a query parameter.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    /// JSON request body. Serialization errors surface from [`send`](Self::send).
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.error = Some(ApiError::invalid_request(format!("request body: {e}"))),
        }
        self
    }

    fn full_url(&self) -> Result<String, ApiError> {
        let raw = self.client.url(&self.path);
        if self.query.is_empty() {
            return Ok(raw);
        }
        let mut url = url::Url::parse(&raw)
            .map_err(|e| ApiError::invalid_request(format!("invalid URL '{raw}': {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(url.into())
    }

    /// Send the request, refreshing the access token once on 401.
    ///
    /// # Errors
    /// Returns [`ApiError`] for transport failures, non-2xx answers and an
    /// unresolved tenant when tenants are required.
    pub async fn send(self) -> Result<ApiResponse, ApiError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let url = self.full_url()?;
        self.client
            .execute(&self.method, &self.path, &url, self.body.as_ref())
            .await
    }

    /// Send and decode a JSON response.
    ///
    /// # Errors
    /// As [`send`](Self::send), plus `Decode` when the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.send().await?.json()
    }
}

/// Successful (2xx) API response with its body read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// # Errors
    /// Returns a `Decode` error when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::decode(&e))
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
