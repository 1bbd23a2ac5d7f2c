use crate::config::ClientIdentity;
use crate::error::HttpError;
use http::header::{HeaderName, USER_AGENT};
use http::{HeaderValue, Request, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Header carrying the client application name.
pub const CLIENT_NAME_HEADER: HeaderName = HeaderName::from_static("x-client");

/// Header carrying the client application version.
pub const CLIENT_VERSION_HEADER: HeaderName = HeaderName::from_static("x-client-version");

#[derive(Clone)]
struct IdentityHeaders {
    name: HeaderValue,
    version: HeaderValue,
    user_agent: HeaderValue,
}

/// Tower layer that stamps client identification headers on every request.
///
/// Adds `X-Client`, `X-Client-Version` and `User-Agent`. Headers the caller
/// already set are left untouched.
#[derive(Clone)]
pub struct ClientIdentityLayer {
    headers: IdentityHeaders,
}

impl ClientIdentityLayer {
    /// Create a layer for the given identity
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the name or version cannot be
    /// encoded as a header value
    pub fn try_new(identity: &ClientIdentity) -> Result<Self, HttpError> {
        let headers = IdentityHeaders {
            name: HeaderValue::from_str(&identity.name)?,
            version: HeaderValue::from_str(&identity.version)?,
            user_agent: HeaderValue::from_str(&identity.user_agent())?,
        };
        Ok(Self { headers })
    }
}

impl<S> Layer<S> for ClientIdentityLayer {
    type Service = ClientIdentityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIdentityService {
            inner,
            headers: self.headers.clone(),
        }
    }
}

/// Service that adds client identification headers to requests
#[derive(Clone)]
pub struct ClientIdentityService<S> {
    inner: S,
    headers: IdentityHeaders,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ClientIdentityService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let headers = req.headers_mut();
        for (name, value) in [
            (CLIENT_NAME_HEADER, &self.headers.name),
            (CLIENT_VERSION_HEADER, &self.headers.version),
            (USER_AGENT, &self.headers.user_agent),
        ] {
            if !headers.contains_key(&name) {
                headers.insert(name, value.clone());
            }
        }
        self.inner.call(req)
    }
}
