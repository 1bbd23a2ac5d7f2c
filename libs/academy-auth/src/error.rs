use academy_http::HttpError;
use thiserror::Error;

/// Why an access-token refresh failed.
///
/// Messages never contain token values or response bodies.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RefreshError {
    /// There is no refresh token in storage.
    #[error("no refresh token stored")]
    MissingRefreshToken,

    /// Transport failure or non-2xx answer from the refresh endpoint.
    #[error("{0}")]
    Http(String),

    /// The endpoint answered 2xx without a usable access token.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),
}

impl RefreshError {
    pub(crate) fn http(e: &HttpError) -> Self {
        Self::Http(describe_http_error(e, "token refresh"))
    }
}

/// One-line description of a transport error, prefixed with the call site.
///
/// Status errors keep only the status code.
#[must_use]
pub fn describe_http_error(e: &HttpError, prefix: &str) -> String {
    match e {
        HttpError::HttpStatus { status, .. } => format!("{prefix} HTTP {status}"),
        HttpError::Json(err) => format!("{prefix} JSON parse failed: {err}"),
        HttpError::Timeout(duration) => format!("{prefix} timed out after {duration:?}"),
        HttpError::Transport(err) => format!("{prefix} transport error: {err}"),
        HttpError::Tls(err) => format!("{prefix} TLS error: {err}"),
        HttpError::BodyTooLarge { limit, actual } => {
            format!("{prefix} response too large: limit {limit} bytes, got {actual} bytes")
        }
        HttpError::Overloaded => format!("{prefix} rejected: client overloaded"),
        HttpError::ServiceClosed => format!("{prefix} client unavailable"),
        HttpError::InvalidUri { url, reason, .. } => {
            format!("{prefix} invalid URL '{url}': {reason}")
        }
        HttpError::InvalidScheme { scheme, reason } => {
            format!("{prefix} invalid scheme '{scheme}': {reason}")
        }
        _ => format!("{prefix} request failed"),
    }
}
