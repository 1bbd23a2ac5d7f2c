use std::fmt;

use academy_http::HttpError;
use academy_tenant::UnresolvedReason;
use http::StatusCode;
use serde::Deserialize;

/// What went wrong, for callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiErrorKind {
    /// No response: timeout, connection failure, TLS failure.
    Network,
    /// 401 that could not be recovered by a token refresh.
    Unauthorized,
    /// 403; never refreshed.
    Forbidden,
    /// Tenant could not be resolved and the client requires one.
    AmbiguousTenant,
    /// 400/422 from the backend, or a request the client refused to build.
    Validation,
    /// Any other non-2xx status.
    Status,
    /// 2xx whose body did not match the expected shape.
    Decode,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::AmbiguousTenant => "tenant not resolved",
            Self::Validation => "validation failed",
            Self::Status => "request failed",
            Self::Decode => "unexpected response",
        })
    }
}

/// Error returned by every academy API call.
///
/// Renders as `kind (HTTP status): detail`, falling back to the transport
/// error when the backend sent no detail.
#[derive(Debug, thiserror::Error)]
#[error("{kind}{}", self.suffix())]
pub struct ApiError {
    kind: ApiErrorKind,
    status: Option<StatusCode>,
    detail: Option<String>,
    #[source]
    source: Option<HttpError>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// HTTP status, when the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Backend `detail` message, when the error body carried one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Error for a non-2xx response. `body` is the (possibly truncated)
    /// response body; a JSON `{"detail": ...}` is picked up as the detail.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED => ApiErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ApiErrorKind::Forbidden,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiErrorKind::Validation,
            _ => ApiErrorKind::Status,
        };
        Self {
            kind,
            status: Some(status),
            detail: parse_detail(body),
            source: None,
        }
    }

    pub(crate) fn ambiguous_tenant(reason: UnresolvedReason) -> Self {
        Self {
            kind: ApiErrorKind::AmbiguousTenant,
            status: None,
            detail: Some(reason.to_string()),
            source: None,
        }
    }

    pub(crate) fn decode(err: &serde_json::Error) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            status: None,
            detail: Some(err.to_string()),
            source: None,
        }
    }

    fn suffix(&self) -> String {
        let status = self
            .status
            .map(|s| format!(" (HTTP {})", s.as_u16()))
            .unwrap_or_default();
        match (&self.detail, &self.source) {
            (Some(detail), _) => format!("{status}: {detail}"),
            (None, Some(source)) => format!("{status}: {source}"),
            (None, None) => status,
        }
    }

    pub(crate) fn invalid_request(detail: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Validation,
            status: None,
            detail: Some(detail.into()),
            source: None,
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        if let HttpError::HttpStatus {
            status,
            body_preview,
            ..
        } = &err
        {
            return Self::from_response(*status, body_preview.as_bytes());
        }
        let kind = if err.is_network() {
            ApiErrorKind::Network
        } else if matches!(err, HttpError::Json(_) | HttpError::BodyTooLarge { .. }) {
            ApiErrorKind::Decode
        } else {
            ApiErrorKind::Validation
        };
        Self {
            kind,
            status: None,
            detail: None,
            source: Some(err),
        }
    }
}


fn parse_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
