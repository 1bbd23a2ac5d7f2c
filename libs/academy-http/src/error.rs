use thiserror::Error;

/// Classification of URL validation failures.
///
/// Lets callers match on the failure mode without parsing the diagnostic
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// HTTP transport error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// HTTP non-2xx status
    #[error("HTTP {status}: {body_preview}")]
    HttpStatus {
        status: http::StatusCode,
        body_preview: String,
        content_type: Option<String>,
    },

    /// JSON parsing error
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Request queue is full (fail-fast)
    #[error("Service overloaded: request queue is full")]
    Overloaded,

    /// Internal service failure (buffer worker died, channel closed)
    #[error("Service unavailable: internal failure")]
    ServiceClosed,

    /// Invalid URL (failed to parse)
    ///
    /// Match on `kind`; `reason` is a diagnostic for logs only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// URL scheme rejected by the transport security mode
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme { scheme: String, reason: String },
}

impl HttpError {
    /// Whether the request never reached the server or never got an answer.
    ///
    /// Timeouts, connection failures and TLS failures count as network errors;
    /// malformed requests and non-2xx statuses do not.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Transport(_)
                | Self::Tls(_)
                | Self::Overloaded
                | Self::ServiceClosed
        )
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fmt;
    use std::time::Duration;

    #[derive(Debug)]
    struct Refused(&'static str);

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Error for Refused {}

    #[test]
    fn transport_error_keeps_source() {
        let err = HttpError::Transport(Box::new(Refused("connection refused")));

        let source = err.source().expect("transport error should have a source");
        let refused = source.downcast_ref::<Refused>().unwrap();
        assert_eq!(refused.0, "connection refused");
    }

    #[test]
    fn network_classification() {
        assert!(HttpError::Timeout(Duration::from_secs(1)).is_network());
        assert!(HttpError::Transport(Box::new(Refused("reset"))).is_network());
        assert!(HttpError::Overloaded.is_network());

        let status = HttpError::HttpStatus {
            status: http::StatusCode::BAD_REQUEST,
            body_preview: String::new(),
            content_type: None,
        };
        assert!(!status.is_network());
        assert!(
            !HttpError::InvalidScheme {
                scheme: "ftp".to_owned(),
                reason: "unsupported".to_owned(),
            }
            .is_network()
        );
    }

    #[test]
    fn status_error_renders_preview() {
        let err = HttpError::HttpStatus {
            status: http::StatusCode::NOT_FOUND,
            body_preview: "no such route".to_owned(),
            content_type: Some("text/plain".to_owned()),
        };
        assert_eq!(err.to_string(), "HTTP 404 Not Found: no such route");
    }
}
