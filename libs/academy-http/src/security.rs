//! HTTP security utilities.

/// Maximum body preview size for error messages (8KB).
///
/// Non-2xx bodies are read up to this limit so that backend `detail` messages
/// can be surfaced without buffering arbitrarily large error pages.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Mark a header value as sensitive so it is omitted from debug output.
#[must_use]
pub fn sensitive(mut value: http::HeaderValue) -> http::HeaderValue {
    value.set_sensitive(true);
    value
}
