use thiserror::Error;

/// Errors returned by tenant operations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TenantError {
    /// Tenant codes are lowercase ASCII letters, digits and inner hyphens.
    #[error("invalid tenant code: {0:?}")]
    InvalidCode(String),
}
