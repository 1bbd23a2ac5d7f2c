#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Tenant registry and tenant-code resolution.
//!
//! Every API request is scoped to one academy tenant through the
//! `X-Tenant-Code` header. The code comes from, in order:
//!
//! 1. an explicit override saved in storage (operator tenant switch),
//! 2. the hostname the client is serving (static table or `{tenant}.<base>`),
//! 3. a configured default for local development.
//!
//! When none applies the resolver reports why instead of guessing.

mod config;
mod error;
mod overrides;
mod registry;
mod resolver;

pub use config::TenantResolverConfig;
pub use error::TenantError;
pub use overrides::{TENANT_STORAGE_KEY, TenantOverrideStore};
pub use registry::{DEFAULT_LOGIN_PATH, Tenant, TenantBranding, TenantRegistry};
pub use resolver::{
    HostnameMatch, TenantResolution, TenantResolver, TenantSource, UnresolvedReason,
    is_valid_tenant_code, normalize_host,
};
