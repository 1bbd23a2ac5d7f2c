use std::fmt;

use serde::Serialize;

use crate::config::TenantResolverConfig;
use crate::overrides::TenantOverrideStore;
use crate::registry::{Tenant, TenantRegistry};

/// Where a resolved tenant code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantSource {
    Storage,
    Hostname,
    Env,
}

/// Why no tenant code could be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No hostname was available and nothing else applied.
    Missing,
    /// The hostname exists but cannot identify a tenant on its own.
    Ambiguous,
    /// The hostname is empty or malformed.
    InvalidHost,
}

impl fmt::Display for TenantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Storage => "storage",
            Self::Hostname => "hostname",
            Self::Env => "env",
        })
    }
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::Ambiguous => "ambiguous",
            Self::InvalidHost => "invalid_host",
        })
    }
}

/// Outcome of resolving the tenant for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TenantResolution {
    Resolved { code: String, source: TenantSource },
    Unresolved { reason: UnresolvedReason },
}

impl TenantResolution {
    /// The tenant code, if resolved.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Resolved { code, .. } => Some(code),
            Self::Unresolved { .. } => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

impl fmt::Display for TenantResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { code, source } => write!(f, "{code} (from {source})"),
            Self::Unresolved { reason } => write!(f, "unresolved ({reason})"),
        }
    }
}

/// A tenant derived from a hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameMatch {
    pub code: String,
    /// Registry entry when the hostname is in the static table.
    pub tenant: Option<&'static Tenant>,
}

/// Normalize a hostname: trim, lowercase, drop the port and a trailing dot.
///
/// Bracketed IPv6 literals keep their brackets (`[::1]:8080` -> `[::1]`).
#[must_use]
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();
    let host = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => host[..=end].to_owned(),
            None => host,
        }
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or_default().to_owned()
    } else {
        host
    };
    host.trim_end_matches('.').to_owned()
}

/// Tenant codes are 1-63 chars of `[a-z0-9-]`, not starting or ending with `-`.
#[must_use]
pub fn is_valid_tenant_code(code: &str) -> bool {
    (1..=63).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !code.starts_with('-')
        && !code.ends_with('-')
}

fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]") || host.ends_with(".localhost")
}

fn is_valid_hostname(host: &str) -> bool {
    host.split('.').all(|label| {
        !label.is_empty()
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    })
}

fn normalize_domain(raw: &str) -> String {
    raw.trim().trim_matches('.').to_ascii_lowercase()
}

/// Resolves the tenant code attached to outgoing requests.
///
/// Precedence: stored override, then hostname, then configured default.
/// Resolution is a pure function of those three inputs; no network access.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    registry: TenantRegistry,
    base_domains: Vec<String>,
    reserved_labels: Vec<String>,
    ephemeral_suffixes: Vec<String>,
    default_code: Option<String>,
    overrides: TenantOverrideStore,
}

impl TenantResolver {
    #[must_use]
    pub fn new(
        registry: TenantRegistry,
        config: &TenantResolverConfig,
        overrides: TenantOverrideStore,
    ) -> Self {
        Self {
            registry,
            base_domains: config
                .base_domains
                .iter()
                .map(|d| normalize_domain(d))
                .filter(|d| !d.is_empty())
                .collect(),
            reserved_labels: config
                .reserved_labels
                .iter()
                .map(|l| l.trim().to_ascii_lowercase())
                .collect(),
            ephemeral_suffixes: config
                .ephemeral_suffixes
                .iter()
                .map(|s| normalize_domain(s))
                .filter(|s| !s.is_empty())
                .collect(),
            default_code: config
                .default_code
                .as_deref()
                .map(|c| c.trim().to_ascii_lowercase())
                .filter(|c| !c.is_empty()),
            overrides,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    #[must_use]
    pub fn overrides(&self) -> &TenantOverrideStore {
        &self.overrides
    }

    /// Resolve the tenant for a request served from `host`.
    #[must_use]
    pub fn resolve(&self, host: Option<&str>) -> TenantResolution {
        if let Some(code) = self.overrides.get() {
            return TenantResolution::Resolved {
                code,
                source: TenantSource::Storage,
            };
        }

        let host_failure = match host {
            Some(host) => match self.resolve_hostname(host) {
                Ok(found) => {
                    return TenantResolution::Resolved {
                        code: found.code,
                        source: TenantSource::Hostname,
                    };
                }
                Err(reason) => {
                    tracing::debug!(host, %reason, "hostname does not identify a tenant");
                    reason
                }
            },
            None => UnresolvedReason::Missing,
        };

        match &self.default_code {
            Some(code) => TenantResolution::Resolved {
                code: code.clone(),
                source: TenantSource::Env,
            },
            None => TenantResolution::Unresolved {
                reason: host_failure,
            },
        }
    }

    /// Derive a tenant from the hostname alone.
    ///
    /// # Errors
    /// Returns the [`UnresolvedReason`] when the hostname is malformed or
    /// cannot identify a tenant without an override.
    pub fn resolve_hostname(&self, raw: &str) -> Result<HostnameMatch, UnresolvedReason> {
        let host = normalize_host(raw);
        if host.is_empty() {
            return Err(UnresolvedReason::InvalidHost);
        }
        if is_local_host(&host) {
            return Err(UnresolvedReason::Ambiguous);
        }
        if !is_valid_hostname(&host) {
            return Err(UnresolvedReason::InvalidHost);
        }
        if self
            .ephemeral_suffixes
            .iter()
            .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
        {
            return Err(UnresolvedReason::Ambiguous);
        }

        for base in &self.base_domains {
            if host == *base {
                return Err(UnresolvedReason::Ambiguous);
            }
            let Some(label) = host
                .strip_suffix(base.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
            else {
                continue;
            };
            if label.contains('.') || self.reserved_labels.iter().any(|r| r == label) {
                return Err(UnresolvedReason::Ambiguous);
            }
            if let Some(tenant) = self.registry.by_hostname(&host) {
                return Ok(table_match(tenant));
            }
            if !is_valid_tenant_code(label) {
                return Err(UnresolvedReason::InvalidHost);
            }
            return Ok(HostnameMatch {
                code: label.to_owned(),
                tenant: self.registry.by_code(label),
            });
        }

        self.registry
            .by_hostname(&host)
            .map(table_match)
            .ok_or(UnresolvedReason::Ambiguous)
    }
}

fn table_match(tenant: &'static Tenant) -> HostnameMatch {
    HostnameMatch {
        code: tenant.code.to_owned(),
        tenant: Some(tenant),
    }
}
