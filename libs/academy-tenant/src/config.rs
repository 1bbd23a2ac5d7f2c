use serde::{Deserialize, Serialize};

/// Hostname rules for tenant resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TenantResolverConfig {
    /// Shared domains whose first-level subdomain is a tenant code
    /// (`acme.<base>` resolves to `acme`). The apex itself is ambiguous.
    pub base_domains: Vec<String>,

    /// Subdomains of a base domain that never name a tenant.
    pub reserved_labels: Vec<String>,

    /// Preview/ephemeral hosting suffixes; hosts under them are ambiguous.
    pub ephemeral_suffixes: Vec<String>,

    /// Tenant used when neither storage nor hostname resolves one.
    pub default_code: Option<String>,
}

impl Default for TenantResolverConfig {
    fn default() -> Self {
        Self {
            base_domains: Vec::new(),
            reserved_labels: vec!["www".to_owned(), "api".to_owned()],
            ephemeral_suffixes: vec![".pages.dev".to_owned(), ".trycloudflare.com".to_owned()],
            default_code: None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: TenantResolverConfig =
            serde_json::from_str(r#"{"base_domains": ["basedomain.com"]}"#).unwrap();
        assert_eq!(config.base_domains, vec!["basedomain.com"]);
        assert_eq!(config.reserved_labels, vec!["www", "api"]);
        assert!(config.default_code.is_none());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = serde_json::from_str::<TenantResolverConfig>(r#"{"base_domain": "x"}"#);
        assert!(result.is_err());
    }
}
