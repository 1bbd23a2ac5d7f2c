//! Static tenant registry.
//!
//! Tenants are compiled into the client; adding one means a new release.

use serde::Serialize;

/// Login route used when a tenant has no dedicated page.
pub const DEFAULT_LOGIN_PATH: &str = "/login/hakwonplus";

/// Presentation fields shown on a tenant's login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantBranding {
    pub login_title: &'static str,
    pub login_subtitle: Option<&'static str>,
    pub logo_url: Option<&'static str>,
}

/// One academy customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    pub id: u32,
    /// Backend tenant code sent in `X-Tenant-Code`
    pub code: &'static str,
    pub name: &'static str,
    /// Lowercase hostnames served for this tenant
    pub hostnames: &'static [&'static str],
    pub login_path: &'static str,
    pub branding: TenantBranding,
    pub dedicated_login_page: bool,
}

const BUILTIN: &[Tenant] = &[
    Tenant {
        id: 1,
        code: "hakwonplus",
        name: "HakwonPlus",
        hostnames: &["hakwonplus.com", "www.hakwonplus.com"],
        login_path: "/login/hakwonplus",
        branding: TenantBranding {
            login_title: "HakwonPlus admin login",
            login_subtitle: None,
            logo_url: None,
        },
        dedicated_login_page: false,
    },
    Tenant {
        id: 2,
        code: "tchul",
        name: "tchul.com",
        hostnames: &["tchul.com", "www.tchul.com"],
        login_path: "/login/tchul",
        branding: TenantBranding {
            login_title: "tchul.com login",
            login_subtitle: None,
            logo_url: None,
        },
        dedicated_login_page: true,
    },
    Tenant {
        id: 3,
        code: "limglish",
        name: "limglish",
        hostnames: &["limglish.kr", "www.limglish.kr"],
        login_path: "/login/limglish",
        branding: TenantBranding {
            login_title: "limglish login",
            login_subtitle: None,
            logo_url: None,
        },
        dedicated_login_page: false,
    },
    Tenant {
        id: 4,
        code: "ymath",
        name: "ymath",
        hostnames: &["ymath.co.kr", "www.ymath.co.kr"],
        login_path: "/login/ymath",
        branding: TenantBranding {
            login_title: "ymath login",
            login_subtitle: None,
            logo_url: None,
        },
        dedicated_login_page: false,
    },
    Tenant {
        id: 9999,
        code: "9999",
        name: "Local development",
        hostnames: &["localhost", "127.0.0.1"],
        login_path: DEFAULT_LOGIN_PATH,
        branding: TenantBranding {
            login_title: "Local development (9999)",
            login_subtitle: None,
            logo_url: None,
        },
        dedicated_login_page: false,
    },
];

/// Read-only set of known tenants.
#[derive(Debug, Clone, Copy)]
pub struct TenantRegistry {
    tenants: &'static [Tenant],
}

impl TenantRegistry {
    /// The tenants shipped with this build.
    #[must_use]
    pub fn builtin() -> Self {
        Self { tenants: BUILTIN }
    }

    /// A registry over an arbitrary static table.
    #[must_use]
    pub fn from_static(tenants: &'static [Tenant]) -> Self {
        Self { tenants }
    }

    #[must_use]
    pub fn all(&self) -> &'static [Tenant] {
        self.tenants
    }

    #[must_use]
    pub fn by_id(&self, id: u32) -> Option<&'static Tenant> {
        self.tenants.iter().find(|t| t.id == id)
    }

    /// Case-insensitive lookup by tenant code.
    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<&'static Tenant> {
        let code = code.trim();
        self.tenants
            .iter()
            .find(|t| t.code.eq_ignore_ascii_case(code))
    }

    /// Exact lookup by hostname (case-insensitive, port ignored).
    #[must_use]
    pub fn by_hostname(&self, host: &str) -> Option<&'static Tenant> {
        let host = crate::resolver::normalize_host(host);
        if host.is_empty() {
            return None;
        }
        self.tenants
            .iter()
            .find(|t| t.hostnames.iter().any(|h| h.eq_ignore_ascii_case(&host)))
    }

    /// Tenant id for a hostname or a tenant code; hostnames win.
    #[must_use]
    pub fn id_for(&self, host_or_code: &str) -> Option<u32> {
        self.by_hostname(host_or_code)
            .or_else(|| self.by_code(host_or_code))
            .map(|t| t.id)
    }

    #[must_use]
    pub fn branding(&self, id: u32) -> Option<&'static TenantBranding> {
        self.by_id(id).map(|t| &t.branding)
    }

    /// Login route for a tenant, [`DEFAULT_LOGIN_PATH`] for unknown ids.
    #[must_use]
    pub fn login_path(&self, id: u32) -> &'static str {
        self.by_id(id).map_or(DEFAULT_LOGIN_PATH, |t| t.login_path)
    }

    /// Ids of tenants that ship their own login page.
    #[must_use]
    pub fn dedicated_login_ids(&self) -> Vec<u32> {
        self.tenants
            .iter()
            .filter(|t| t.dedicated_login_page)
            .map(|t| t.id)
            .collect()
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
