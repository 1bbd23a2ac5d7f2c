use std::path::{Path, PathBuf};
use std::time::Duration;

use academy_api::ApiConfig;
use academy_http::{HttpClient, HttpClientBuilder, TransportSecurity};
use academy_playback::PlaybackTimers;
use academy_storage::{DEFAULT_STORAGE_FILE, expand_tilde};
use academy_tenant::TenantResolverConfig;
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides; `__` separates nested keys,
/// e.g. `ACADEMY__API__BASE_URL`.
pub const ENV_PREFIX: &str = "ACADEMY__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub http: HttpSection,
    pub tenant: TenantResolverConfig,
    pub storage: StorageSection,
    pub playback: PlaybackSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    #[serde(with = "crate::duration")]
    pub request_timeout: Duration,
    pub max_body_size: usize,
    /// Permit plain `http://` backends (local development only).
    pub allow_insecure_http: bool,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            allow_insecure_http: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Directory holding the session file; `~` is expanded.
    pub home_dir: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            home_dir: "~/.academy".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackSection {
    #[serde(with = "crate::duration")]
    pub heartbeat_interval: Duration,
    #[serde(with = "crate::duration")]
    pub flush_interval: Duration,
}

impl Default for PlaybackSection {
    fn default() -> Self {
        let timers = PlaybackTimers::default();
        Self {
            heartbeat_interval: timers.heartbeat,
            flush_interval: timers.flush,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive used when neither `RUST_LOG` nor `-v` is given.
    pub level: Option<String>,
    pub format: LogFormat,
}

/// Flags that override the layered configuration.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub host: Option<String>,
    pub home_dir: Option<String>,
}

impl AppConfig {
    /// Defaults, then the YAML file (when given), then `ACADEMY__*`
    /// environment variables.
    ///
    /// # Errors
    /// Fails when an explicit file is missing or any layer does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file_exact(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment
            .extract()
            .context("failed to load configuration")
    }

    pub fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.api.base_url = base_url;
        }
        if let Some(host) = overrides.host {
            self.api.host = Some(host);
        }
        if let Some(home_dir) = overrides.home_dir {
            self.storage.home_dir = home_dir;
        }
    }

    /// # Errors
    /// Fails if the configuration cannot be rendered as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to render configuration")
    }

    #[must_use]
    pub fn storage_file(&self) -> PathBuf {
        expand_tilde(&self.storage.home_dir).join(DEFAULT_STORAGE_FILE)
    }

    #[must_use]
    pub fn playback_timers(&self) -> PlaybackTimers {
        PlaybackTimers {
            heartbeat: self.playback.heartbeat_interval,
            flush: self.playback.flush_interval,
        }
    }

    /// # Errors
    /// Fails if the TLS stack cannot be initialised.
    pub fn http_client(&self) -> Result<HttpClient> {
        let mut builder = HttpClientBuilder::new()
            .timeout(self.http.request_timeout)
            .max_body_size(self.http.max_body_size)
            .client_identity(self.api.identity());
        if self.http.allow_insecure_http {
            tracing::warn!("plain HTTP enabled by configuration");
            builder = builder.transport(TransportSecurity::AllowInsecureHttp);
        }
        builder.build().context("failed to build HTTP client")
    }
}
