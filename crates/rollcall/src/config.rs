//! Configuration loading.
//!
//! One TOML file covers the issuer connection and the timing knobs of the
//! live screens. Every section and field is optional; missing values fall
//! back to the same defaults the crates use on their own.
//!
//! ```toml
//! [api]
//! base_url = "https://school.example/api"
//! token = "eyJ..."
//!
//! [live]
//! poll_interval_secs = 5
//! clear_after_failures = 3
//! sample_period_ms = 900
//! request_timeout_secs = 10
//!
//! [registry]
//! max_duration_minutes = 240
//! ```
//!
//! `ROLLCALL_API_URL` and `ROLLCALL_TOKEN` override the `[api]` values
//! (see [`RollcallConfig::with_env_overrides`]).

use std::path::Path;
use std::time::Duration;

use rollcall_live::LiveConfig;
use rollcall_protocol::Credential;
use rollcall_registry::RegistryConfig;
use serde::{Deserialize, Serialize};

pub const ENV_API_URL: &str = "ROLLCALL_API_URL";
pub const ENV_TOKEN: &str = "ROLLCALL_TOKEN";

/// Errors from loading or using configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value needed for the requested operation is not set.
    #[error("missing config value: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RollcallConfig {
    pub api: ApiSection,
    pub live: LiveSection,
    pub registry: RegistrySection,
}

/// Where the issuer lives and who we are to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Timing for the presenter and capture loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSection {
    pub poll_interval_secs: u64,
    pub poll_jitter_ms: u64,
    pub countdown_interval_ms: u64,
    pub clear_after_failures: u32,
    pub sample_period_ms: u64,
    /// Upper bound on a single issuer call, also applied to the HTTP client.
    pub request_timeout_secs: u64,
}

impl Default for LiveSection {
    fn default() -> Self {
        let live = LiveConfig::default();
        Self {
            poll_interval_secs: live.poll_interval.as_secs(),
            poll_jitter_ms: live.poll_jitter.as_millis() as u64,
            countdown_interval_ms: live.countdown_interval.as_millis() as u64,
            clear_after_failures: live.clear_after_failures,
            sample_period_ms: live.sample_period.as_millis() as u64,
            request_timeout_secs: live.request_timeout.as_secs(),
        }
    }
}

/// Session length bounds for the in-memory issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub min_duration_minutes: u32,
    pub max_duration_minutes: u32,
    pub default_duration_minutes: u32,
}

impl Default for RegistrySection {
    fn default() -> Self {
        let registry = RegistryConfig::default();
        Self {
            min_duration_minutes: registry.min_duration_minutes,
            max_duration_minutes: registry.max_duration_minutes,
            default_duration_minutes: registry.default_duration_minutes,
        }
    }
}

impl RollcallConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `ROLLCALL_API_URL` / `ROLLCALL_TOKEN` from the process
    /// environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key-value source. Empty values are
    /// ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            tracing::debug!(var = ENV_API_URL, "api.base_url overridden from environment");
            self.api.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            tracing::debug!(var = ENV_TOKEN, "api.token overridden from environment");
            self.api.token = Some(token);
        }
        self
    }

    /// The issuer's base URL, checked to be an `http(s)` URL.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        let url = self
            .api
            .base_url
            .as_deref()
            .ok_or(ConfigError::Missing("api.base_url"))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "api.base_url",
                reason: format!("{url:?} is not an http(s) URL"),
            });
        }
        Ok(url)
    }

    /// The bearer credential for issuer calls.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        self.api
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or(ConfigError::Missing("api.token"))
    }

    /// An HTTP client for the configured issuer, speaking JSON. Requests
    /// are cut off after the clamped `live.request_timeout_secs`.
    #[cfg(feature = "http")]
    pub fn http_api(
        &self,
    ) -> Result<rollcall_client::HttpApi<rollcall_protocol::JsonCodec>, ConfigError> {
        rollcall_client::HttpApi::with_timeout(
            self.base_url()?,
            rollcall_protocol::JsonCodec,
            self.live_config().request_timeout,
        )
        .map_err(|e| ConfigError::Invalid {
            field: "api",
            reason: e.to_string(),
        })
    }

    /// Live-screen configuration, clamped into supported ranges.
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            poll_interval: Duration::from_secs(self.live.poll_interval_secs),
            poll_jitter: Duration::from_millis(self.live.poll_jitter_ms),
            countdown_interval: Duration::from_millis(self.live.countdown_interval_ms),
            clear_after_failures: self.live.clear_after_failures,
            sample_period: Duration::from_millis(self.live.sample_period_ms),
            request_timeout: Duration::from_secs(self.live.request_timeout_secs),
            ..LiveConfig::default()
        }
        .validated()
    }

    /// Registry configuration, with inconsistent bounds repaired.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            min_duration_minutes: self.registry.min_duration_minutes,
            max_duration_minutes: self.registry.max_duration_minutes,
            default_duration_minutes: self.registry.default_duration_minutes,
        }
        .validated()
    }
}
