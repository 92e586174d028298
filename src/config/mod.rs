//! Runtime configuration.
//!
//! Loaded from a TOML file (default: the platform config dir, see
//! [`default_config_path`]). Every key has a default, so an absent file is
//! equivalent to an empty one. The API key is the only secret and is never
//! serialized or printed; `AGENTBAY_API_KEY` overrides the file value.

use crate::session::EnvironmentType;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that supplies the API key.
pub const API_KEY_ENV: &str = "AGENTBAY_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    pub agentbay: AgentBayConfig,
    pub dispatch: DispatchConfig,
}

/// Connection settings for the remote sandbox service.
///
/// Immutable once handed to [`crate::sandbox::agentbay::AgentBayClient::new`].
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AgentBayConfig {
    /// API key. Prefer the `AGENTBAY_API_KEY` environment variable.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Transport-level timeout for a single HTTP request. Requests that carry
    /// their own `timeout_ms` (commands, browser waits) are bounded by that
    /// instead.
    pub request_timeout_secs: u64,
    /// Label attached to every session created by this process.
    pub session_label: String,
}

impl Default for AgentBayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://agentbay.aliyuncs.com".to_string(),
            request_timeout_secs: 120,
            session_label: "agentbay_tools".to_string(),
        }
    }
}

impl fmt::Debug for AgentBayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentBayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("session_label", &self.session_label)
            .finish()
    }
}

impl AgentBayConfig {
    /// The configured API key, or an error when none (or an empty one) is set.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => anyhow::bail!("{API_KEY_ENV} is not set"),
        }
    }
}

/// Tool dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DispatchConfig {
    /// Bound applied to remote calls that carry no explicit timeout.
    pub default_timeout_ms: u64,
    /// Extra time granted on top of an explicit `timeout_ms` before the
    /// dispatcher gives up waiting.
    pub timeout_grace_ms: u64,
    /// Environment used by `session_create` when none is given.
    pub default_environment: EnvironmentType,
    /// Adopt remote sessions carrying our label at startup.
    pub reconcile_on_startup: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            timeout_grace_ms: 5_000,
            default_environment: EnvironmentType::Linux,
            reconcile_on_startup: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. An explicit path must exist; a missing default file
    /// yields the defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(raw) => {
                let expanded = shellexpand::full(raw)
                    .with_context(|| format!("Failed to expand config path {raw}"))?;
                Self::from_file(Path::new(expanded.as_ref()))?
            }
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        Ok(config.with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML, warning about (and otherwise ignoring) unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)?;
        let mut unknown = Vec::new();
        let config: Config = serde_ignored::deserialize(toml::Value::Table(table), |path| {
            unknown.push(path.to_string());
        })?;
        for key in unknown {
            tracing::warn!("Ignoring unknown config key: {key}");
        }
        anyhow::ensure!(
            config.dispatch.default_timeout_ms > 0,
            "dispatch.default_timeout_ms must be greater than 0"
        );
        Ok(config)
    }

    /// Replace the file's API key with `key` when it is non-empty.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.agentbay.api_key = Some(key);
        }
        self
    }

    /// JSON Schema of the configuration file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}

/// `<platform config dir>/agentbay-tools/config.toml`, when a home directory
/// can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "agentbay", "agentbay-tools")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
