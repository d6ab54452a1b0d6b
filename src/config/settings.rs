use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::defaults;

/// Top-level configuration for the request inspection service.
/// Deserializes from a TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "defaults::default_server_config")]
    pub server: ServerConfig,

    #[serde(default = "defaults::default_host_config")]
    pub host: HostConfig,

    #[serde(default = "defaults::default_resource_config")]
    pub resource: ResourceConfig,

    #[serde(default = "defaults::default_sampler_config")]
    pub sampler: SamplerConfig,

    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Like [`Settings::load`], but a missing file yields the built-in defaults.
    /// Used for the default config location only; an explicit `--config`
    /// path must exist.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: defaults::default_server_config(),
            host: defaults::default_host_config(),
            resource: defaults::default_resource_config(),
            sampler: defaults::default_sampler_config(),
            logging: defaults::default_logging_config(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::default_bind")]
    pub bind: String,

    #[serde(default = "defaults::default_keepalive")]
    pub keepalive: bool,

    /// Drop X-Forwarded-For segments that are not IP literals.
    #[serde(default)]
    pub validate_forwarded_for: bool,
}

/// Overrides for the discovered host identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub availability_zone: Option<String>,
}

/// Initial resource targets written to the registry at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub cpu_target: f64,

    #[serde(default)]
    pub memory_target: f64,
}

/// Background CPU / memory sampler.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "defaults::default_sampler_enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::default_sampler_interval_secs")]
    pub interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    pub level: String,

    /// Empty disables file output.
    #[serde(default)]
    pub file: String,

    /// Empty disables the access log.
    #[serde(default)]
    pub access_log: String,
}
