use super::settings::{HostConfig, LoggingConfig, ResourceConfig, SamplerConfig, ServerConfig};

// ---------------------------------------------------------------------------
// Top-level struct defaults
// ---------------------------------------------------------------------------

pub fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind: default_bind(),
        keepalive: default_keepalive(),
        validate_forwarded_for: false,
    }
}

pub fn default_host_config() -> HostConfig {
    HostConfig::default()
}

pub fn default_resource_config() -> ResourceConfig {
    ResourceConfig {
        cpu_target: 0.0,
        memory_target: 0.0,
    }
}

pub fn default_sampler_config() -> SamplerConfig {
    SamplerConfig {
        enabled: default_sampler_enabled(),
        interval_secs: default_sampler_interval_secs(),
    }
}

pub fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file: String::new(),
        access_log: String::new(),
    }
}

// ---------------------------------------------------------------------------
// ServerConfig field defaults
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "0.0.0.0:9000".to_string()
}

pub fn default_keepalive() -> bool {
    true
}

// ---------------------------------------------------------------------------
// SamplerConfig field defaults
// ---------------------------------------------------------------------------

pub fn default_sampler_enabled() -> bool { true }
pub fn default_sampler_interval_secs() -> u64 { 1 }

// ---------------------------------------------------------------------------
// LoggingConfig field defaults
// ---------------------------------------------------------------------------

pub fn default_log_level() -> String {
    "info".to_string()
}

/// Default config location, used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/reqhandle/reqhandle.toml";
