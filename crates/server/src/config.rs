use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Top-level configuration, loaded from a TOML file and overridden by
/// environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct SirenConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default)]
    pub resolver: ResolverSection,
}

/// HTTP bind and payload-limit configuration.
///
/// Environment overrides: `PORT`, `WEBHOOK_MAX_PAYLOAD_SIZE`,
/// `ADMIN_MAX_PAYLOAD_SIZE`, `GRPC_MAX_MESSAGE_SIZE`. Invalid integer
/// values fall back to the configured default silently.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Body limit for alert ingestion endpoints, in bytes.
    #[serde(default = "default_webhook_limit")]
    pub webhook_max_payload_size: usize,
    /// Body limit for admin/CRUD endpoints, in bytes.
    #[serde(default = "default_admin_limit")]
    pub admin_max_payload_size: usize,
    /// Message-size budget handed to a gRPC front when one is deployed
    /// ahead of this server.
    #[serde(default = "default_grpc_limit")]
    pub grpc_max_message_size: usize,
}

const fn default_port() -> u16 {
    8080
}
const fn default_webhook_limit() -> usize {
    1 << 20
}
const fn default_admin_limit() -> usize {
    100 * 1024
}
const fn default_grpc_limit() -> usize {
    4 << 20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            webhook_max_payload_size: default_webhook_limit(),
            admin_max_payload_size: default_admin_limit(),
            grpc_max_message_size: default_grpc_limit(),
        }
    }
}

/// `[executor]` section mirroring
/// [`ExecutorConfig`](siren_routing::ExecutorConfig).
#[derive(Debug, Deserialize)]
pub struct ExecutorSection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

const fn default_max_retries() -> u32 {
    3
}
const fn default_retry_delay_ms() -> u64 {
    250
}
const fn default_true() -> bool {
    true
}
const fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            continue_on_error: default_true(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ExecutorSection {
    /// Convert to the routing crate's executor configuration.
    #[must_use]
    pub fn to_executor_config(&self) -> siren_routing::ExecutorConfig {
        siren_routing::ExecutorConfig {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            continue_on_error: self.continue_on_error,
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

/// `[resolver]` section mirroring
/// [`ResolverConfig`](siren_resolver::ResolverConfig).
#[derive(Debug, Deserialize)]
pub struct ResolverSection {
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

const fn default_cache_ttl_seconds() -> u64 {
    5 * 60
}
const fn default_sweep_interval_seconds() -> u64 {
    60
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl ResolverSection {
    /// Convert to the resolver crate's configuration.
    #[must_use]
    pub fn to_resolver_config(&self) -> siren_resolver::ResolverConfig {
        siren_resolver::ResolverConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_seconds),
            sweep_interval: Duration::from_secs(self.sweep_interval_seconds),
        }
    }
}

impl SirenConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
                toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(port) = env_parsed("PORT") {
            self.server.port = port;
        }
        if let Some(limit) = env_parsed("WEBHOOK_MAX_PAYLOAD_SIZE") {
            self.server.webhook_max_payload_size = limit;
        }
        if let Some(limit) = env_parsed("ADMIN_MAX_PAYLOAD_SIZE") {
            self.server.admin_max_payload_size = limit;
        }
        if let Some(limit) = env_parsed("GRPC_MAX_MESSAGE_SIZE") {
            self.server.grpc_max_message_size = limit;
        }
    }
}

/// Parse an environment variable, falling back silently (with a log
/// line) on invalid values.
fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    parse_override(name, &raw)
}

fn parse_override<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {0}: {1}")]
    Read(String, std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(String),
}
