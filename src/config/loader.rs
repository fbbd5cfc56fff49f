//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment variables.

use std::net::SocketAddr;
use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Listen address for both UDP and TCP
pub const ENV_LISTEN_ADDR: &str = "BLACKHOLE_DNS_LISTEN_ADDR";
/// Log level or filter directive
pub const ENV_LOG_LEVEL: &str = "BLACKHOLE_DNS_LOG_LEVEL";
/// Rate limit threshold
pub const ENV_RATE_LIMIT: &str = "BLACKHOLE_DNS_RATE_LIMIT";
/// Rate limit window in seconds
pub const ENV_RATE_WINDOW: &str = "BLACKHOLE_DNS_RATE_WINDOW";

/// Load configuration from a JSON file
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    config.validate()?;

    info!(
        "Configuration loaded: {} zones, rate limit {} per {}s",
        config.dns.zones.zones.len(),
        config.dns.rate_limit.limit,
        config.dns.rate_limit.window_secs
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `BLACKHOLE_DNS_LISTEN_ADDR`: Override UDP and TCP listen address
/// - `BLACKHOLE_DNS_LOG_LEVEL`: Override log level
/// - `BLACKHOLE_DNS_RATE_LIMIT`: Override rate limit threshold
/// - `BLACKHOLE_DNS_RATE_WINDOW`: Override rate limit window (seconds)
///
/// # Errors
///
/// Returns `ConfigError` if loading, parsing or an override fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config = load_config(path)?;
    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Default configuration with environment variable overrides applied
///
/// # Errors
///
/// Returns `ConfigError` if an override is invalid.
pub fn load_default_with_env() -> Result<Config, ConfigError> {
    apply_env_overrides(Config::default_config(), |name| std::env::var(name).ok())
}

/// Apply overrides from `lookup` and re-validate
///
/// `lookup` maps a variable name to its value; the process environment
/// is the usual source.
///
/// # Errors
///
/// Returns `ConfigError::EnvError` for an unparsable value, or
/// `ConfigError::ValidationError` if the result is invalid.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
        let addr: SocketAddr = addr.parse().map_err(|_| ConfigError::EnvError {
            name: ENV_LISTEN_ADDR.into(),
            reason: format!("Invalid socket address: {addr}"),
        })?;
        config.dns.listen_udp = addr;
        config.dns.listen_tcp = addr;
        debug!("Listen address overridden to {}", addr);
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Some(limit) = lookup(ENV_RATE_LIMIT) {
        config.dns.rate_limit.limit = limit.parse().map_err(|_| ConfigError::EnvError {
            name: ENV_RATE_LIMIT.into(),
            reason: format!("Invalid number: {limit}"),
        })?;
        debug!("Rate limit overridden to {}", config.dns.rate_limit.limit);
    }

    if let Some(window) = lookup(ENV_RATE_WINDOW) {
        config.dns.rate_limit.window_secs =
            window.parse().map_err(|_| ConfigError::EnvError {
                name: ENV_RATE_WINDOW.into(),
                reason: format!("Invalid number of seconds: {window}"),
            })?;
        debug!(
            "Rate limit window overridden to {}s",
            config.dns.rate_limit.window_secs
        );
    }

    config.validate()?;

    Ok(config)
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}
