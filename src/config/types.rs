//! Configuration types for blackhole-dns

use serde::{Deserialize, Serialize};

use crate::dns::DnsConfig;
use crate::error::ConfigError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Listeners, rate limiter and zones
    #[serde(default)]
    pub dns: DnsConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log.validate()?;
        self.dns.validate()?;
        Ok(())
    }

    /// Create a default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            log: LogConfig::default(),
            dns: DnsConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl LogConfig {
    /// Validate the log configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unknown format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown log format '{other}', expected \"json\" or \"text\""
            ))),
        }
    }

    /// Whether log lines are emitted as JSON
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            timestamps: true,
            target: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "json".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.log.level, "info");
        assert!(config.log.is_json());
        assert!(config.dns.rate_limit.enabled);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.dns.listen_udp.port(), 8053);
        assert_eq!(config.dns.rate_limit.limit, 50);
        assert_eq!(config.dns.rate_limit.window_secs, 5);
        assert_eq!(config.dns.zones.zones.len(), 19);
    }

    #[test]
    fn test_log_format_validation() {
        let mut config = Config::default_config();
        config.log.format = "text".into();
        assert!(config.validate().is_ok());
        assert!(!config.log.is_json());

        config.log.format = "xml".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_dns_validation_surfaces() {
        let mut config = Config::default_config();
        config.dns.rate_limit.limit = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_partial_rate_limit_section() {
        let json = r#"{
            "dns": { "rate_limit": { "limit": 10, "window_secs": 16 } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.dns.rate_limit.limit, 10);
        assert_eq!(config.dns.rate_limit.window_secs, 16);
        assert_eq!(config.dns.rate_limit.table_size, 10_000);
        assert!(config.dns.tcp_enabled);
    }
}
