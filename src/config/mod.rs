//! Configuration module for blackhole-dns
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use blackhole_dns::config::{load_config, Config};
//!
//! let config = load_config("/etc/blackhole-dns/config.json").unwrap();
//! println!("Rate limit: {}", config.dns.rate_limit.limit);
//! ```

mod loader;
mod types;

pub use loader::{
    apply_env_overrides, create_default_config, load_config, load_config_str,
    load_config_with_env, load_default_with_env, ENV_LISTEN_ADDR, ENV_LOG_LEVEL, ENV_RATE_LIMIT,
    ENV_RATE_WINDOW,
};
pub use types::{Config, LogConfig};
