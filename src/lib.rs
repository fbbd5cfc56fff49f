//! blackhole-dns: AS112-style blackhole DNS responder
//!
//! Answers reverse lookups for private and link-local address space with
//! authoritative empty replies, so those queries stop leaking to the
//! public DNS. Every client address is tracked by a decayed rate
//! estimator and abusive clients are silenced or refused.
//!
//! # Features
//!
//! - **Blackhole zones**: NOERROR + SOA for the 19 AS112 reverse zones
//! - **Decayed rate limiting**: fixed-size bucket table, halving per idle second
//! - **Single writer**: table updates are serialized through a bounded queue
//! - **UDP and TCP**: EDNS-aware truncation, per-IP TCP connection limits
//!
//! # Architecture
//!
//! ```text
//! Client → UDP/TCP listener → DnsHandler → RateLimiter::blocked
//!                                 │               │ allow
//!                                 │               ▼
//!                                 │          ZoneTable::answer
//!                                 ▼               │
//!                          UpdateActor ◀── RateLimiter::count
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use blackhole_dns::config::load_config;
//! use blackhole_dns::dns::server::{DnsHandler, UdpDnsServer};
//! use blackhole_dns::dns::{RateLimiter, ZoneTable};
//! use tokio::sync::oneshot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("/etc/blackhole-dns/config.json")?;
//!
//! let rate_limiter = Arc::new(RateLimiter::new(&config.dns.rate_limit));
//! let zones = Arc::new(ZoneTable::from_config(&config.dns.zones)?);
//! let handler = Arc::new(DnsHandler::new(rate_limiter, zones));
//!
//! let server = UdpDnsServer::bind(config.dns.listen_udp, handler).await?;
//! let (_stop, stop_rx) = oneshot::channel();
//! server.run_until_shutdown(stop_rx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration types and loading
//! - [`dns`]: Zones, rate limiter and listeners
//! - [`error`]: Error types

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod dns;
pub mod error;

// Re-export commonly used types at the crate root
pub use config::{Config, LogConfig};
pub use dns::{DnsConfig, DnsError, DnsResult, RateLimiter, ZoneTable};
pub use error::{BlackholeError, ConfigError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
