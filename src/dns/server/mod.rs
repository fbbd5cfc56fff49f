//! DNS listeners
//!
//! UDP and TCP transports in front of a shared [`DnsHandler`].
//!
//! # Architecture
//!
//! ```text
//! Client Query (UDP/TCP)
//!     |
//!     v
//! +-------------------+
//! |  DnsHandler       | -- Parse & Validate --> FORMERR
//! +-------------------+
//!     |
//!     v
//! +-------------------+
//! |  RateLimiter      | -- Block / Throttle --> silence or REFUSED
//! +-------------------+
//!     |
//!     v
//! +-------------------+
//! |  ZoneTable        | -- outside zones --> SERVFAIL
//! +-------------------+
//!     |
//!     v
//! Authoritative NOERROR + SOA
//! ```
//!
//! # Components
//!
//! - [`udp`]: UDP DNS listener
//! - [`tcp`]: TCP DNS listener with connection limits
//! - [`handler`]: Query processing
//!
//! # Example
//!
//! ```no_run
//! use blackhole_dns::dns::ratelimit::RateLimiter;
//! use blackhole_dns::dns::server::{DnsHandler, UdpDnsServer};
//! use blackhole_dns::dns::{DnsConfig, ZoneTable};
//! use std::sync::Arc;
//! use tokio::sync::oneshot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DnsConfig::default();
//! let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
//! let zones = Arc::new(ZoneTable::from_config(&config.zones)?);
//! let handler = Arc::new(DnsHandler::new(rate_limiter, zones));
//!
//! let server = UdpDnsServer::bind(config.listen_udp, Arc::clone(&handler)).await?;
//! let (_stop, stop_rx) = oneshot::channel();
//! server.run_until_shutdown(stop_rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod tcp;
pub mod udp;

pub use handler::{
    DnsHandler, HandlerStats, HandlerStatsSnapshot, QueryContext, MAX_UDP_RESPONSE_SIZE_NO_EDNS,
};
pub use tcp::{
    ConnectionSlot, TcpConnectionTracker, TcpDnsServer, TcpServerStats, TcpServerStatsSnapshot,
};
pub use udp::{UdpDnsServer, UdpServerStats, UdpServerStatsSnapshot};
