//! Blackhole DNS responder
//!
//! Answers every query under the AS112 reverse zones with an
//! authoritative empty reply, and protects itself from abusive clients
//! with a per-client decayed rate limiter.
//!
//! # Architecture
//!
//! ```text
//! UDP / TCP listeners (server)
//!     │
//!     ▼
//! ┌─────────────────┐
//! │  DnsHandler     │ ─── malformed ──▶ FORMERR
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐   blocked()    ┌──────────────┐
//! │  RateLimiter    │ ◀───────────── │ BucketTable  │
//! └────────┬────────┘                └──────▲───────┘
//!          │ allow                          │ single writer
//!          ▼                                │
//! ┌─────────────────┐   count()      ┌──────┴───────┐
//! │  ZoneTable      │ ─────────────▶ │ UpdateActor  │
//! └─────────────────┘                └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`ratelimit`]: bucket table, decay estimator, update actor, decisions
//! - [`zone`]: served zones and their SOA replies
//! - [`server`]: handler plus UDP and TCP listeners
//! - [`config`]: serde configuration with validation
//! - [`error`]: [`DnsError`] and [`DnsResult`]

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod server;
pub mod zone;

pub use config::{
    DnsConfig, OverflowPolicy, RateLimitAction, RateLimitConfig, SoaConfig, TcpServerConfig,
    ZoneConfig, MAX_WINDOW_SECS,
};
pub use error::{DnsError, DnsResult};
pub use ratelimit::{Decision, RateLimiter, RateLimiterStatsSnapshot};
pub use zone::{Zone, ZoneTable};
