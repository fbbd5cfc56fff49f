//! DNS responder configuration types
//!
//! # Configuration Structure
//!
//! ```text
//! DnsConfig
//! ├── listen_udp: SocketAddr
//! ├── listen_tcp: SocketAddr
//! ├── tcp_enabled: bool
//! ├── tcp: TcpServerConfig
//! ├── rate_limit: RateLimitConfig
//! └── zones: ZoneConfig
//!     └── soa: SoaConfig
//! ```
//!
//! # Example
//!
//! ```
//! use blackhole_dns::dns::DnsConfig;
//!
//! let config = DnsConfig::default();
//! assert_eq!(config.listen_udp.port(), 8053);
//! assert_eq!(config.rate_limit.limit, 50);
//! assert_eq!(config.rate_limit.window_secs, 5);
//! assert!(config.validate().is_ok());
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use hickory_proto::rr::Name;
use serde::{Deserialize, Serialize};

use super::error::{DnsError, DnsResult};

/// Largest accepted decay window
///
/// The estimator halves the rate once per elapsed second, so a window
/// much beyond 32 seconds only ever decays to zero; the cap exists to
/// keep configuration errors obvious.
pub const MAX_WINDOW_SECS: u64 = 300;

// ============================================================================
// Main DNS Configuration
// ============================================================================

/// Main DNS responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// UDP listen address
    ///
    /// Default: `0.0.0.0:8053`
    #[serde(default = "default_listen_udp")]
    pub listen_udp: SocketAddr,

    /// TCP listen address
    ///
    /// Default: `0.0.0.0:8053`
    #[serde(default = "default_listen_tcp")]
    pub listen_tcp: SocketAddr,

    /// Whether to serve DNS over TCP as well as UDP
    #[serde(default = "default_tcp_enabled")]
    pub tcp_enabled: bool,

    /// TCP server configuration (security settings)
    #[serde(default)]
    pub tcp: TcpServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Blackhole zones and their SOA record
    #[serde(default)]
    pub zones: ZoneConfig,
}

/// Default listen port (unprivileged)
pub const DEFAULT_PORT: u16 = 8053;

fn default_listen_udp() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn default_listen_tcp() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn default_tcp_enabled() -> bool {
    true
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen_udp: default_listen_udp(),
            listen_tcp: default_listen_tcp(),
            tcp_enabled: default_tcp_enabled(),
            tcp: TcpServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            zones: ZoneConfig::default(),
        }
    }
}

impl DnsConfig {
    /// Create a new DNS configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen on the same address for UDP and TCP
    #[must_use]
    pub fn with_listen(mut self, addr: SocketAddr) -> Self {
        self.listen_udp = addr;
        self.listen_tcp = addr;
        self
    }

    /// Change only the port of both listen addresses
    ///
    /// # Example
    ///
    /// ```
    /// use blackhole_dns::dns::DnsConfig;
    ///
    /// let config = DnsConfig::new().with_port(53);
    /// assert_eq!(config.listen_udp.port(), 53);
    /// assert_eq!(config.listen_tcp.port(), 53);
    /// ```
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.listen_udp.set_port(port);
        self.listen_tcp.set_port(port);
        self
    }

    /// Set the rate limiting configuration
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the zone configuration
    #[must_use]
    pub fn with_zones(mut self, zones: ZoneConfig) -> Self {
        self.zones = zones;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` naming the first invalid field.
    pub fn validate(&self) -> DnsResult<()> {
        self.tcp.validate()?;
        self.rate_limit.validate()?;
        self.zones.validate()?;
        Ok(())
    }
}

// ============================================================================
// TCP Server Configuration
// ============================================================================

/// TCP server security configuration
///
/// # Example
///
/// ```
/// use blackhole_dns::dns::TcpServerConfig;
///
/// let tcp = TcpServerConfig::default();
/// assert_eq!(tcp.max_connections, 1000);
/// assert_eq!(tcp.per_ip_max_connections, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpServerConfig {
    /// Maximum total concurrent TCP connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Maximum concurrent connections per client IP
    #[serde(default = "default_per_ip_max")]
    pub per_ip_max_connections: usize,

    /// Per-query processing and write timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Close the connection after this many idle seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Maximum accepted DNS message size
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_max_connections() -> usize {
    1000
}

fn default_per_ip_max() -> usize {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    65535
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            per_ip_max_connections: default_per_ip_max(),
            connection_timeout_secs: default_connection_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl TcpServerConfig {
    /// Set connection limits
    #[must_use]
    pub fn with_limits(mut self, max_connections: usize, per_ip: usize) -> Self {
        self.max_connections = max_connections;
        self.per_ip_max_connections = per_ip;
        self
    }

    /// Set the idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Validate the TCP server configuration
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` if:
    /// - `max_connections` or `per_ip_max_connections` is zero
    /// - `per_ip_max_connections` exceeds `max_connections`
    /// - either timeout is zero
    /// - `max_message_size` is less than 512 bytes
    pub fn validate(&self) -> DnsResult<()> {
        if self.max_connections == 0 {
            return Err(DnsError::config_field(
                "max_connections must be positive",
                "tcp.max_connections",
            ));
        }

        if self.per_ip_max_connections == 0 {
            return Err(DnsError::config_field(
                "per_ip_max_connections must be positive",
                "tcp.per_ip_max_connections",
            ));
        }

        if self.per_ip_max_connections > self.max_connections {
            return Err(DnsError::config_field(
                format!(
                    "per_ip_max_connections ({}) cannot exceed max_connections ({})",
                    self.per_ip_max_connections, self.max_connections
                ),
                "tcp",
            ));
        }

        if self.connection_timeout_secs == 0 {
            return Err(DnsError::config_field(
                "connection_timeout must be positive",
                "tcp.connection_timeout_secs",
            ));
        }

        if self.idle_timeout_secs == 0 {
            return Err(DnsError::config_field(
                "idle_timeout must be positive",
                "tcp.idle_timeout_secs",
            ));
        }

        if self.max_message_size < 512 {
            return Err(DnsError::config_field(
                "max_message_size must be at least 512 bytes",
                "tcp.max_message_size",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Rate Limit Configuration
// ============================================================================

/// What `count` does when the update queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Discard the update; the responder never waits on the limiter
    #[default]
    Drop,
    /// Wait for queue capacity
    Block,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// What the responder sends to a blocked client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitAction {
    /// Send nothing
    #[default]
    Drop,
    /// Answer with RCODE REFUSED
    Refused,
}

impl std::fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Refused => write!(f, "refused"),
        }
    }
}

/// Rate limiting configuration
///
/// Every constant of the decayed-rate limiter is tunable here. The
/// defaults reproduce the classic AS112 limiter: 10 000 slots, a 5 second
/// window and a limit of 50.
///
/// # Example
///
/// ```
/// use blackhole_dns::dns::{OverflowPolicy, RateLimitConfig};
///
/// let rate_limit = RateLimitConfig::default()
///     .with_window_secs(16)
///     .with_limit(100);
/// assert_eq!(rate_limit.window().as_secs(), 16);
/// assert_eq!(rate_limit.overflow, OverflowPolicy::Drop);
/// assert!(rate_limit.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Number of slots in the bucket table; fixed at startup
    #[serde(default = "default_table_size")]
    pub table_size: usize,

    /// Idle seconds after which a slot's history is treated as stale
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Decayed rate above which a client is blocked
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Decayed rate above which replies are thinned out; 0 disables
    #[serde(default)]
    pub throttle_rate: u32,

    /// While throttled, every Nth reply is dropped
    #[serde(default = "default_throttle_every")]
    pub throttle_every: u32,

    /// Capacity of the update queue feeding the single writer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Behaviour when the update queue is full
    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Response sent to blocked clients
    #[serde(default)]
    pub action: RateLimitAction,

    /// Start a fresh bucket when a different address writes to an
    /// occupied slot instead of inheriting the occupant's rate
    #[serde(default)]
    pub reset_on_collision: bool,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_table_size() -> usize {
    10_000
}

fn default_window_secs() -> u64 {
    5
}

fn default_limit() -> u32 {
    50
}

fn default_throttle_every() -> u32 {
    10
}

fn default_queue_capacity() -> usize {
    10_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            table_size: default_table_size(),
            window_secs: default_window_secs(),
            limit: default_limit(),
            throttle_rate: 0,
            throttle_every: default_throttle_every(),
            queue_capacity: default_queue_capacity(),
            overflow: OverflowPolicy::default(),
            action: RateLimitAction::default(),
            reset_on_collision: false,
        }
    }
}

impl RateLimitConfig {
    /// Disable rate limiting
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the block threshold
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the stale-history window
    #[must_use]
    pub fn with_window_secs(mut self, window_secs: u64) -> Self {
        self.window_secs = window_secs;
        self
    }

    /// Set the bucket table capacity
    #[must_use]
    pub fn with_table_size(mut self, table_size: usize) -> Self {
        self.table_size = table_size;
        self
    }

    /// Enable throttling above `rate`, dropping every `every`th reply
    #[must_use]
    pub fn with_throttle(mut self, rate: u32, every: u32) -> Self {
        self.throttle_rate = rate;
        self.throttle_every = every;
        self
    }

    /// Set the update queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the queue overflow policy
    #[must_use]
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Set the response sent to blocked clients
    #[must_use]
    pub fn with_action(mut self, action: RateLimitAction) -> Self {
        self.action = action;
        self
    }

    /// Toggle exact slot identity on collision
    #[must_use]
    pub fn with_reset_on_collision(mut self, reset: bool) -> Self {
        self.reset_on_collision = reset;
        self
    }

    /// The stale-history window as a `Duration`
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Validate the rate limit configuration
    ///
    /// A disabled limiter is always valid.
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` if:
    /// - `limit`, `table_size`, `queue_capacity` or `throttle_every` is zero
    /// - `window_secs` is outside `1..=MAX_WINDOW_SECS`
    /// - `throttle_rate` is set but not below `limit`
    pub fn validate(&self) -> DnsResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.limit == 0 {
            return Err(DnsError::config_field(
                "limit must be positive when rate limiting is enabled",
                "rate_limit.limit",
            ));
        }

        if self.table_size == 0 {
            return Err(DnsError::config_field(
                "table_size must be positive",
                "rate_limit.table_size",
            ));
        }

        if self.window_secs == 0 || self.window_secs > MAX_WINDOW_SECS {
            return Err(DnsError::config_field(
                format!(
                    "window_secs must be between 1 and {MAX_WINDOW_SECS}, got {}",
                    self.window_secs
                ),
                "rate_limit.window_secs",
            ));
        }

        if self.queue_capacity == 0 {
            return Err(DnsError::config_field(
                "queue_capacity must be positive",
                "rate_limit.queue_capacity",
            ));
        }

        if self.throttle_every == 0 {
            return Err(DnsError::config_field(
                "throttle_every must be positive",
                "rate_limit.throttle_every",
            ));
        }

        if self.throttle_rate != 0 && self.throttle_rate >= self.limit {
            return Err(DnsError::config_field(
                format!(
                    "throttle_rate ({}) must be below limit ({})",
                    self.throttle_rate, self.limit
                ),
                "rate_limit.throttle_rate",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Zone Configuration
// ============================================================================

/// Blackhole zones served by the responder
///
/// # Example
///
/// ```
/// use blackhole_dns::dns::ZoneConfig;
///
/// let zones = ZoneConfig::default();
/// assert_eq!(zones.zones.len(), 19);
/// assert!(zones.zones.iter().any(|z| z == "168.192.in-addr.arpa."));
/// assert_eq!(zones.soa.mname, "prisoner.iana.org.");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone apexes, fully qualified
    #[serde(default = "default_zones")]
    pub zones: Vec<String>,

    /// SOA returned in the authority section for every zone
    #[serde(default)]
    pub soa: SoaConfig,
}

fn default_zones() -> Vec<String> {
    let mut zones = vec![
        "10.in-addr.arpa.".to_string(),
        "254.169.in-addr.arpa.".to_string(),
        "168.192.in-addr.arpa.".to_string(),
    ];
    zones.extend((16..=31).map(|octet| format!("{octet}.172.in-addr.arpa.")));
    zones
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            zones: default_zones(),
            soa: SoaConfig::default(),
        }
    }
}

impl ZoneConfig {
    /// Replace the zone list
    #[must_use]
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the zone configuration
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` if the zone list is empty or any
    /// zone or SOA name is not a valid domain name.
    pub fn validate(&self) -> DnsResult<()> {
        if self.zones.is_empty() {
            return Err(DnsError::config_field(
                "at least one zone must be configured",
                "zones.zones",
            ));
        }

        for zone in &self.zones {
            Name::from_ascii(zone).map_err(|e| {
                DnsError::config_field(format!("invalid zone name '{zone}': {e}"), "zones.zones")
            })?;
        }

        self.soa.validate()
    }
}

/// SOA record contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary name server
    #[serde(default = "default_mname")]
    pub mname: String,
    /// Responsible mailbox
    #[serde(default = "default_rname")]
    pub rname: String,
    #[serde(default = "default_serial")]
    pub serial: u32,
    #[serde(default = "default_refresh")]
    pub refresh: i32,
    #[serde(default = "default_retry")]
    pub retry: i32,
    #[serde(default = "default_expire")]
    pub expire: i32,
    /// Negative caching TTL
    #[serde(default = "default_minimum")]
    pub minimum: u32,
    /// TTL of the SOA record itself
    #[serde(default = "default_soa_ttl")]
    pub ttl: u32,
}

fn default_mname() -> String {
    "prisoner.iana.org.".to_string()
}

fn default_rname() -> String {
    "hostmaster.root-servers.org.".to_string()
}

fn default_serial() -> u32 {
    2_002_040_800
}

fn default_refresh() -> i32 {
    1800
}

fn default_retry() -> i32 {
    900
}

fn default_expire() -> i32 {
    604_800
}

fn default_minimum() -> u32 {
    604_800
}

fn default_soa_ttl() -> u32 {
    3600
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            mname: default_mname(),
            rname: default_rname(),
            serial: default_serial(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
            ttl: default_soa_ttl(),
        }
    }
}

impl SoaConfig {
    /// Validate the SOA names and timers
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` for an unparsable name or a
    /// negative timer.
    pub fn validate(&self) -> DnsResult<()> {
        for (value, field) in [(&self.mname, "zones.soa.mname"), (&self.rname, "zones.soa.rname")] {
            Name::from_ascii(value).map_err(|e| {
                DnsError::config_field(format!("invalid name '{value}': {e}"), field)
            })?;
        }

        if self.refresh < 0 || self.retry < 0 || self.expire < 0 {
            return Err(DnsError::config_field(
                "SOA timers must not be negative",
                "zones.soa",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // DnsConfig Tests
    // ========================================================================

    #[test]
    fn test_dns_config_default() {
        let config = DnsConfig::default();
        assert_eq!(config.listen_udp, "0.0.0.0:8053".parse().unwrap());
        assert_eq!(config.listen_tcp, "0.0.0.0:8053".parse().unwrap());
        assert!(config.tcp_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dns_config_with_listen() {
        let addr: SocketAddr = "127.0.0.1:5353".parse().unwrap();
        let config = DnsConfig::new().with_listen(addr);
        assert_eq!(config.listen_udp, addr);
        assert_eq!(config.listen_tcp, addr);
    }

    #[test]
    fn test_dns_config_serde_partial() {
        let json = r#"{ "listen_udp": "127.0.0.1:53", "rate_limit": { "limit": 20 } }"#;
        let config: DnsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.listen_udp.port(), 53);
        assert_eq!(config.listen_tcp.port(), 8053);
        assert_eq!(config.rate_limit.limit, 20);
        assert_eq!(config.rate_limit.window_secs, 5);
        assert_eq!(config.zones.zones.len(), 19);
    }

    #[test]
    fn test_dns_config_serde_roundtrip() {
        let config = DnsConfig::default().with_rate_limit(
            RateLimitConfig::default()
                .with_overflow(OverflowPolicy::Block)
                .with_action(RateLimitAction::Refused),
        );
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"overflow\":\"block\""));
        assert!(json.contains("\"action\":\"refused\""));

        let parsed: DnsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rate_limit.overflow, OverflowPolicy::Block);
        assert_eq!(parsed.rate_limit.action, RateLimitAction::Refused);
    }

    // ========================================================================
    // TcpServerConfig Tests
    // ========================================================================

    #[test]
    fn test_tcp_config_validation() {
        assert!(TcpServerConfig::default().validate().is_ok());
        assert!(TcpServerConfig::default().with_limits(0, 0).validate().is_err());
        assert!(TcpServerConfig::default().with_limits(5, 10).validate().is_err());
        assert!(TcpServerConfig::default().with_idle_timeout(0).validate().is_err());

        let mut config = TcpServerConfig::default();
        config.max_message_size = 100;
        assert!(config.validate().is_err());
    }

    // ========================================================================
    // RateLimitConfig Tests
    // ========================================================================

    #[test]
    fn test_rate_limit_defaults() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.table_size, 10_000);
        assert_eq!(config.window_secs, 5);
        assert_eq!(config.limit, 50);
        assert_eq!(config.throttle_rate, 0);
        assert_eq!(config.throttle_every, 10);
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.overflow, OverflowPolicy::Drop);
        assert_eq!(config.action, RateLimitAction::Drop);
        assert!(!config.reset_on_collision);
    }

    #[test]
    fn test_rate_limit_validation() {
        assert!(RateLimitConfig::default().with_limit(0).validate().is_err());
        assert!(RateLimitConfig::default().with_table_size(0).validate().is_err());
        assert!(RateLimitConfig::default().with_window_secs(0).validate().is_err());
        assert!(RateLimitConfig::default()
            .with_window_secs(MAX_WINDOW_SECS + 1)
            .validate()
            .is_err());
        assert!(RateLimitConfig::default().with_queue_capacity(0).validate().is_err());
        assert!(RateLimitConfig::default().with_throttle(10, 0).validate().is_err());
        assert!(RateLimitConfig::default().with_throttle(50, 10).validate().is_err());
        assert!(RateLimitConfig::default().with_throttle(25, 10).validate().is_ok());
        assert!(RateLimitConfig::default().with_window_secs(16).validate().is_ok());
    }

    #[test]
    fn test_rate_limit_disabled_skips_validation() {
        let config = RateLimitConfig::default().with_limit(0).disabled();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_error_names_field() {
        let err = RateLimitConfig::default()
            .with_window_secs(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("rate_limit.window_secs"));
    }

    // ========================================================================
    // ZoneConfig Tests
    // ========================================================================

    #[test]
    fn test_default_zones() {
        let zones = ZoneConfig::default();
        assert!(zones.zones.contains(&"10.in-addr.arpa.".to_string()));
        assert!(zones.zones.contains(&"254.169.in-addr.arpa.".to_string()));
        assert!(zones.zones.contains(&"16.172.in-addr.arpa.".to_string()));
        assert!(zones.zones.contains(&"31.172.in-addr.arpa.".to_string()));
        assert!(!zones.zones.contains(&"32.172.in-addr.arpa.".to_string()));
        assert!(zones.validate().is_ok());
    }

    #[test]
    fn test_zone_validation() {
        let empty: Vec<String> = Vec::new();
        assert!(ZoneConfig::default().with_zones(empty).validate().is_err());

        let mut config = ZoneConfig::default();
        config.soa.refresh = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_soa_defaults() {
        let soa = SoaConfig::default();
        assert_eq!(soa.rname, "hostmaster.root-servers.org.");
        assert_eq!(soa.serial, 2_002_040_800);
        assert_eq!(soa.refresh, 1800);
        assert_eq!(soa.retry, 900);
        assert_eq!(soa.expire, 604_800);
        assert_eq!(soa.minimum, 604_800);
        assert_eq!(soa.ttl, 3600);
    }
}
