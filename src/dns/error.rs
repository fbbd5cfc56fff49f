//! Error types for the DNS responder
//!
//! This module defines the error hierarchy for DNS operations: message
//! parsing, network I/O, configuration, and rate limiting.
//!
//! # Error Categories
//!
//! - **Parse/Serialize errors**: DNS message encoding/decoding failures
//! - **Network errors**: Socket I/O and connection issues
//! - **Config errors**: Invalid configuration parameters
//! - **Rate limit errors**: Client exceeded its decayed query rate
//!
//! # Example
//!
//! ```
//! use blackhole_dns::dns::DnsError;
//!
//! let err = DnsError::network("connection reset");
//! assert!(err.is_recoverable());
//! assert!(err.to_string().contains("connection reset"));
//! ```

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Error types for DNS operations
///
/// # Recoverability
///
/// - **Recoverable**: Transient issues (network errors, rate limiting)
/// - **Non-recoverable**: Malformed input, bad configuration, internal bugs
#[derive(Debug, Error)]
pub enum DnsError {
    /// DNS message parsing failed
    #[error("Failed to parse DNS message: {reason}")]
    ParseError {
        /// Description of what went wrong during parsing
        reason: String,
        /// Optional domain name involved in the parse error
        domain: Option<String>,
    },

    /// DNS message serialization failed
    #[error("Failed to serialize DNS message: {reason}")]
    SerializeError {
        /// Description of what went wrong during serialization
        reason: String,
    },

    /// Network I/O error
    #[error("Network error: {reason}")]
    NetworkError {
        /// Description of the network failure
        reason: String,
        /// The underlying I/O error, if available
        #[source]
        source: Option<io::Error>,
    },

    /// Invalid configuration
    #[error("Invalid DNS configuration: {reason}")]
    ConfigError {
        /// Description of the configuration error
        reason: String,
        /// The configuration field that is invalid, if applicable
        field: Option<String>,
    },

    /// Rate limit exceeded
    ///
    /// Returned by the handler when the client's slot in the bucket table
    /// carries a decayed rate above the configured limit.
    #[error("Rate limit exceeded for client {client}: rate {rate} (limit: {limit})")]
    RateLimitExceeded {
        /// The client address that exceeded the limit
        client: SocketAddr,
        /// The decayed rate observed for the client's slot
        rate: u32,
        /// The configured limit
        limit: u32,
    },

    /// Invalid query
    ///
    /// The received message parsed but is not something we answer
    /// (a response, a non-QUERY opcode, an empty question section).
    #[error("Invalid DNS query: {reason}")]
    InvalidQuery {
        /// Description of why the query is invalid
        reason: String,
        /// The query ID, if available
        query_id: Option<u16>,
    },

    /// Internal processing error
    #[error("Internal DNS error: {reason}")]
    InternalError {
        /// Description of the internal error
        reason: String,
    },
}

impl DnsError {
    // ========================================================================
    // Constructor methods
    // ========================================================================

    /// Create a parse error
    ///
    /// # Example
    ///
    /// ```
    /// use blackhole_dns::dns::DnsError;
    ///
    /// let err = DnsError::parse("invalid record type");
    /// assert!(err.to_string().contains("invalid record type"));
    /// ```
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
            domain: None,
        }
    }

    /// Create a parse error with domain context
    pub fn parse_domain(reason: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
            domain: Some(domain.into()),
        }
    }

    /// Create a serialization error
    pub fn serialize(reason: impl Into<String>) -> Self {
        Self::SerializeError {
            reason: reason.into(),
        }
    }

    /// Create a network error
    pub fn network(reason: impl Into<String>) -> Self {
        Self::NetworkError {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a network error from an I/O error
    ///
    /// # Example
    ///
    /// ```
    /// use blackhole_dns::dns::DnsError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::AddrInUse, "in use");
    /// let err = DnsError::network_io("bind failed", io_err);
    /// assert!(err.to_string().contains("bind failed"));
    /// assert!(!err.is_recoverable());
    /// ```
    pub fn network_io(reason: impl Into<String>, source: io::Error) -> Self {
        Self::NetworkError {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
            field: None,
        }
    }

    /// Create a configuration error with field context
    ///
    /// # Example
    ///
    /// ```
    /// use blackhole_dns::dns::DnsError;
    ///
    /// let err = DnsError::config_field("must be positive", "rate_limit.limit");
    /// assert_eq!(err.field(), Some("rate_limit.limit"));
    /// ```
    pub fn config_field(reason: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
            field: Some(field.into()),
        }
    }

    /// Create a rate limit exceeded error
    ///
    /// # Example
    ///
    /// ```
    /// use blackhole_dns::dns::DnsError;
    /// use std::net::SocketAddr;
    ///
    /// let client: SocketAddr = "192.0.2.7:5300".parse().unwrap();
    /// let err = DnsError::rate_limit(client, 61, 50);
    /// assert!(err.is_rate_limited());
    /// assert!(err.to_string().contains("rate 61"));
    /// ```
    pub fn rate_limit(client: SocketAddr, rate: u32, limit: u32) -> Self {
        Self::RateLimitExceeded {
            client,
            rate,
            limit,
        }
    }

    /// Create an invalid query error
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
            query_id: None,
        }
    }

    /// Create an invalid query error with query ID
    pub fn invalid_query_id(reason: impl Into<String>, query_id: u16) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
            query_id: Some(query_id),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::InternalError {
            reason: reason.into(),
        }
    }

    // ========================================================================
    // Classification methods
    // ========================================================================

    /// Check if this error is recoverable
    ///
    /// Network errors are recoverable unless the underlying I/O error is
    /// one that retrying cannot fix (permission denied, address in use).
    /// Rate limiting is recoverable once the client's rate decays.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NetworkError { source, .. } => source.as_ref().is_none_or(|e| {
                matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut
                        | io::ErrorKind::Interrupted
                        | io::ErrorKind::WouldBlock
                        | io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionRefused
                )
            }),
            Self::RateLimitExceeded { .. } => true,
            Self::ParseError { .. }
            | Self::SerializeError { .. }
            | Self::ConfigError { .. }
            | Self::InvalidQuery { .. }
            | Self::InternalError { .. } => false,
        }
    }

    /// Check if this error indicates rate limiting
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    /// Check if this error was caused by a malformed or unsupported query
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::ParseError { .. } | Self::InvalidQuery { .. })
    }

    /// Get the domain associated with this error, if any
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::ParseError { domain, .. } => domain.as_deref(),
            _ => None,
        }
    }

    /// Get the configuration field associated with this error, if any
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ConfigError { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

impl From<io::Error> for DnsError {
    fn from(err: io::Error) -> Self {
        Self::NetworkError {
            reason: err.to_string(),
            source: Some(err),
        }
    }
}

/// Type alias for Result with [`DnsError`]
pub type DnsResult<T> = std::result::Result<T, DnsError>;
