//! DNS Query Handler
//!
//! Parsing, validation, the rate limit gate and reply generation, shared
//! by the UDP and TCP listeners.
//!
//! # Architecture
//!
//! ```text
//! Incoming Query
//!     |
//!     v
//! Parse DNS Message (hickory-proto)
//!     |
//!     v
//! Query Validation
//!     |   - message type and OpCode
//!     |   - at least one question
//!     |   - QNAME length limits
//!     |
//!     v
//! RateLimiter::blocked ──> should_drop ──> RateLimitExceeded
//!     |
//!     v
//! ZoneTable::answer (SOA in authority, or SERVFAIL)
//!     |
//!     v
//! RateLimiter::count
//!     |
//!     v
//! Serialize (UDP: truncate to the client's buffer)
//! ```
//!
//! # Example
//!
//! ```
//! use blackhole_dns::dns::ratelimit::RateLimiter;
//! use blackhole_dns::dns::server::DnsHandler;
//! use blackhole_dns::dns::{ZoneConfig, ZoneTable};
//! use std::sync::Arc;
//!
//! let zones = Arc::new(ZoneTable::from_config(&ZoneConfig::default()).unwrap());
//! let handler = DnsHandler::new(Arc::new(RateLimiter::disabled()), zones);
//! assert_eq!(handler.stats().queries_received(), 0);
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hickory_proto::op::{Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::RecordType;
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tracing::{debug, trace, warn};

use crate::dns::config::RateLimitAction;
use crate::dns::error::{DnsError, DnsResult};
use crate::dns::ratelimit::RateLimiter;
use crate::dns::zone::ZoneTable;

/// Minimum DNS header size
const DNS_HEADER_SIZE: usize = 12;

/// Maximum UDP response size without EDNS0 (RFC 1035 section 4.2.1)
pub const MAX_UDP_RESPONSE_SIZE_NO_EDNS: usize = 512;

/// Maximum domain name length (RFC 1035)
const MAX_DOMAIN_LENGTH: usize = 253;

/// Maximum label length (RFC 1035)
const MAX_LABEL_LENGTH: usize = 63;

/// Query context containing parsed information
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Original query ID
    pub query_id: u16,
    /// Query domain name (QNAME)
    pub qname: String,
    /// Query type
    pub qtype: RecordType,
    /// Client address
    pub client: SocketAddr,
}

/// Statistics for the DNS handler
#[derive(Debug, Default)]
pub struct HandlerStats {
    /// Total queries received
    queries_received: AtomicU64,
    /// Queries answered from a zone
    zone_answers: AtomicU64,
    /// Queries outside every zone (SERVFAIL)
    servfail_answers: AtomicU64,
    /// Parse errors
    parse_errors: AtomicU64,
    /// Validation errors
    validation_errors: AtomicU64,
    /// Replies suppressed by the rate limiter
    rate_limited: AtomicU64,
    /// Error responses generated
    error_responses: AtomicU64,
}

impl HandlerStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Get queries received
    #[must_use]
    pub fn queries_received(&self) -> u64 {
        self.queries_received.load(Ordering::Relaxed)
    }

    /// Get queries answered, in zone or not
    #[must_use]
    pub fn queries_processed(&self) -> u64 {
        self.zone_answers() + self.servfail_answers()
    }

    /// Get in-zone answers
    #[must_use]
    pub fn zone_answers(&self) -> u64 {
        self.zone_answers.load(Ordering::Relaxed)
    }

    /// Get out-of-zone answers
    #[must_use]
    pub fn servfail_answers(&self) -> u64 {
        self.servfail_answers.load(Ordering::Relaxed)
    }

    /// Get parse errors
    #[must_use]
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// Get validation errors
    #[must_use]
    pub fn validation_errors(&self) -> u64 {
        self.validation_errors.load(Ordering::Relaxed)
    }

    /// Get rate limited count
    #[must_use]
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    /// Get error responses count
    #[must_use]
    pub fn error_responses(&self) -> u64 {
        self.error_responses.load(Ordering::Relaxed)
    }

    /// Get snapshot
    #[must_use]
    pub fn snapshot(&self) -> HandlerStatsSnapshot {
        HandlerStatsSnapshot {
            queries_received: self.queries_received(),
            zone_answers: self.zone_answers(),
            servfail_answers: self.servfail_answers(),
            parse_errors: self.parse_errors(),
            validation_errors: self.validation_errors(),
            rate_limited: self.rate_limited(),
            error_responses: self.error_responses(),
        }
    }
}

/// Snapshot of handler statistics
#[derive(Debug, Clone, Copy)]
pub struct HandlerStatsSnapshot {
    /// Queries received
    pub queries_received: u64,
    /// In-zone answers
    pub zone_answers: u64,
    /// Out-of-zone answers
    pub servfail_answers: u64,
    /// Parse errors
    pub parse_errors: u64,
    /// Validation errors
    pub validation_errors: u64,
    /// Rate limited
    pub rate_limited: u64,
    /// Error responses
    pub error_responses: u64,
}

impl HandlerStatsSnapshot {
    /// Get success rate
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.queries_received == 0 {
            return 1.0;
        }
        (self.zone_answers + self.servfail_answers) as f64 / self.queries_received as f64
    }
}

/// DNS query handler
pub struct DnsHandler {
    /// Rate limiter
    rate_limiter: Arc<RateLimiter>,
    /// Served zones
    zones: Arc<ZoneTable>,
    /// Statistics
    stats: HandlerStats,
}

impl DnsHandler {
    /// Create a new DNS handler
    #[must_use]
    pub fn new(rate_limiter: Arc<RateLimiter>, zones: Arc<ZoneTable>) -> Self {
        Self {
            rate_limiter,
            zones,
            stats: HandlerStats::new(),
        }
    }

    /// Create a handler with rate limiting disabled
    #[must_use]
    pub fn without_rate_limit(zones: Arc<ZoneTable>) -> Self {
        Self::new(Arc::new(RateLimiter::disabled()), zones)
    }

    /// Handle an incoming DNS query
    ///
    /// # Errors
    ///
    /// - `DnsError::ParseError` if the query is malformed
    /// - `DnsError::InvalidQuery` if query validation fails
    /// - `DnsError::RateLimitExceeded` if the reply is suppressed
    /// - `DnsError::SerializeError` if the reply cannot be encoded
    pub async fn handle_query(&self, client: SocketAddr, query_data: &[u8]) -> DnsResult<Vec<u8>> {
        let (_, response) = self.respond(client, query_data).await?;
        self.serialize_response(&response)
    }

    /// Handle a query received over UDP
    ///
    /// Same as [`handle_query`](Self::handle_query), but a reply larger
    /// than the client's advertised buffer is replaced by a TC=1 reply.
    ///
    /// # Errors
    ///
    /// See [`handle_query`](Self::handle_query).
    pub async fn handle_udp_query(
        &self,
        client: SocketAddr,
        query_data: &[u8],
    ) -> DnsResult<Vec<u8>> {
        let (query, response) = self.respond(client, query_data).await?;
        let response_data = self.serialize_response(&response)?;
        let buffer_size = self.get_client_buffer_size(&query);
        Ok(self.process_for_udp(&query, response_data, buffer_size))
    }

    async fn respond(&self, client: SocketAddr, query_data: &[u8]) -> DnsResult<(Message, Message)> {
        self.stats.queries_received.fetch_add(1, Ordering::Relaxed);

        let query = self.parse_query(query_data)?;

        trace!(
            client = %client,
            id = query.id(),
            "Processing DNS query"
        );

        let context = self.validate_query(client, &query)?;

        let decision = self.rate_limiter.blocked(client, &query);
        if self.rate_limiter.should_drop(decision) {
            self.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::rate_limit(
                client,
                self.rate_limiter.current_rate(client.ip()),
                self.rate_limiter.limit(),
            ));
        }

        let response = self.zones.answer(&query);
        if response.response_code() == ResponseCode::NoError {
            self.stats.zone_answers.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.servfail_answers.fetch_add(1, Ordering::Relaxed);
            debug!(
                client = %client,
                qname = %context.qname,
                "Query outside served zones"
            );
        }

        self.rate_limiter.count(client, &query, &response).await;

        Ok((query, response))
    }

    /// Parse raw bytes into a DNS message
    fn parse_query(&self, data: &[u8]) -> DnsResult<Message> {
        if data.len() < DNS_HEADER_SIZE {
            self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::parse(format!(
                "message too short: {} bytes (minimum: {})",
                data.len(),
                DNS_HEADER_SIZE
            )));
        }

        Message::from_bytes(data).map_err(|e| {
            self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
            DnsError::parse(format!("failed to parse DNS message: {e}"))
        })
    }

    /// Validate a parsed DNS query
    fn validate_query(&self, client: SocketAddr, query: &Message) -> DnsResult<QueryContext> {
        let header = query.header();

        if header.message_type() != MessageType::Query {
            self.stats.validation_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::invalid_query_id(
                "expected query, got response",
                header.id(),
            ));
        }

        if header.op_code() != OpCode::Query {
            self.stats.validation_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::invalid_query_id(
                format!("unsupported opcode: {:?}", header.op_code()),
                header.id(),
            ));
        }

        let Some(question) = query.queries().first() else {
            self.stats.validation_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::invalid_query_id(
                "query has no questions",
                header.id(),
            ));
        };

        let qname = question.name().to_string();
        let qtype = question.query_type();

        self.validate_qname(&qname)?;

        debug!(
            client = %client,
            qname = %qname,
            qtype = ?qtype,
            "Valid DNS query"
        );

        Ok(QueryContext {
            query_id: header.id(),
            qname,
            qtype,
            client,
        })
    }

    /// Validate a domain name
    fn validate_qname(&self, qname: &str) -> DnsResult<()> {
        let trimmed = qname.trim_end_matches('.');

        if trimmed.len() > MAX_DOMAIN_LENGTH {
            self.stats.validation_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::invalid_query(format!(
                "domain name too long: {} chars (max: {MAX_DOMAIN_LENGTH})",
                trimmed.len()
            )));
        }

        if trimmed.contains("..") {
            self.stats.validation_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::invalid_query("empty label in domain name"));
        }

        if let Some(label) = trimmed.split('.').find(|l| l.len() > MAX_LABEL_LENGTH) {
            self.stats.validation_errors.fetch_add(1, Ordering::Relaxed);
            return Err(DnsError::invalid_query(format!(
                "label too long: {} chars (max: {MAX_LABEL_LENGTH})",
                label.len()
            )));
        }

        Ok(())
    }

    /// Generate the wire reply for a failed query
    ///
    /// Returns `None` when nothing should be sent: the data is too short
    /// to carry an ID, it is itself a response, or the query was rate
    /// limited under [`RateLimitAction::Drop`].
    pub fn generate_error_response(&self, query_data: &[u8], error: &DnsError) -> Option<Vec<u8>> {
        if error.is_rate_limited() && self.rate_limiter.action() == RateLimitAction::Drop {
            return None;
        }

        if query_data.len() < 3 {
            return None;
        }
        // QR bit set: never answer a response
        if query_data[2] & 0x80 != 0 {
            return None;
        }
        let query_id = u16::from_be_bytes([query_data[0], query_data[1]]);

        let rcode = Self::error_to_rcode(error);

        let mut response = Message::new();
        let mut header = Header::new();
        header.set_id(query_id);
        header.set_message_type(MessageType::Response);
        header.set_op_code(OpCode::Query);
        header.set_response_code(rcode);
        header.set_recursion_desired(query_data[2] & 0x01 != 0);
        response.set_header(header);

        if let Ok(query) = Message::from_bytes(query_data) {
            for q in query.queries() {
                response.add_query(q.clone());
            }
        }

        match response.to_bytes() {
            Ok(bytes) => {
                self.stats.error_responses.fetch_add(1, Ordering::Relaxed);
                Some(bytes)
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize error response");
                None
            }
        }
    }

    /// Map a `DnsError` to a DNS response code
    fn error_to_rcode(error: &DnsError) -> ResponseCode {
        match error {
            DnsError::ParseError { .. } | DnsError::InvalidQuery { .. } => ResponseCode::FormErr,
            DnsError::RateLimitExceeded { .. } => ResponseCode::Refused,
            _ => ResponseCode::ServFail,
        }
    }

    /// Serialize a response message to bytes
    fn serialize_response(&self, response: &Message) -> DnsResult<Vec<u8>> {
        response
            .to_bytes()
            .map_err(|e| DnsError::serialize(format!("failed to serialize response: {e}")))
    }

    /// Check if a response exceeds the client's buffer
    #[must_use]
    pub fn needs_truncation(&self, response_data: &[u8], client_buffer_size: usize) -> bool {
        response_data.len() > client_buffer_size
    }

    /// Generate a header-plus-question reply with the TC bit set
    pub fn generate_truncated_response(&self, query: &Message) -> Option<Vec<u8>> {
        let mut response = Message::new();

        let mut header = Header::response_from_request(query.header());
        header.set_truncated(true);
        header.set_response_code(ResponseCode::NoError);
        response.set_header(header);

        for q in query.queries() {
            response.add_query(q.clone());
        }

        debug!(
            id = query.header().id(),
            "Generating truncated response (TC=1)"
        );

        match response.to_bytes() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Failed to serialize truncated response");
                None
            }
        }
    }

    /// Apply UDP truncation if needed
    pub fn process_for_udp(
        &self,
        query: &Message,
        response_data: Vec<u8>,
        client_buffer_size: usize,
    ) -> Vec<u8> {
        if self.needs_truncation(&response_data, client_buffer_size) {
            debug!(
                response_size = response_data.len(),
                buffer_size = client_buffer_size,
                "Response exceeds buffer size, truncating"
            );
            self.generate_truncated_response(query)
                .unwrap_or(response_data)
        } else {
            response_data
        }
    }

    /// Client's UDP buffer size from EDNS0, or 512 without EDNS0
    #[must_use]
    pub fn get_client_buffer_size(&self, query: &Message) -> usize {
        query
            .extensions()
            .as_ref()
            .map_or(MAX_UDP_RESPONSE_SIZE_NO_EDNS, |edns| {
                usize::from(edns.max_payload()).max(MAX_UDP_RESPONSE_SIZE_NO_EDNS)
            })
    }

    /// Get handler statistics
    #[must_use]
    pub fn stats(&self) -> &HandlerStats {
        &self.stats
    }

    /// Get rate limiter reference
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Get the zone table
    #[must_use]
    pub fn zones(&self) -> &Arc<ZoneTable> {
        &self.zones
    }
}
