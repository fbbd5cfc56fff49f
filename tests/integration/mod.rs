//! Integration tests for blackhole-dns
//!
//! # Test Organization
//!
//! - `rate_limit`: limiter behaviour through the public API with synthetic time
//! - `udp_server`: real UDP listener on loopback
//! - `tcp_server`: real TCP listener on loopback, sharing limiter state with UDP
//!
//! All sockets bind `127.0.0.1:0`; no external network access is needed.

pub mod rate_limit;
pub mod tcp_server;
pub mod udp_server;

use std::str::FromStr;
use std::sync::Arc;

use blackhole_dns::dns::server::DnsHandler;
use blackhole_dns::dns::{RateLimitConfig, RateLimiter, ZoneConfig, ZoneTable};
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::{Name, RecordType};

/// Handler over the default zones with the given limiter settings
pub fn create_handler(rate_limit: &RateLimitConfig) -> Arc<DnsHandler> {
    let limiter = Arc::new(RateLimiter::new(rate_limit));
    let zones = Arc::new(ZoneTable::from_config(&ZoneConfig::default()).unwrap());
    Arc::new(DnsHandler::new(limiter, zones))
}

/// Wire bytes of a single-question query
pub fn query_bytes(id: u16, name: &str, qtype: RecordType) -> Vec<u8> {
    let mut message = Message::new();
    message.set_id(id);
    message.set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(name).unwrap(), qtype));
    message.to_vec().unwrap()
}
