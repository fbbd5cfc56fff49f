//! Blackhole zone table
//!
//! Answers every query under a configured zone with an authoritative,
//! empty NOERROR reply carrying the zone's SOA in the authority section.
//! Names outside every zone get SERVFAIL.
//!
//! # Example
//!
//! ```
//! use blackhole_dns::dns::{ZoneConfig, ZoneTable};
//! use hickory_proto::op::{Message, Query, ResponseCode};
//! use hickory_proto::rr::{Name, RecordType};
//! use std::str::FromStr;
//!
//! let zones = ZoneTable::from_config(&ZoneConfig::default()).unwrap();
//!
//! let mut query = Message::new();
//! query.set_id(7);
//! query.add_query(Query::query(
//!     Name::from_str("1.1.168.192.in-addr.arpa.").unwrap(),
//!     RecordType::PTR,
//! ));
//!
//! let reply = zones.answer(&query);
//! assert_eq!(reply.response_code(), ResponseCode::NoError);
//! assert!(reply.authoritative());
//! assert_eq!(reply.name_servers().len(), 1);
//! ```

use hickory_proto::op::{Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::SOA;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use tracing::debug;

use super::config::{SoaConfig, ZoneConfig};
use super::error::{DnsError, DnsResult};

/// One served zone
#[derive(Debug, Clone)]
pub struct Zone {
    apex: Name,
    soa: Record,
}

impl Zone {
    /// Build a zone with the given SOA contents
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` if the apex or an SOA name does
    /// not parse.
    pub fn new(apex: &str, soa: &SoaConfig) -> DnsResult<Self> {
        let apex = parse_name(apex, "zones.zones")?;
        let mname = parse_name(&soa.mname, "zones.soa.mname")?;
        let rname = parse_name(&soa.rname, "zones.soa.rname")?;

        let rdata = SOA::new(
            mname,
            rname,
            soa.serial,
            soa.refresh,
            soa.retry,
            soa.expire,
            soa.minimum,
        );

        let mut record = Record::new();
        record.set_name(apex.clone());
        record.set_record_type(RecordType::SOA);
        record.set_dns_class(DNSClass::IN);
        record.set_ttl(soa.ttl);
        record.set_data(Some(RData::SOA(rdata)));

        Ok(Self { apex, soa: record })
    }

    /// Zone apex
    #[must_use]
    pub fn apex(&self) -> &Name {
        &self.apex
    }

    /// The SOA record placed in replies
    #[must_use]
    pub fn soa(&self) -> &Record {
        &self.soa
    }
}

fn parse_name(value: &str, field: &str) -> DnsResult<Name> {
    let mut name = Name::from_ascii(value).map_err(|e| {
        DnsError::config_field(format!("invalid name '{value}': {e}"), field)
    })?;
    name.set_fqdn(true);
    Ok(name)
}

/// All served zones
#[derive(Debug, Clone)]
pub struct ZoneTable {
    zones: Vec<Zone>,
}

impl ZoneTable {
    /// Build the table from configuration
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ConfigError` for an empty zone list or a bad name.
    pub fn from_config(config: &ZoneConfig) -> DnsResult<Self> {
        config.validate()?;

        let mut zones = config
            .zones
            .iter()
            .map(|apex| Zone::new(apex, &config.soa))
            .collect::<DnsResult<Vec<_>>>()?;

        // deepest apex first so the first match is the most specific
        zones.sort_by_key(|zone| std::cmp::Reverse(zone.apex.num_labels()));

        debug!(zones = zones.len(), "Zone table loaded");
        Ok(Self { zones })
    }

    /// The most specific zone containing `name`
    #[must_use]
    pub fn zone_of(&self, name: &Name) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.apex.zone_of(name))
    }

    /// SOA record for `name`, if it is served
    #[must_use]
    pub fn soa_for(&self, name: &Name) -> Option<&Record> {
        self.zone_of(name).map(Zone::soa)
    }

    /// Build the reply for a validated query
    ///
    /// The zone is chosen from the first question.
    #[must_use]
    pub fn answer(&self, query: &Message) -> Message {
        let mut response = Message::new();
        let mut header = Header::response_from_request(query.header());
        header.set_message_type(MessageType::Response);
        header.set_op_code(OpCode::Query);
        header.set_recursion_available(false);
        response.set_header(header);

        for q in query.queries() {
            response.add_query(q.clone());
        }

        match query.queries().first().and_then(|q| self.soa_for(q.name())) {
            Some(soa) => {
                response.set_authoritative(true);
                response.set_response_code(ResponseCode::NoError);
                response.add_name_server(soa.clone());
            }
            None => {
                response.set_authoritative(false);
                response.set_response_code(ResponseCode::ServFail);
            }
        }

        response
    }

    /// Number of zones
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether no zones are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Iterate over zones, most specific first
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }
}
