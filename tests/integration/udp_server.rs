//! UDP listener tests over loopback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blackhole_dns::dns::server::{DnsHandler, UdpDnsServer};
use blackhole_dns::dns::{RateLimitAction, RateLimitConfig};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::RecordType;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

use super::{create_handler, query_bytes};

const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// Test Helpers
// ============================================================================

struct RunningServer {
    addr: SocketAddr,
    server: Arc<UdpDnsServer>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RunningServer {
    async fn start(handler: Arc<DnsHandler>) -> Self {
        let server = Arc::new(
            UdpDnsServer::bind("127.0.0.1:0".parse().unwrap(), handler)
                .await
                .unwrap(),
        );
        let addr = server.local_addr();
        let (tx, rx) = oneshot::channel();
        let task_server = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = task_server.run_until_shutdown(rx).await;
        });

        Self {
            addr,
            server,
            shutdown: Some(tx),
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

/// Send one datagram and wait briefly for a reply
async fn exchange(socket: &UdpSocket, server: SocketAddr, data: &[u8]) -> Option<Message> {
    socket.send_to(data, server).await.unwrap();
    let mut buf = vec![0u8; 4096];
    match tokio::time::timeout(REPLY_TIMEOUT, socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(Message::from_vec(&buf[..len]).unwrap()),
        _ => None,
    }
}

// ============================================================================
// Answer Tests
// ============================================================================

#[tokio::test]
async fn test_in_zone_query_gets_soa() {
    let server = RunningServer::start(create_handler(&RateLimitConfig::default())).await;
    let socket = client().await;

    let reply = exchange(
        &socket,
        server.addr,
        &query_bytes(0x4242, "7.0.168.192.in-addr.arpa.", RecordType::PTR),
    )
    .await
    .expect("reply");

    assert_eq!(reply.id(), 0x4242);
    assert_eq!(reply.message_type(), MessageType::Response);
    assert_eq!(reply.response_code(), ResponseCode::NoError);
    assert!(reply.authoritative());
    assert!(reply.answers().is_empty());
    assert_eq!(reply.name_servers().len(), 1);
    assert_eq!(reply.name_servers()[0].record_type(), RecordType::SOA);
}

#[tokio::test]
async fn test_out_of_zone_query_gets_servfail() {
    let server = RunningServer::start(create_handler(&RateLimitConfig::default())).await;
    let socket = client().await;

    let reply = exchange(
        &socket,
        server.addr,
        &query_bytes(7, "www.example.com.", RecordType::A),
    )
    .await
    .expect("reply");

    assert_eq!(reply.id(), 7);
    assert_eq!(reply.response_code(), ResponseCode::ServFail);
    assert!(reply.name_servers().is_empty());
}

#[tokio::test]
async fn test_query_without_question_gets_formerr() {
    let server = RunningServer::start(create_handler(&RateLimitConfig::default())).await;
    let socket = client().await;

    // bare header: id 0x0102, RD set, all counts zero
    let header = [0x01, 0x02, 0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
    let reply = exchange(&socket, server.addr, &header).await.expect("reply");

    assert_eq!(reply.id(), 0x0102);
    assert_eq!(reply.response_code(), ResponseCode::FormErr);
    assert!(server.server.stats().malformed() >= 1);
}

#[tokio::test]
async fn test_response_packet_is_ignored() {
    let server = RunningServer::start(create_handler(&RateLimitConfig::default())).await;
    let socket = client().await;

    let mut data = query_bytes(9, "1.10.in-addr.arpa.", RecordType::PTR);
    data[2] |= 0x80;
    assert!(exchange(&socket, server.addr, &data).await.is_none());
}

// ============================================================================
// Rate Limit Tests
// ============================================================================

#[tokio::test]
async fn test_flooding_client_is_silenced() {
    let config = RateLimitConfig::default().with_limit(3);
    let handler = create_handler(&config);
    let server = RunningServer::start(Arc::clone(&handler)).await;
    let socket = client().await;
    let query = query_bytes(1, "1.1.10.in-addr.arpa.", RecordType::PTR);

    for _ in 0..4 {
        assert!(exchange(&socket, server.addr, &query).await.is_some());
    }
    handler.rate_limiter().flush().await;

    assert!(exchange(&socket, server.addr, &query).await.is_none());
    assert_eq!(handler.stats().rate_limited(), 1);
    assert_eq!(server.server.stats().rate_limited(), 1);
}

#[tokio::test]
async fn test_flooding_client_is_refused() {
    let config = RateLimitConfig::default()
        .with_limit(3)
        .with_action(RateLimitAction::Refused);
    let handler = create_handler(&config);
    let server = RunningServer::start(Arc::clone(&handler)).await;
    let socket = client().await;
    let query = query_bytes(2, "1.1.10.in-addr.arpa.", RecordType::PTR);

    for _ in 0..4 {
        let reply = exchange(&socket, server.addr, &query).await.expect("reply");
        assert_eq!(reply.response_code(), ResponseCode::NoError);
    }
    handler.rate_limiter().flush().await;

    let reply = exchange(&socket, server.addr, &query).await.expect("reply");
    assert_eq!(reply.response_code(), ResponseCode::Refused);
    assert_eq!(reply.id(), 2);
}

#[tokio::test]
async fn test_no_rate_limit_serves_everything() {
    let handler = create_handler(&RateLimitConfig::default().with_limit(1).disabled());
    let server = RunningServer::start(Arc::clone(&handler)).await;
    let socket = client().await;
    let query = query_bytes(3, "5.5.16.172.in-addr.arpa.", RecordType::PTR);

    for _ in 0..20 {
        assert!(exchange(&socket, server.addr, &query).await.is_some());
    }
    assert_eq!(handler.stats().zone_answers(), 20);
    assert_eq!(handler.stats().rate_limited(), 0);
}
