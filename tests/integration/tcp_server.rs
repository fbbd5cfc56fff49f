//! TCP listener tests over loopback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blackhole_dns::dns::server::{DnsHandler, TcpDnsServer, UdpDnsServer};
use blackhole_dns::dns::{RateLimitAction, RateLimitConfig, TcpServerConfig};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::oneshot;

use super::{create_handler, query_bytes};

// ============================================================================
// Test Helpers
// ============================================================================

async fn start_tcp(
    handler: Arc<DnsHandler>,
    config: TcpServerConfig,
) -> (SocketAddr, Arc<TcpDnsServer>, oneshot::Sender<()>) {
    let server = Arc::new(
        TcpDnsServer::bind("127.0.0.1:0".parse().unwrap(), handler, config)
            .await
            .unwrap(),
    );
    let addr = server.local_addr();
    let (tx, rx) = oneshot::channel();
    let task_server = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = task_server.run_until_shutdown(rx).await;
    });
    (addr, server, tx)
}

/// Write one length-prefixed query and read one length-prefixed reply
async fn send_query(stream: &mut TcpStream, data: &[u8]) -> Option<Message> {
    let len = u16::try_from(data.len()).unwrap();
    stream.write_all(&len.to_be_bytes()).await.unwrap();
    stream.write_all(data).await.unwrap();

    let mut len_buf = [0u8; 2];
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut len_buf)).await;
    match read {
        Ok(Ok(_)) => {}
        _ => return None,
    }
    let mut buf = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
    stream.read_exact(&mut buf).await.unwrap();
    Some(Message::from_vec(&buf).unwrap())
}

// ============================================================================
// Answer Tests
// ============================================================================

#[tokio::test]
async fn test_pipelined_queries_on_one_connection() {
    let handler = create_handler(&RateLimitConfig::default());
    let (addr, server, _shutdown) = start_tcp(handler, TcpServerConfig::default()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let reply = send_query(
        &mut stream,
        &query_bytes(11, "2.2.31.172.in-addr.arpa.", RecordType::PTR),
    )
    .await
    .expect("reply");
    assert_eq!(reply.id(), 11);
    assert_eq!(reply.response_code(), ResponseCode::NoError);
    assert_eq!(reply.name_servers().len(), 1);

    let reply = send_query(&mut stream, &query_bytes(12, "example.org.", RecordType::AAAA))
        .await
        .expect("reply");
    assert_eq!(reply.id(), 12);
    assert_eq!(reply.response_code(), ResponseCode::ServFail);

    assert_eq!(server.stats().queries_processed(), 2);
}

#[tokio::test]
async fn test_per_ip_connection_limit() {
    let handler = create_handler(&RateLimitConfig::default());
    let config = TcpServerConfig::default().with_limits(10, 1);
    let (addr, server, _shutdown) = start_tcp(handler, config).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    let reply = send_query(
        &mut first,
        &query_bytes(1, "1.10.in-addr.arpa.", RecordType::PTR),
    )
    .await;
    assert!(reply.is_some());

    // second connection from the same address is closed without a reply
    let mut second = TcpStream::connect(addr).await.unwrap();
    let _ = second.write_all(&[0, 1, 0]).await;
    let mut buf = [0u8; 2];
    let result = tokio::time::timeout(Duration::from_secs(2), second.read(&mut buf)).await;
    assert!(matches!(result, Ok(Ok(0)) | Ok(Err(_))));

    assert_eq!(server.stats().connections_rejected(), 1);
    let client_ip = first.local_addr().unwrap().ip();
    assert_eq!(server.tracker().connections_from(client_ip), 1);

    // the slot frees up once the first connection closes
    drop(first);
    let mut released = false;
    for _ in 0..50 {
        if server.tracker().connections_from(client_ip) == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(released);
}

// ============================================================================
// Shared Limiter Tests
// ============================================================================

#[tokio::test]
async fn test_udp_flood_blocks_tcp_client() {
    let config = RateLimitConfig::default()
        .with_limit(3)
        .with_action(RateLimitAction::Refused);
    let handler = create_handler(&config);

    let udp = Arc::new(
        UdpDnsServer::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&handler))
            .await
            .unwrap(),
    );
    let udp_addr = udp.local_addr();
    let (udp_tx, udp_rx) = oneshot::channel::<()>();
    let udp_task = Arc::clone(&udp);
    tokio::spawn(async move {
        let _ = udp_task.run_until_shutdown(udp_rx).await;
    });

    let (tcp_addr, _tcp, _tcp_shutdown) =
        start_tcp(Arc::clone(&handler), TcpServerConfig::default()).await;

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let query = query_bytes(5, "3.3.10.in-addr.arpa.", RecordType::PTR);
    let mut buf = vec![0u8; 1024];
    for _ in 0..4 {
        socket.send_to(&query, udp_addr).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
    }
    handler.rate_limiter().flush().await;

    let mut stream = TcpStream::connect(tcp_addr).await.unwrap();
    let reply = send_query(&mut stream, &query).await.expect("reply");
    assert_eq!(reply.response_code(), ResponseCode::Refused);
    assert_eq!(reply.id(), 5);

    let _ = udp_tx.send(());
}
