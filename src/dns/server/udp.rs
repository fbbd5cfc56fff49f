//! UDP listener
//!
//! One receive loop owns the socket's read side. Each datagram is answered
//! on its own task, so a query parked on a full limiter queue never stalls
//! the loop.
//!
//! ```text
//! recv_from() ──spawn──> handle_udp_query() ──> send_to()
//!                               |
//!                               Err ──> generate_error_response()
//! ```
//!
//! # Example
//!
//! ```no_run
//! use blackhole_dns::dns::ratelimit::RateLimiter;
//! use blackhole_dns::dns::server::{DnsHandler, UdpDnsServer};
//! use blackhole_dns::dns::{RateLimitConfig, ZoneConfig, ZoneTable};
//! use std::sync::Arc;
//! use tokio::sync::oneshot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rate_limiter = Arc::new(RateLimiter::new(&RateLimitConfig::default()));
//! let zones = Arc::new(ZoneTable::from_config(&ZoneConfig::default())?);
//! let handler = Arc::new(DnsHandler::new(rate_limiter, zones));
//!
//! let server = UdpDnsServer::bind("127.0.0.1:8053".parse()?, handler).await?;
//! let (_stop, stop_rx) = oneshot::channel();
//! server.run_until_shutdown(stop_rx).await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace};

use super::handler::DnsHandler;
use crate::dns::error::{DnsError, DnsResult};

/// Largest datagram read from the socket (EDNS0 payload ceiling)
pub const MAX_UDP_MESSAGE_SIZE: usize = 4096;

/// Counters kept by the UDP listener
#[derive(Debug, Default)]
pub struct UdpServerStats {
    datagrams_received: AtomicU64,
    replies_sent: AtomicU64,
    /// Datagrams that produced no reply
    unanswered: AtomicU64,
    malformed: AtomicU64,
    rate_limited: AtomicU64,
}

impl UdpServerStats {
    #[must_use]
    pub fn datagrams_received(&self) -> u64 {
        self.datagrams_received.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn replies_sent(&self) -> u64 {
        self.replies_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn unanswered(&self) -> u64 {
        self.unanswered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    #[must_use]
    pub fn snapshot(&self) -> UdpServerStatsSnapshot {
        UdpServerStatsSnapshot {
            datagrams_received: self.datagrams_received(),
            replies_sent: self.replies_sent(),
            unanswered: self.unanswered(),
            malformed: self.malformed(),
            rate_limited: self.rate_limited(),
        }
    }
}

/// Copy of [`UdpServerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpServerStatsSnapshot {
    pub datagrams_received: u64,
    pub replies_sent: u64,
    pub unanswered: u64,
    pub malformed: u64,
    pub rate_limited: u64,
}

/// UDP DNS listener
pub struct UdpDnsServer {
    socket: Arc<UdpSocket>,
    handler: Arc<DnsHandler>,
    stats: Arc<UdpServerStats>,
    local_addr: SocketAddr,
}

impl UdpDnsServer {
    /// Bind the listener socket
    ///
    /// # Errors
    ///
    /// Returns `DnsError::NetworkError` if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, handler: Arc<DnsHandler>) -> DnsResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| DnsError::network_io(format!("failed to bind UDP socket to {addr}"), e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| DnsError::network_io("failed to get local address", e))?;

        info!(addr = %local_addr, "UDP DNS server bound");

        Ok(Self {
            socket: Arc::new(socket),
            handler,
            stats: Arc::new(UdpServerStats::default()),
            local_addr,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<UdpServerStats> {
        &self.stats
    }

    /// Receive and dispatch datagrams until `shutdown_rx` fires
    ///
    /// Replies already in flight finish on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns `DnsError::NetworkError` when the socket fails in a way
    /// that will not recover.
    pub async fn run_until_shutdown(&self, mut shutdown_rx: oneshot::Receiver<()>) -> DnsResult<()> {
        info!(addr = %self.local_addr, "UDP DNS server starting");

        loop {
            let mut buf = vec![0u8; MAX_UDP_MESSAGE_SIZE];
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, src)) => {
                        buf.truncate(len);
                        self.dispatch(src, buf);
                    }
                    Err(e) if is_fatal_error(&e) => {
                        error!(error = %e, "Fatal UDP receive error");
                        return Err(DnsError::network_io("UDP recv_from failed", e));
                    }
                    Err(e) => debug!(error = %e, "UDP receive error"),
                },
                _ = &mut shutdown_rx => {
                    info!("UDP DNS server received shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    fn dispatch(&self, src: SocketAddr, datagram: Vec<u8>) {
        self.stats.datagrams_received.fetch_add(1, Ordering::Relaxed);
        trace!(src = %src, len = datagram.len(), "Received UDP datagram");

        let socket = Arc::clone(&self.socket);
        let handler = Arc::clone(&self.handler);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let Some(reply) = answer(&handler, &stats, src, &datagram).await else {
                stats.unanswered.fetch_add(1, Ordering::Relaxed);
                return;
            };
            match socket.send_to(&reply, src).await {
                Ok(_) => {
                    stats.replies_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    stats.unanswered.fetch_add(1, Ordering::Relaxed);
                    debug!(dst = %src, error = %e, "UDP send_to failed");
                }
            }
        });
    }
}

/// Reply bytes for one datagram, or `None` when it gets silence
async fn answer(
    handler: &DnsHandler,
    stats: &UdpServerStats,
    src: SocketAddr,
    datagram: &[u8],
) -> Option<Vec<u8>> {
    match handler.handle_udp_query(src, datagram).await {
        Ok(reply) => Some(reply),
        Err(e) => {
            if e.is_rate_limited() {
                stats.rate_limited.fetch_add(1, Ordering::Relaxed);
            } else if e.is_malformed() {
                stats.malformed.fetch_add(1, Ordering::Relaxed);
            }
            handler.generate_error_response(datagram, &e)
        }
    }
}

/// Receive errors after which the socket is unusable
fn is_fatal_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::AddrNotAvailable | io::ErrorKind::NotConnected
    )
}
