//! TCP listener
//!
//! Each accepted connection carries any number of length-prefixed queries
//! (RFC 1035 section 4.2.2). Every query goes through the same
//! [`DnsHandler`] as UDP, so a client flooding one transport is limited
//! on both.
//!
//! Connections are capped globally and per client address; a connection
//! over either cap is closed right after accept.
//!
//! # Example
//!
//! ```no_run
//! use blackhole_dns::dns::ratelimit::RateLimiter;
//! use blackhole_dns::dns::server::{DnsHandler, TcpDnsServer};
//! use blackhole_dns::dns::{RateLimitConfig, TcpServerConfig, ZoneConfig, ZoneTable};
//! use std::sync::Arc;
//! use tokio::sync::oneshot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rate_limiter = Arc::new(RateLimiter::new(&RateLimitConfig::default()));
//! let zones = Arc::new(ZoneTable::from_config(&ZoneConfig::default())?);
//! let handler = Arc::new(DnsHandler::new(rate_limiter, zones));
//!
//! let addr = "127.0.0.1:8053".parse()?;
//! let server = TcpDnsServer::bind(addr, handler, TcpServerConfig::default()).await?;
//! let (_stop, stop_rx) = oneshot::channel();
//! server.run_until_shutdown(stop_rx).await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, trace};

use super::handler::DnsHandler;
use crate::dns::config::TcpServerConfig;
use crate::dns::error::{DnsError, DnsResult};

/// Smallest frame that can hold a DNS header
pub const MIN_DNS_MESSAGE_SIZE: usize = 12;

// ============================================================================
// Connection Tracker
// ============================================================================

/// Open connection counts, in total and per client address
#[derive(Debug)]
pub struct TcpConnectionTracker {
    per_ip: DashMap<IpAddr, usize>,
    total: AtomicUsize,
    max_total: usize,
    max_per_ip: usize,
}

impl TcpConnectionTracker {
    #[must_use]
    pub fn new(max_total: usize, max_per_ip: usize) -> Self {
        Self {
            per_ip: DashMap::new(),
            total: AtomicUsize::new(0),
            max_total,
            max_per_ip,
        }
    }

    /// Claim a slot for `ip`, released when the returned guard drops
    ///
    /// Returns `None` when either cap is reached.
    pub fn try_acquire(self: &Arc<Self>, ip: IpAddr) -> Option<ConnectionSlot> {
        // the entry lock serializes acquires from the same address
        let mut count = self.per_ip.entry(ip).or_insert(0);
        if *count >= self.max_per_ip {
            debug!(ip = %ip, max = self.max_per_ip, "Per-IP connection limit reached");
            return None;
        }
        let claimed = self
            .total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_total).then_some(n + 1)
            });
        if claimed.is_err() {
            drop(count);
            self.per_ip.remove_if(&ip, |_, count| *count == 0);
            debug!(ip = %ip, max = self.max_total, "Global connection limit reached");
            return None;
        }
        *count += 1;

        Some(ConnectionSlot {
            tracker: Arc::clone(self),
            ip,
        })
    }

    fn release(&self, ip: IpAddr) {
        self.total.fetch_sub(1, Ordering::AcqRel);
        // drop the entry once the address has nothing open
        self.per_ip.remove_if_mut(&ip, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }

    #[must_use]
    pub fn total_connections(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn connections_from(&self, ip: IpAddr) -> usize {
        self.per_ip.get(&ip).map_or(0, |count| *count)
    }
}

/// A held connection slot
#[derive(Debug)]
pub struct ConnectionSlot {
    tracker: Arc<TcpConnectionTracker>,
    ip: IpAddr,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.tracker.release(self.ip);
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters kept by the TCP listener
#[derive(Debug, Default)]
pub struct TcpServerStats {
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    queries_processed: AtomicU64,
    rate_limited: AtomicU64,
}

impl TcpServerStats {
    #[must_use]
    pub fn connections_accepted(&self) -> u64 {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn connections_rejected(&self) -> u64 {
        self.connections_rejected.load(Ordering::Relaxed)
    }

    /// Replies written back to clients
    #[must_use]
    pub fn queries_processed(&self) -> u64 {
        self.queries_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> TcpServerStatsSnapshot {
        TcpServerStatsSnapshot {
            connections_accepted: self.connections_accepted(),
            connections_rejected: self.connections_rejected(),
            queries_processed: self.queries_processed(),
            rate_limited: self.rate_limited(),
        }
    }
}

/// Copy of [`TcpServerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpServerStatsSnapshot {
    pub connections_accepted: u64,
    pub connections_rejected: u64,
    pub queries_processed: u64,
    pub rate_limited: u64,
}

// ============================================================================
// Server
// ============================================================================

/// TCP DNS listener
pub struct TcpDnsServer {
    listener: TcpListener,
    handler: Arc<DnsHandler>,
    tracker: Arc<TcpConnectionTracker>,
    config: TcpServerConfig,
    stats: Arc<TcpServerStats>,
    local_addr: SocketAddr,
}

impl TcpDnsServer {
    /// Bind the listener socket
    ///
    /// # Errors
    ///
    /// Returns `DnsError::NetworkError` if the address cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        handler: Arc<DnsHandler>,
        config: TcpServerConfig,
    ) -> DnsResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DnsError::network_io(format!("failed to bind TCP socket to {addr}"), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| DnsError::network_io("failed to get local address", e))?;

        info!(addr = %local_addr, "TCP DNS server bound");

        Ok(Self {
            listener,
            handler,
            tracker: Arc::new(TcpConnectionTracker::new(
                config.max_connections,
                config.per_ip_max_connections,
            )),
            config,
            stats: Arc::new(TcpServerStats::default()),
            local_addr,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<TcpServerStats> {
        &self.stats
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<TcpConnectionTracker> {
        &self.tracker
    }

    /// Accept connections until `shutdown_rx` fires
    ///
    /// Open connections are left to finish or hit their idle timeout.
    ///
    /// # Errors
    ///
    /// Returns `DnsError::NetworkError` when accepting fails in a way that
    /// will not recover.
    pub async fn run_until_shutdown(&self, mut shutdown_rx: oneshot::Receiver<()>) -> DnsResult<()> {
        info!(addr = %self.local_addr, "TCP DNS server starting");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.admit(stream, peer),
                    Err(e) if is_fatal_error(&e) => {
                        error!(error = %e, "Fatal TCP accept error");
                        return Err(DnsError::network_io("accept failed", e));
                    }
                    Err(e) => debug!(error = %e, "TCP accept error"),
                },
                _ = &mut shutdown_rx => {
                    info!("TCP DNS server received shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let Some(slot) = self.tracker.try_acquire(peer.ip()) else {
            self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
            return;
        };
        self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);

        let handler = Arc::clone(&self.handler);
        let stats = Arc::clone(&self.stats);
        let config = self.config.clone();

        tokio::spawn(async move {
            let _slot = slot;
            if let Err(e) = serve_connection(stream, peer, &handler, &stats, &config).await {
                debug!(peer = %peer, error = %e, "TCP connection closed with error");
            }
        });
    }
}

/// Answer queries on one connection until the client leaves or idles out
async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: &DnsHandler,
    stats: &TcpServerStats,
    config: &TcpServerConfig,
) -> DnsResult<()> {
    let idle = Duration::from_secs(config.idle_timeout_secs);
    let per_query = Duration::from_secs(config.connection_timeout_secs);
    trace!(peer = %peer, "Serving TCP connection");

    loop {
        let frame = match timeout(idle, read_frame(&mut stream, config.max_message_size)).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!(peer = %peer, "TCP connection idle timeout");
                return Ok(());
            }
        };

        let reply = match handler.handle_query(peer, &frame).await {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_rate_limited() {
                    stats.rate_limited.fetch_add(1, Ordering::Relaxed);
                }
                match handler.generate_error_response(&frame, &e) {
                    Some(reply) => reply,
                    None => continue,
                }
            }
        };

        timeout(per_query, write_frame(&mut stream, &reply))
            .await
            .map_err(|_| DnsError::network("TCP write timed out"))??;
        stats.queries_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Read one length-prefixed message; `None` on a clean close between frames
async fn read_frame<R>(reader: &mut R, max_size: usize) -> DnsResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(DnsError::network_io("failed to read length prefix", e)),
    }

    let len = usize::from(u16::from_be_bytes(len_buf));
    if len < MIN_DNS_MESSAGE_SIZE || len > max_size {
        return Err(DnsError::parse(format!(
            "frame length {len} outside {MIN_DNS_MESSAGE_SIZE}..={max_size}"
        )));
    }

    let mut frame = vec![0u8; len];
    reader
        .read_exact(&mut frame)
        .await
        .map_err(|e| DnsError::network_io("failed to read message body", e))?;
    Ok(Some(frame))
}

async fn write_frame<W>(writer: &mut W, message: &[u8]) -> DnsResult<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u16::try_from(message.len())
        .map_err(|_| DnsError::serialize(format!("reply too large: {} bytes", message.len())))?;

    let mut framed = Vec::with_capacity(message.len() + 2);
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(message);
    writer
        .write_all(&framed)
        .await
        .map_err(|e| DnsError::network_io("failed to write reply", e))?;
    writer
        .flush()
        .await
        .map_err(|e| DnsError::network_io("failed to flush", e))
}

fn is_fatal_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::AddrInUse
    )
}
