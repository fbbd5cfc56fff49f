//! blackhole-dns: AS112-style blackhole DNS responder
//!
//! # Usage
//!
//! ```bash
//! # Run with built-in defaults (0.0.0.0:8053)
//! ./blackhole-dns
//!
//! # Run with custom configuration
//! ./blackhole-dns -c /path/to/config.json
//!
//! # Run with environment overrides
//! BLACKHOLE_DNS_RATE_LIMIT=100 ./blackhole-dns
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use blackhole_dns::config::{create_default_config, load_config_with_env, load_default_with_env, Config};
use blackhole_dns::dns::server::{DnsHandler, TcpDnsServer, UdpDnsServer};
use blackhole_dns::dns::{RateLimiter, ZoneTable};

/// How long to wait for listeners to stop after the shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Blackhole DNS responder for private reverse zones
#[derive(Debug, Parser)]
#[command(name = "blackhole-dns", version, about)]
struct Args {
    /// Configuration file path (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port for both UDP and TCP
    #[arg(short, long)]
    port: Option<u16>,

    /// Write a default configuration to the --config path and exit
    #[arg(short, long)]
    generate_config: bool,

    /// Check configuration and exit
    #[arg(long)]
    check: bool,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Disable per-client rate limiting
    #[arg(long)]
    no_rate_limit: bool,
}

impl Args {
    fn load(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config_with_env(path)
                .with_context(|| format!("Failed to load configuration from {path:?}"))?,
            None => load_default_with_env().context("Invalid environment override")?,
        };

        if let Some(port) = self.port {
            config.dns = config.dns.with_port(port);
        }
        if let Some(level) = &self.log_level {
            config.log.level.clone_from(level);
        }
        if self.no_rate_limit {
            config.dns.rate_limit = config.dns.rate_limit.disabled();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Initialize logging
fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .context("Invalid log level")?
        .add_directive("hickory_proto=warn".parse()?)
        .add_directive("tokio=warn".parse()?);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target);

    match (config.log.is_json(), config.log.timestamps) {
        (true, true) => subscriber.json().init(),
        (true, false) => subscriber.json().without_time().init(),
        (false, true) => subscriber.init(),
        (false, false) => subscriber.without_time().init(),
    }

    Ok(())
}

/// A running listener and the means to stop it
struct Listener {
    name: &'static str,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Listener {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle).await.is_err() {
            warn!("{} listener did not stop within {:?}", self.name, SHUTDOWN_TIMEOUT);
        }
    }
}

async fn spawn_udp(config: &Config, handler: Arc<DnsHandler>) -> Result<(Listener, Arc<UdpDnsServer>)> {
    let server = Arc::new(
        UdpDnsServer::bind(config.dns.listen_udp, handler)
            .await
            .context("Failed to bind UDP listener")?,
    );
    let (tx, rx) = oneshot::channel();
    let task_server = Arc::clone(&server);
    let handle = tokio::spawn(async move {
        if let Err(e) = task_server.run_until_shutdown(rx).await {
            error!("UDP server error: {}", e);
        }
    });

    Ok((
        Listener {
            name: "UDP",
            shutdown: tx,
            handle,
        },
        server,
    ))
}

async fn spawn_tcp(config: &Config, handler: Arc<DnsHandler>) -> Result<(Listener, Arc<TcpDnsServer>)> {
    let server = Arc::new(
        TcpDnsServer::bind(config.dns.listen_tcp, handler, config.dns.tcp.clone())
            .await
            .context("Failed to bind TCP listener")?,
    );
    let (tx, rx) = oneshot::channel();
    let task_server = Arc::clone(&server);
    let handle = tokio::spawn(async move {
        if let Err(e) = task_server.run_until_shutdown(rx).await {
            error!("TCP server error: {}", e);
        }
    });

    Ok((
        Listener {
            name: "TCP",
            shutdown: tx,
            handle,
        },
        server,
    ))
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();

    let args = Args::parse();

    if args.generate_config {
        let path = args
            .config
            .as_ref()
            .context("--generate-config requires --config <PATH>")?;
        create_default_config(path)?;
        println!("Generated default configuration at {path:?}");
        return Ok(());
    }

    let config = args.load()?;

    if args.check {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config)?;

    info!("blackhole-dns v{}", blackhole_dns::VERSION);
    match &args.config {
        Some(path) => info!("Configuration loaded from {:?}", path),
        None => info!("Using built-in configuration"),
    }

    let rate_limiter = Arc::new(RateLimiter::new(&config.dns.rate_limit));
    let zones = Arc::new(ZoneTable::from_config(&config.dns.zones)?);
    info!("Serving {} zones", zones.len());

    let handler = Arc::new(DnsHandler::new(Arc::clone(&rate_limiter), zones));

    let (udp, udp_server) = spawn_udp(&config, Arc::clone(&handler)).await?;
    let tcp = if config.dns.tcp_enabled {
        Some(spawn_tcp(&config, Arc::clone(&handler)).await?)
    } else {
        None
    };

    info!(
        "blackhole-dns ready on {} (TCP: {}, rate limit: {})",
        udp_server.local_addr(),
        tcp.as_ref()
            .map_or_else(|| "disabled".to_string(), |(_, s)| s.local_addr().to_string()),
        if rate_limiter.is_enabled() {
            format!(
                "{} per {}s",
                config.dns.rate_limit.limit, config.dns.rate_limit.window_secs
            )
        } else {
            "disabled".to_string()
        }
    );
    info!(
        "Startup complete in {:.2}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, initiating shutdown...");
        }
        () = wait_for_sigterm() => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    info!("Shutting down...");

    udp.stop().await;
    let tcp_stats = match tcp {
        Some((listener, server)) => {
            listener.stop().await;
            Some(server.stats().snapshot())
        }
        None => None,
    };

    rate_limiter.flush().await;

    let handler_stats = handler.stats().snapshot();
    info!(
        "Final query stats: {} received, {} zone answers, {} servfail, {} malformed, {} rate limited",
        handler_stats.queries_received,
        handler_stats.zone_answers,
        handler_stats.servfail_answers,
        handler_stats.parse_errors + handler_stats.validation_errors,
        handler_stats.rate_limited
    );

    let udp_stats = udp_server.stats().snapshot();
    info!(
        "UDP stats: {} datagrams received, {} replies sent, {} unanswered",
        udp_stats.datagrams_received, udp_stats.replies_sent, udp_stats.unanswered
    );
    if let Some(tcp_stats) = tcp_stats {
        info!(
            "TCP stats: {} connections accepted, {} rejected, {} queries",
            tcp_stats.connections_accepted, tcp_stats.connections_rejected, tcp_stats.queries_processed
        );
    }

    if rate_limiter.is_enabled() {
        let limiter_stats = rate_limiter.stats().snapshot();
        info!(
            "Rate limiter stats: {} updates applied, {} dropped, {} collisions, {} blocked, {} throttled",
            limiter_stats.applied,
            limiter_stats.dropped,
            limiter_stats.collisions,
            limiter_stats.blocked,
            limiter_stats.throttled
        );
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGTERM signal
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await;
}
