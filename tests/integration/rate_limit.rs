//! Rate limiter behaviour through the public API
//!
//! Observations are fed with explicit instants so decay over whole
//! seconds can be checked without sleeping.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use blackhole_dns::dns::ratelimit::Decision;
use blackhole_dns::dns::{RateLimitConfig, RateLimiter};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

async fn feed(limiter: &RateLimiter, ip: IpAddr, at: Instant, count: u16) {
    for id in 0..count {
        assert!(limiter.observe_at(ip, at, id).await);
    }
}

// ============================================================================
// Burst and Decay Tests
// ============================================================================

#[tokio::test]
async fn test_burst_blocks_then_decays() {
    let limiter = RateLimiter::new(&RateLimitConfig::default());
    let ip = test_ip(1);
    let t0 = Instant::now();

    feed(&limiter, ip, t0, 80).await;
    limiter.flush().await;

    assert_eq!(limiter.current_rate(ip), 80);
    assert_eq!(limiter.decide_at(ip, t0), Decision::Block);

    // two idle seconds: 80 >> 2 = 20, plus the new request
    feed(&limiter, ip, t0 + Duration::from_secs(2), 1).await;
    limiter.flush().await;

    assert_eq!(limiter.current_rate(ip), 21);
    assert_eq!(
        limiter.decide_at(ip, t0 + Duration::from_secs(2)),
        Decision::Allow
    );
}

#[tokio::test]
async fn test_limit_is_exclusive() {
    let limiter = RateLimiter::new(&RateLimitConfig::default().with_limit(10));
    let ip = test_ip(2);
    let t0 = Instant::now();

    feed(&limiter, ip, t0, 10).await;
    limiter.flush().await;
    assert_eq!(limiter.decide_at(ip, t0), Decision::Allow);

    feed(&limiter, ip, t0, 1).await;
    limiter.flush().await;
    assert_eq!(limiter.decide_at(ip, t0), Decision::Block);
}

#[tokio::test]
async fn test_stale_history_is_ignored() {
    let limiter = RateLimiter::new(&RateLimitConfig::default().with_window_secs(5));
    let ip = test_ip(3);
    let t0 = Instant::now();

    feed(&limiter, ip, t0, 200).await;
    limiter.flush().await;

    assert_eq!(limiter.decide_at(ip, t0 + Duration::from_secs(5)), Decision::Block);
    assert_eq!(limiter.decide_at(ip, t0 + Duration::from_secs(6)), Decision::Allow);

    // a request after the window starts over
    feed(&limiter, ip, t0 + Duration::from_secs(6), 1).await;
    limiter.flush().await;
    assert_eq!(limiter.current_rate(ip), 1);
}

#[tokio::test]
async fn test_throttle_band() {
    let config = RateLimitConfig::default()
        .with_limit(20)
        .with_throttle(10, 2);
    let limiter = RateLimiter::new(&config);
    let ip = test_ip(4);
    let t0 = Instant::now();

    feed(&limiter, ip, t0, 15).await;
    limiter.flush().await;

    let decision = limiter.decide_at(ip, t0);
    assert_eq!(decision, Decision::Throttle);

    let dropped = (0..10).filter(|_| limiter.should_drop(decision)).count();
    assert_eq!(dropped, 5);
}

// ============================================================================
// Addressing Tests
// ============================================================================

#[tokio::test]
async fn test_mapped_ipv6_shares_slot() {
    let limiter = RateLimiter::new(&RateLimitConfig::default().with_limit(5));
    let v4 = Ipv4Addr::new(192, 0, 2, 7);
    let mapped = IpAddr::V6(v4.to_ipv6_mapped());
    let t0 = Instant::now();

    feed(&limiter, IpAddr::V4(v4), t0, 3).await;
    feed(&limiter, mapped, t0, 3).await;
    limiter.flush().await;

    assert_eq!(limiter.current_rate(IpAddr::V4(v4)), 6);
    assert_eq!(limiter.decide_at(mapped, t0), Decision::Block);
}

#[tokio::test]
async fn test_unspecified_address_never_tracked() {
    let limiter = RateLimiter::new(&RateLimitConfig::default().with_limit(1));
    let ip = IpAddr::V6(Ipv6Addr::UNSPECIFIED);
    let t0 = Instant::now();

    for id in 0..5 {
        limiter.observe_at(ip, t0, id).await;
    }
    limiter.flush().await;

    assert!(limiter.bucket_for(ip).is_none());
    assert_eq!(limiter.decide_at(ip, t0), Decision::Allow);
    assert_eq!(limiter.table().occupied(), 0);
}

#[tokio::test]
async fn test_independent_clients() {
    let limiter = RateLimiter::new(&RateLimitConfig::default().with_limit(5));
    let t0 = Instant::now();

    feed(&limiter, test_ip(10), t0, 10).await;
    feed(&limiter, test_ip(11), t0, 2).await;
    limiter.flush().await;

    // default table is large enough that these two do not share a slot
    let same_slot =
        limiter.table().index_for(test_ip(10)) == limiter.table().index_for(test_ip(11));
    if !same_slot {
        assert_eq!(limiter.decide_at(test_ip(10), t0), Decision::Block);
        assert_eq!(limiter.decide_at(test_ip(11), t0), Decision::Allow);
    }
}

// ============================================================================
// Disabled Limiter Tests
// ============================================================================

#[tokio::test]
async fn test_disabled_limiter_allows_everything() {
    let limiter = RateLimiter::new(&RateLimitConfig::default().with_limit(1).disabled());
    let ip = test_ip(20);
    let t0 = Instant::now();

    assert!(!limiter.is_enabled());
    for id in 0..100 {
        assert!(!limiter.observe_at(ip, t0, id).await);
    }
    limiter.flush().await;

    assert_eq!(limiter.decide_at(ip, t0), Decision::Allow);
    assert_eq!(limiter.stats().snapshot().applied, 0);
}
