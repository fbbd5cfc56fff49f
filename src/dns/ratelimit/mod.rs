//! Per-client decayed rate limiting
//!
//! A fixed-capacity table of per-slot rate estimates, written by a single
//! update actor and read lock-free on the response path.
//!
//! # Architecture
//!
//! ```text
//!                    blocked(client, query)
//! Responder ──────────────────────────────────> BucketTable (load) ──> Decision
//!     │
//!     │ count(client, query, response)
//!     v
//! UpdateHandle ──> bounded mpsc ──> UpdateActor ──> RateEstimator ──> BucketTable (store)
//! ```
//!
//! # Approximations
//!
//! - Clients hashing to the same slot share one estimate. The second
//!   client inherits the first one's rate until an idle gap longer than
//!   the window resets the slot (see `reset_on_collision` for the exact
//!   identity alternative).
//! - Reads may observe a slot one update behind the writer.
//! - With the default drop policy an overflowing queue loses updates,
//!   which can only make the estimate lower.
//!
//! # Example
//!
//! ```
//! use blackhole_dns::dns::ratelimit::{Decision, RateLimiter};
//! use blackhole_dns::dns::RateLimitConfig;
//! use std::net::IpAddr;
//! use std::time::Instant;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = RateLimiter::new(&RateLimitConfig::default().with_limit(3));
//! let client: IpAddr = "192.0.2.10".parse().unwrap();
//! let now = Instant::now();
//!
//! for _ in 0..4 {
//!     limiter.observe_at(client, now, 0).await;
//! }
//! limiter.flush().await;
//!
//! assert_eq!(limiter.decide_at(client, now), Decision::Block);
//! # }
//! ```

mod actor;
mod bucket;
mod decision;
mod estimator;
mod stats;

pub use bucket::{Bucket, BucketTable};
pub use decision::{Decision, DecisionPolicy};
pub use estimator::{RateEstimator, SUB_WINDOW};
pub use stats::{RateLimiterStats, RateLimiterStatsSnapshot};

use actor::{UpdateActor, UpdateHandle, UpdateRequest};

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hickory_proto::op::Message;
use tracing::{debug, info};

use crate::dns::config::{OverflowPolicy, RateLimitAction, RateLimitConfig};

/// Responder-facing rate limiter
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct RateLimiter {
    enabled: bool,
    table: Arc<BucketTable>,
    policy: DecisionPolicy,
    updates: Option<UpdateHandle>,
    overflow: OverflowPolicy,
    action: RateLimitAction,
    throttle_every: u64,
    throttle_counter: AtomicU64,
    stats: Arc<RateLimiterStats>,
}

impl RateLimiter {
    /// Create a limiter and start its update actor
    ///
    /// A disabled configuration yields the same limiter as
    /// [`RateLimiter::disabled`].
    ///
    /// # Panics
    ///
    /// Panics if rate limiting is enabled and this is called outside a
    /// Tokio runtime.
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let table = Arc::new(BucketTable::new(config.table_size));
        let stats = Arc::new(RateLimiterStats::new());
        let estimator =
            RateEstimator::new(config.window()).with_reset_on_collision(config.reset_on_collision);
        let (updates, _task) = UpdateActor::spawn(
            Arc::clone(&table),
            estimator,
            Arc::clone(&stats),
            config.queue_capacity,
        );

        info!(
            slots = table.capacity(),
            window_secs = config.window_secs,
            limit = config.limit,
            throttle_rate = config.throttle_rate,
            overflow = %config.overflow,
            action = %config.action,
            "Rate limiter started"
        );

        Self {
            enabled: true,
            table,
            policy: DecisionPolicy::from_config(config),
            updates: Some(updates),
            overflow: config.overflow,
            action: config.action,
            throttle_every: u64::from(config.throttle_every.max(1)),
            throttle_counter: AtomicU64::new(0),
            stats,
        }
    }

    /// A limiter that allows everything and records nothing
    #[must_use]
    pub fn disabled() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            enabled: false,
            table: Arc::new(BucketTable::new(1)),
            policy: DecisionPolicy::from_config(&defaults),
            updates: None,
            overflow: defaults.overflow,
            action: defaults.action,
            throttle_every: u64::from(defaults.throttle_every),
            throttle_counter: AtomicU64::new(0),
            stats: Arc::new(RateLimiterStats::new()),
        }
    }

    /// Record a completed exchange
    ///
    /// Fire-and-forget: never fails the caller, and with the default drop
    /// policy never waits.
    pub async fn count(&self, client: SocketAddr, query: &Message, response: &Message) {
        let accepted = self.observe_at(client.ip(), Instant::now(), query.id()).await;
        if accepted {
            debug!(
                client = %client,
                id = query.id(),
                rcode = ?response.response_code(),
                "Exchange counted"
            );
        }
    }

    /// Record a request observed at an explicit time
    ///
    /// Returns whether the update was queued.
    pub async fn observe_at(&self, client: IpAddr, at: Instant, query_id: u16) -> bool {
        let Some(updates) = &self.updates else {
            return false;
        };
        let request = UpdateRequest {
            client,
            observed_at: at,
            query_id,
        };
        updates.submit(request, self.overflow).await
    }

    /// Decide whether to serve `client`
    ///
    /// Synchronous and lock-free. The query is accepted for interface
    /// symmetry with [`count`](Self::count); the decision depends only on
    /// the client's slot and the clock.
    ///
    /// Repeated calls agree with each other only for a fixed instant. A
    /// slot idle for longer than the window reads as empty, so a blocked
    /// client turns allowed once the window passes even if nothing is
    /// counted in between. Use [`decide_at`](Self::decide_at) to pin the
    /// instant.
    pub fn blocked(&self, client: SocketAddr, _query: &Message) -> Decision {
        let decision = self.decide_at(client.ip(), Instant::now());
        if self.enabled {
            self.stats.record_decision(decision);
        }
        if !decision.is_allow() {
            debug!(
                client = %client,
                decision = %decision,
                rate = self.current_rate(client.ip()),
                limit = self.policy.limit(),
                "Rate limit decision"
            );
        }
        decision
    }

    /// Side-effect free decision at an explicit time
    #[must_use]
    pub fn decide_at(&self, client: IpAddr, now: Instant) -> Decision {
        if !self.enabled {
            return Decision::Allow;
        }
        self.policy.decide(self.table.lookup(client).as_ref(), now)
    }

    /// Whether a reply under `decision` should be suppressed
    ///
    /// Blocked replies are always suppressed; throttled ones every
    /// `throttle_every`th time.
    pub fn should_drop(&self, decision: Decision) -> bool {
        match decision {
            Decision::Allow => false,
            Decision::Block => true,
            Decision::Throttle => {
                let n = self.throttle_counter.fetch_add(1, Ordering::Relaxed);
                n % self.throttle_every == self.throttle_every - 1
            }
        }
    }

    /// Wait until every update queued so far is visible to readers
    pub async fn flush(&self) {
        if let Some(updates) = &self.updates {
            updates.flush().await;
        }
    }

    /// Snapshot of the slot `client` hashes to
    #[must_use]
    pub fn bucket_for(&self, client: IpAddr) -> Option<Bucket> {
        self.table.lookup(client)
    }

    /// Current rate of `client`'s slot, 0 when empty
    #[must_use]
    pub fn current_rate(&self, client: IpAddr) -> u32 {
        self.bucket_for(client).map_or(0, |bucket| bucket.rate)
    }

    /// Forget all rate state
    ///
    /// The clear runs on the update actor after every update queued before
    /// this call, so no in-flight update can resurrect a cleared slot.
    pub async fn reset(&self) {
        if let Some(updates) = &self.updates {
            updates.reset().await;
        }
    }

    /// Whether rate limiting is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Block threshold
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.policy.limit()
    }

    /// Response sent to blocked clients
    #[must_use]
    pub fn action(&self) -> RateLimitAction {
        self.action
    }

    /// The bucket table
    #[must_use]
    pub fn table(&self) -> &Arc<BucketTable> {
        &self.table
    }

    /// Get statistics
    #[must_use]
    pub fn stats(&self) -> &RateLimiterStats {
        &self.stats
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("enabled", &self.enabled)
            .field("slots", &self.table.capacity())
            .field("policy", &self.policy)
            .field("overflow", &self.overflow)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}
