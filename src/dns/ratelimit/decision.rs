//! Allow / throttle / block decision
//!
//! A pure function of one bucket snapshot and the current time. It never
//! touches the table, so repeated calls with the same snapshot and the
//! same `now` return the same answer. Moving `now` past the window turns
//! any bucket into an allow.

use std::time::{Duration, Instant};

use super::bucket::Bucket;
use crate::dns::config::RateLimitConfig;

/// What to do with a client's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Serve normally
    Allow,
    /// Serve, but thin out replies
    Throttle,
    /// Suppress the reply
    Block,
}

impl Decision {
    /// Whether this is [`Decision::Allow`]
    #[must_use]
    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }

    /// Lowercase name for logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Throttle => "throttle",
            Self::Block => "block",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds applied to a bucket
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    limit: u32,
    throttle_rate: u32,
    window: Duration,
}

impl DecisionPolicy {
    /// Block above `limit`; throttle above `throttle_rate` (0 disables)
    #[must_use]
    pub fn new(limit: u32, throttle_rate: u32, window: Duration) -> Self {
        Self {
            limit,
            throttle_rate,
            window,
        }
    }

    /// Build from rate limit configuration
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, config.throttle_rate, config.window())
    }

    /// Block threshold
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Decide for a bucket snapshot at `now`
    ///
    /// No bucket means no data and allows. A bucket idle for longer than
    /// the window is treated the same way, since its next update resets it.
    /// The answer for a given bucket therefore depends on `now`.
    ///
    /// # Example
    ///
    /// ```
    /// use blackhole_dns::dns::ratelimit::{Bucket, Decision, DecisionPolicy};
    /// use std::time::{Duration, Instant};
    ///
    /// let policy = DecisionPolicy::new(50, 0, Duration::from_secs(5));
    /// let now = Instant::now();
    /// let mut bucket = Bucket::first("192.0.2.1".parse().unwrap(), now);
    ///
    /// assert_eq!(policy.decide(None, now), Decision::Allow);
    /// assert_eq!(policy.decide(Some(&bucket), now), Decision::Allow);
    ///
    /// bucket.rate = 51;
    /// assert_eq!(policy.decide(Some(&bucket), now), Decision::Block);
    /// assert_eq!(policy.decide(Some(&bucket), now + Duration::from_secs(6)), Decision::Allow);
    /// ```
    #[must_use]
    pub fn decide(&self, bucket: Option<&Bucket>, now: Instant) -> Decision {
        let Some(bucket) = bucket else {
            return Decision::Allow;
        };

        if bucket.is_stale(now, self.window) {
            return Decision::Allow;
        }

        if bucket.rate > self.limit {
            Decision::Block
        } else if self.throttle_rate > 0 && bucket.rate > self.throttle_rate {
            Decision::Throttle
        } else {
            Decision::Allow
        }
    }
}
