//! Decayed request-rate estimator
//!
//! Turns a stream of "request observed at T" events into a coarse,
//! exponentially decaying rate, using O(1) state per slot:
//!
//! | elapsed since `last_update` | effect                                          |
//! |-----------------------------|-------------------------------------------------|
//! | slot empty                  | `rate = 1`, `window_count = 1`                  |
//! | `< 1s`                      | `window_count += 1`, `rate += 1`                |
//! | `1s ..= window`             | `rate = (rate >> whole_secs) + 1`, `window_count = 1` |
//! | `> window`                  | `rate = 1`, `window_count = 1`                  |
//!
//! After every event `rate` equals the decayed history plus the current
//! sub-window's count, so the value read by the decision function moves
//! smoothly across the one-second boundary.
//!
//! Events that arrive out of order (an `at` earlier than `last_update`)
//! count toward the current sub-window and never move `last_update`
//! backwards.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use super::bucket::Bucket;

/// Length of one sub-window
pub const SUB_WINDOW: Duration = Duration::from_secs(1);

/// The decay policy
///
/// # Example
///
/// ```
/// use blackhole_dns::dns::ratelimit::RateEstimator;
/// use std::net::IpAddr;
/// use std::time::{Duration, Instant};
///
/// let estimator = RateEstimator::new(Duration::from_secs(5));
/// let client: IpAddr = "192.0.2.1".parse().unwrap();
/// let start = Instant::now();
///
/// let first = estimator.observe(None, client, start);
/// assert_eq!(first.rate, 1);
///
/// let second = estimator.observe(Some(&first), client, start + Duration::from_millis(10));
/// assert_eq!(second.rate, 2);
/// assert_eq!(second.window_count, 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RateEstimator {
    window: Duration,
    reset_on_collision: bool,
}

impl RateEstimator {
    /// Create an estimator that discards history idle for longer than `window`
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            reset_on_collision: false,
        }
    }

    /// Treat a slot written by a different address as empty
    #[must_use]
    pub fn with_reset_on_collision(mut self, reset: bool) -> Self {
        self.reset_on_collision = reset;
        self
    }

    /// The stale-history window
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Apply one observed request from `source` at `at` to `previous`
    #[must_use]
    pub fn observe(&self, previous: Option<&Bucket>, source: IpAddr, at: Instant) -> Bucket {
        let previous = previous.filter(|prev| !self.reset_on_collision || prev.source == source);
        let Some(prev) = previous else {
            return Bucket::first(source, at);
        };

        let elapsed = at.saturating_duration_since(prev.last_update);
        if elapsed < SUB_WINDOW {
            Bucket {
                source,
                last_update: prev.last_update.max(at),
                window_count: prev.window_count.saturating_add(1),
                rate: prev.rate.saturating_add(1),
            }
        } else if elapsed > self.window {
            Bucket::first(source, at)
        } else {
            let shift = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
            Bucket {
                source,
                last_update: at,
                window_count: 1,
                rate: prev.rate.checked_shr(shift).unwrap_or(0).saturating_add(1),
            }
        }
    }
}
