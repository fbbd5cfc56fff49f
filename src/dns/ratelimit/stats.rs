//! Rate limiter counters

use std::sync::atomic::{AtomicU64, Ordering};

use super::decision::Decision;

/// Statistics for the rate limiter
///
/// Queue counters are written by producers and the update actor;
/// decision counters by the responder.
#[derive(Debug, Default)]
pub struct RateLimiterStats {
    /// Updates accepted into the queue
    submitted: AtomicU64,
    /// Updates discarded because the queue was full or closed
    dropped: AtomicU64,
    applied: AtomicU64,
    /// Writes to a slot last written by another address
    collisions: AtomicU64,
    allowed: AtomicU64,
    throttled: AtomicU64,
    blocked: AtomicU64,
}

impl RateLimiterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the new dropped total
    pub(crate) fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_applied(&self, collided: bool) {
        self.applied.fetch_add(1, Ordering::Relaxed);
        if collided {
            self.collisions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_decision(&self, decision: Decision) {
        let counter = match decision {
            Decision::Allow => &self.allowed,
            Decision::Throttle => &self.throttled,
            Decision::Block => &self.blocked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    /// Get snapshot
    #[must_use]
    pub fn snapshot(&self) -> RateLimiterStatsSnapshot {
        RateLimiterStatsSnapshot {
            submitted: self.submitted(),
            dropped: self.dropped(),
            applied: self.applied(),
            collisions: self.collisions(),
            allowed: self.allowed.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            blocked: self.blocked(),
        }
    }
}

/// Snapshot of rate limiter statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterStatsSnapshot {
    pub submitted: u64,
    pub dropped: u64,
    pub applied: u64,
    pub collisions: u64,
    pub allowed: u64,
    pub throttled: u64,
    pub blocked: u64,
}

impl RateLimiterStatsSnapshot {
    /// Fraction of updates lost to queue overflow
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_rate(&self) -> f64 {
        let total = self.submitted + self.dropped;
        if total == 0 {
            return 0.0;
        }
        self.dropped as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = RateLimiterStats::new();
        assert_eq!(stats.snapshot(), RateLimiterStatsSnapshot::default());
        assert!(stats.snapshot().drop_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_applied() {
        let stats = RateLimiterStats::new();
        stats.record_applied(false);
        stats.record_applied(true);

        let snap = stats.snapshot();
        assert_eq!(snap.applied, 2);
        assert_eq!(snap.collisions, 1);
    }

    #[test]
    fn test_drop_rate() {
        let stats = RateLimiterStats::new();
        for _ in 0..3 {
            stats.record_submitted();
        }
        assert_eq!(stats.record_dropped(), 1);

        let snap = stats.snapshot();
        assert!((snap.drop_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_decision() {
        let stats = RateLimiterStats::new();
        stats.record_decision(Decision::Allow);
        stats.record_decision(Decision::Throttle);
        stats.record_decision(Decision::Block);
        stats.record_decision(Decision::Block);

        let snap = stats.snapshot();
        assert_eq!(snap.allowed, 1);
        assert_eq!(snap.throttled, 1);
        assert_eq!(snap.blocked, 2);
    }
}
