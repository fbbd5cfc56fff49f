//! Fixed-capacity bucket table
//!
//! One slot per hash of the client address. Slots hold immutable
//! [`Bucket`] snapshots behind `ArcSwapOption`, so the single writer
//! publishes a new snapshot with one atomic store and readers on the hot
//! path load it without taking a lock.
//!
//! ```text
//! index_for(ip) = ahash(octets(canonical(ip))) % capacity
//!
//! slots: [ None | Some(Bucket) | None | Some(Bucket) | ... ]  (capacity fixed)
//! ```
//!
//! Distinct clients that hash to the same slot share it. The last writer's
//! address is recorded; nothing else about earlier occupants survives.

use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHasher;
use arc_swap::ArcSwapOption;

/// Decayed rate state of one table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Last client address that wrote to this slot
    pub source: IpAddr,
    /// Time of the most recent observed request
    pub last_update: Instant,
    /// Requests seen in the current sub-window
    pub window_count: u32,
    /// Decayed history plus the current sub-window's count
    pub rate: u32,
}

impl Bucket {
    /// State of a slot after its first request
    #[must_use]
    pub fn first(source: IpAddr, at: Instant) -> Self {
        Self {
            source,
            last_update: at,
            window_count: 1,
            rate: 1,
        }
    }

    /// Whether this bucket's history is older than `window` at `now`
    #[must_use]
    pub fn is_stale(&self, now: Instant, window: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_update) > window
    }
}

/// Fixed-size, hash-indexed array of buckets
pub struct BucketTable {
    slots: Box<[ArcSwapOption<Bucket>]>,
}

impl BucketTable {
    /// Create a table with `capacity` empty slots (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity.max(1))
            .map(|_| ArcSwapOption::empty())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    /// Number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot index for a client address
    ///
    /// IPv4-mapped IPv6 addresses hash like their IPv4 form so dual-stack
    /// sockets map one client to one slot. Unspecified addresses carry no
    /// client identity and return `None`.
    #[must_use]
    pub fn index_for(&self, ip: IpAddr) -> Option<usize> {
        let ip = ip.to_canonical();
        if ip.is_unspecified() {
            return None;
        }

        let mut hasher = AHasher::default();
        match ip {
            IpAddr::V4(v4) => v4.octets().hash(&mut hasher),
            IpAddr::V6(v6) => v6.octets().hash(&mut hasher),
        }
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() as usize) % self.slots.len();
        Some(index)
    }

    /// Current occupant of a slot
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<Bucket> {
        self.slots.get(slot)?.load().as_deref().copied()
    }

    /// Current occupant of the slot `ip` hashes to
    #[must_use]
    pub fn lookup(&self, ip: IpAddr) -> Option<Bucket> {
        self.get(self.index_for(ip)?)
    }

    /// Install or overwrite the occupant of a slot
    ///
    /// Only the update actor calls this. Out-of-range slots are ignored.
    pub(crate) fn set(&self, slot: usize, bucket: Bucket) {
        if let Some(cell) = self.slots.get(slot) {
            cell.store(Some(Arc::new(bucket)));
        }
    }

    /// Empty every slot
    ///
    /// Only the update actor calls this.
    pub(crate) fn clear(&self) {
        for cell in &*self.slots {
            cell.store(None);
        }
    }

    /// Number of occupied slots (linear scan, diagnostics only)
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|cell| cell.load().is_some()).count()
    }
}

impl std::fmt::Debug for BucketTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketTable")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
