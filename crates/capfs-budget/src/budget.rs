//! CapacityBudget: fixed limit + cached running total.
//!
//! The total lives behind a reader/writer lock that is only held for the
//! arithmetic, never across store I/O.

use std::sync::{PoisonError, RwLock};

use capfs_core::budget::Capacity;

use crate::tracking::PeakTracker;

pub struct CapacityBudget {
    limit: i64,
    current: RwLock<i64>,
    peak: PeakTracker,
}

impl CapacityBudget {
    /// Budget with `limit` bytes, seeded with an already-measured `current`.
    pub fn new(limit: i64, current: i64) -> Self {
        let peak = PeakTracker::new();
        peak.record_used(current);
        Self {
            limit,
            current: RwLock::new(current),
            peak,
        }
    }

    /// Replace the cached total, e.g. after a rescan.
    pub fn reset(&self, current: i64) {
        let mut cur = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *cur = current;
        self.peak.record_used(current);
    }

    /// Highest cached total observed so far.
    pub fn peak(&self) -> i64 {
        self.peak.peak()
    }
}

impl Capacity for CapacityBudget {
    fn has_capacity(&self, n: i64) -> bool {
        let cur = self.current.read().unwrap_or_else(PoisonError::into_inner);
        n.saturating_add(*cur) <= self.limit
    }

    fn adjust(&self, delta: i64) {
        if delta == 0 {
            return;
        }
        let mut cur = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *cur = cur.saturating_add(delta);
        self.peak.record_used(*cur);
        #[cfg(feature = "tracing")]
        tracing::trace!(delta, used = *cur, limit = self.limit, "capacity adjusted");
    }

    fn try_reserve(&self, n: i64) -> bool {
        let mut cur = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = cur.saturating_add(n);
        if next > self.limit {
            return false;
        }
        *cur = next;
        self.peak.record_used(next);
        true
    }

    fn used(&self) -> i64 {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn limit(&self) -> i64 {
        self.limit
    }
}

impl std::fmt::Debug for CapacityBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityBudget")
            .field("limit", &self.limit)
            .field("used", &self.used())
            .finish()
    }
}
