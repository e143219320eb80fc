//! Lightweight high-water-mark tracking for the cached total.
//!
//! Keep this optional and cheap. Downstream can wire it to metrics if desired.

use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Default)]
pub struct PeakTracker {
    peak_bytes: AtomicI64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            peak_bytes: AtomicI64::new(0),
        }
    }

    /// Record a new "used bytes" value; updates peak if higher.
    pub fn record_used(&self, used_bytes: i64) {
        self.peak_bytes.fetch_max(used_bytes, Ordering::AcqRel);
    }

    pub fn peak(&self) -> i64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }
}
