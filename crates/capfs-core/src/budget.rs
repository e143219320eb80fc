//! Abstract capacity interface.
//!
//! The concrete implementation lives in `capfs-budget`. File handles only see
//! this trait, so a handle can be bound to any accounting source.

/// A byte budget shared by a filesystem decorator and every handle it opens.
///
/// `has_capacity` followed by `adjust` is *not* atomic: two callers can both
/// pass the check and both adjust, overshooting the limit. Use `try_reserve`
/// when the overshoot window matters.
pub trait Capacity: Send + Sync {
    /// `n + used() <= limit()`. No mutation.
    fn has_capacity(&self, n: i64) -> bool;

    /// `used += delta`. Negative deltas free space. No range validation.
    fn adjust(&self, delta: i64);

    /// Check and charge `n` bytes in one step. Returns false, charging nothing,
    /// when `n` does not fit.
    fn try_reserve(&self, n: i64) -> bool;

    /// Cached total of occupied bytes.
    fn used(&self) -> i64;

    /// Configured maximum.
    fn limit(&self) -> i64;

    /// Bytes left before the limit, never negative.
    fn available(&self) -> i64 {
        self.limit().saturating_sub(self.used()).max(0)
    }
}
