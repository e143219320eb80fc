#![forbid(unsafe_code)]
//! capfs-budget: the shared byte budget behind a capacity-limited filesystem.
//!
//! Provides the concrete implementation of `capfs_core::Capacity`. One budget
//! is owned by each decorator and shared by reference with every file handle
//! it opens; nothing here performs I/O or returns errors.

pub mod budget;
pub mod tracking;

pub use budget::CapacityBudget;
pub use tracking::PeakTracker;
