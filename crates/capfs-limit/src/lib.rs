#![forbid(unsafe_code)]
//! capfs-limit: enforce a fixed total-byte budget on a wrapped filesystem.
//!
//! `CapacityFs` decorates any `capfs_core::Fs`. It seeds its cached total with
//! a full scan (`scan::size_sum`), checks creations after the fact and rolls
//! them back on overflow, and hands out `LimitedFile` handles that check each
//! write against the same shared `CapacityBudget`.

pub mod file;
pub mod fs;
pub mod scan;

pub use file::{Accounting, LimitedFile};
pub use fs::{CapacityFs, CapacityFsBuilder};
pub use scan::size_sum;
