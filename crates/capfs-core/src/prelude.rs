//! Convenient re-exports for downstream crates.

pub use crate::budget::Capacity;
pub use crate::config::CapacityConfig;
pub use crate::error::{Error, Result};
pub use crate::fs::{Fs, FsFile, IoFile, Metadata, OpenOptions};
