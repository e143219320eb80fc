#![forbid(unsafe_code)]
//! capfs-core: shared vocabulary for the capacity-limited filesystem.
//!
//! This crate only defines *interfaces*: the capability set a wrapped store
//! must provide (`fs`), the capacity accounting API (`budget`), path helpers,
//! configuration, and the error taxonomy. Concrete budgets live in
//! `capfs-budget`, concrete stores in `capfs-io`, and the decorator itself in
//! `capfs-limit`.

pub mod budget;
pub mod config;
pub mod error;
pub mod fs;
pub mod path;
pub mod prelude;

pub use budget::Capacity;
pub use config::CapacityConfig;
pub use error::{Error, Result};
pub use fs::{Fs, FsFile, IoFile, Metadata, OpenOptions};
