#![forbid(unsafe_code)]
//! capfs: a filesystem decorator that enforces a fixed total-byte budget.
//!
//! ```no_run
//! use std::sync::Arc;
//! use capfs::prelude::*;
//!
//! let store = Arc::new(MemFs::new());
//! let fs = CapacityFs::new(store, 64 * 1024)?;
//! let mut f = fs.create("notes.txt")?;
//! f.write_all(b"hello")?;
//! assert!(fs.used() <= fs.limit());
//! # Ok::<(), capfs::Error>(())
//! ```

pub use capfs_budget::{CapacityBudget, PeakTracker};
pub use capfs_core::{path, Capacity, CapacityConfig, Error, Fs, FsFile, IoFile, Metadata, OpenOptions, Result};
pub use capfs_io::{build_fs_from_config, MemFs, OsFs};
pub use capfs_limit::{size_sum, Accounting, CapacityFs, CapacityFsBuilder, LimitedFile};

/// Build the configured store and wrap it in a `CapacityFs`.
pub fn open_from_config(cfg: &CapacityConfig) -> Result<CapacityFs> {
    cfg.validate()?;
    let inner = build_fs_from_config(cfg)?;
    CapacityFsBuilder::from_config(cfg).inner(inner).build()
}

pub mod prelude {
    pub use capfs_core::prelude::*;
    pub use capfs_io::{MemFs, OsFs};
    pub use capfs_limit::{Accounting, CapacityFs, CapacityFsBuilder, LimitedFile};
}
