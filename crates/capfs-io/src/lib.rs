#![forbid(unsafe_code)]
//! capfs-io: concrete implementations of `capfs_core::Fs`.
//!
//! - `MemFs`: in-memory tree, used for tests and `memory://` configs.
//! - `OsFs`: host directory rooted at a base path.
//!
//! Also exposes `build_fs_from_config`, which picks a backend from the
//! configured URI scheme (`memory://`, `file:///srv/data`, bare path).

pub mod memory_fs;
pub mod os_fs;

pub use memory_fs::{MemFs, DEFAULT_DIR_SIZE};
pub use os_fs::OsFs;

use std::sync::Arc;

use capfs_core::config::CapacityConfig;
use capfs_core::error::{Error, Result};
use capfs_core::fs::Fs;

/// Build the correct store using the provided configuration.
pub fn build_fs_from_config(cfg: &CapacityConfig) -> Result<Arc<dyn Fs>> {
    match cfg.scheme() {
        Some("memory") | Some("mem") => Ok(Arc::new(MemFs::with_dir_size(cfg.dir_size))),
        Some("file") | None => Ok(Arc::new(OsFs::open(cfg.backend_root())?)),
        Some(other) => Err(Error::Config(format!("unsupported backend scheme '{other}'"))),
    }
}
