//! CapacityFs: the budgeted decorator over a whole store.
//!
//! The wrapped store has no "create only if it fits" primitive, so creations
//! run check-after-do: perform the underlying call, stat the result, reserve
//! its size, and remove the entry again if the reservation fails. Removals
//! measure first (recursively for directories) and release after success.

use std::sync::Arc;

use capfs_budget::CapacityBudget;
use capfs_core::budget::Capacity;
use capfs_core::config::CapacityConfig;
use capfs_core::error::{Error, Result};
use capfs_core::fs::{Fs, FsFile, Metadata, OpenOptions};
use capfs_core::path;

use crate::file::{exceeded, Accounting, LimitedFile};
use crate::scan;

/// Builder for `CapacityFs`. Validates configuration and seeds the budget.
#[derive(Default)]
pub struct CapacityFsBuilder {
    inner: Option<Arc<dyn Fs>>,
    limit: i64,
    accounting: Accounting,
}

impl CapacityFsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit and accounting mode taken from a config.
    pub fn from_config(cfg: &CapacityConfig) -> Self {
        Self::new()
            .limit(cfg.limit_bytes)
            .accounting(Accounting::from_exact(cfg.exact_accounting))
    }

    pub fn inner(mut self, inner: Arc<dyn Fs>) -> Self {
        self.inner = Some(inner);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn accounting(mut self, accounting: Accounting) -> Self {
        self.accounting = accounting;
        self
    }

    /// Scan the wrapped store and produce the decorator.
    ///
    /// Fails with `Config` for a missing store or negative limit, `Traversal`
    /// if the scan fails, and `CapacityExceeded` if the store is already over
    /// the limit.
    pub fn build(self) -> Result<CapacityFs> {
        let inner = self
            .inner
            .ok_or_else(|| Error::Config("no wrapped filesystem".into()))?;
        if self.limit < 0 {
            return Err(Error::Config(format!(
                "limit must be non-negative, got {}",
                self.limit
            )));
        }

        let used = scan::size_sum(inner.as_ref(), "")?;
        if used > self.limit {
            return Err(Error::CapacityExceeded {
                requested: used,
                used: 0,
                limit: self.limit,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            inner = %inner.name(),
            limit = self.limit,
            used,
            accounting = ?self.accounting,
            "capacity filesystem ready"
        );

        Ok(CapacityFs {
            inner,
            budget: Arc::new(CapacityBudget::new(self.limit, used)),
            accounting: self.accounting,
        })
    }
}

/// A store whose aggregate size may never exceed a fixed limit.
pub struct CapacityFs {
    inner: Arc<dyn Fs>,
    budget: Arc<CapacityBudget>,
    accounting: Accounting,
}

impl CapacityFs {
    /// Wrap `inner` with a `limit`-byte budget, using exact accounting.
    pub fn new(inner: Arc<dyn Fs>, limit: i64) -> Result<Self> {
        CapacityFsBuilder::new().inner(inner).limit(limit).build()
    }

    pub fn builder() -> CapacityFsBuilder {
        CapacityFsBuilder::new()
    }

    pub fn inner(&self) -> &Arc<dyn Fs> {
        &self.inner
    }

    pub fn accounting(&self) -> Accounting {
        self.accounting
    }

    /// Cached total of occupied bytes.
    pub fn used(&self) -> i64 {
        self.budget.used()
    }

    pub fn limit(&self) -> i64 {
        self.budget.limit()
    }

    pub fn available(&self) -> i64 {
        self.budget.available()
    }

    /// Highest cached total seen since construction.
    pub fn peak(&self) -> i64 {
        self.budget.peak()
    }

    /// Rescan the whole store and replace the cached total with the result.
    ///
    /// Picks up entries leaked by a failed compensating delete or changed
    /// behind the decorator's back. On error the cache is left as it was.
    pub fn resync(&self) -> Result<i64> {
        let used = scan::size_sum(self.inner.as_ref(), "")?;
        #[cfg(feature = "tracing")]
        tracing::debug!(cached = self.budget.used(), scanned = used, "capacity resync");
        self.budget.reset(used);
        Ok(used)
    }

    fn wrap(&self, file: Box<dyn FsFile>) -> Box<dyn FsFile> {
        let capacity: Arc<dyn Capacity> = self.budget.clone();
        Box::new(LimitedFile::with_accounting(file, capacity, self.accounting))
    }

    /// Size of an existing file at `p`, if there is one.
    fn existing_file_size(&self, p: &str) -> Option<i64> {
        match self.inner.stat(p) {
            Ok(meta) if !meta.is_dir => Some(meta.size()),
            _ => None,
        }
    }

    /// Best-effort removal of an entry that must not survive. Failures are
    /// dropped; the orphan is left uncounted.
    fn compensate(&self, p: &str) {
        match self.inner.remove(p) {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = p, "rolled back over-capacity entry");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(path = p, error = %_e, "compensating delete failed; entry left uncounted");
            }
        }
    }

    /// Stat a freshly created entry and reserve its size. The caller rolls
    /// the creation back on error.
    fn charge_new(&self, p: &str, _op: &'static str) -> Result<()> {
        let size = self.inner.stat(p)?.size();
        if self.budget.try_reserve(size) {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            op = _op,
            path = p,
            requested = size,
            used = self.budget.used(),
            limit = self.budget.limit(),
            "rejected: not enough capacity"
        );

        Err(exceeded(self.budget.as_ref(), size))
    }

    /// Bytes that removing `p` will free: a file's size, or the full
    /// recursive size of a directory. Missing paths free nothing. The root
    /// itself survives removal, so only its contents are counted.
    fn size_to_free(&self, p: &str) -> Result<i64> {
        match self.inner.stat(p) {
            Ok(meta) if meta.is_dir && path::is_root(p) => {
                Ok(scan::size_sum(self.inner.as_ref(), p)? - meta.size())
            }
            Ok(meta) if meta.is_dir => scan::size_sum(self.inner.as_ref(), p),
            Ok(meta) => Ok(meta.size()),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn remove_with(&self, p: &str, remove: impl FnOnce(&dyn Fs, &str) -> Result<()>) -> Result<()> {
        let freed = self.size_to_free(p)?;
        remove(self.inner.as_ref(), p)?;
        self.budget.adjust(-freed);
        Ok(())
    }
}

impl Fs for CapacityFs {
    fn name(&self) -> String {
        format!("capacityFs {} - {}", self.budget.limit(), self.inner.name())
    }

    fn stat(&self, p: &str) -> Result<Metadata> {
        self.inner.stat(p)
    }

    fn read_dir(&self, p: &str) -> Result<Vec<String>> {
        self.inner.read_dir(p)
    }

    fn create(&self, p: &str) -> Result<Box<dyn FsFile>> {
        let previous = self.existing_file_size(p);
        let file = self.inner.create(p)?;
        // create truncated whatever was there
        if let Some(previous) = previous {
            self.budget.adjust(-previous);
        }
        match self.charge_new(p, "create") {
            Ok(()) => Ok(self.wrap(file)),
            Err(e) => {
                drop(file);
                self.compensate(p);
                Err(e)
            }
        }
    }

    fn open(&self, p: &str) -> Result<Box<dyn FsFile>> {
        Ok(self.wrap(self.inner.open(p)?))
    }

    /// Opening never checks capacity. Entries created or truncated by the
    /// flags are still reflected in the cached total.
    fn open_file(&self, p: &str, opts: &OpenOptions, mode: u32) -> Result<Box<dyn FsFile>> {
        let previous = if opts.create || opts.create_new || opts.truncate {
            self.inner.stat(p).ok()
        } else {
            None
        };
        let file = self.inner.open_file(p, opts, mode)?;

        match previous {
            Some(meta) if !meta.is_dir && opts.truncate && (opts.write || opts.append) => {
                self.budget.adjust(-meta.size());
            }
            None if opts.create || opts.create_new => {
                if let Ok(meta) = file.stat() {
                    self.budget.adjust(meta.size());
                }
            }
            _ => {}
        }
        Ok(self.wrap(file))
    }

    fn mkdir(&self, p: &str, mode: u32) -> Result<()> {
        self.inner.mkdir(p, mode)?;
        self.charge_new(p, "mkdir").map_err(|e| {
            self.compensate(p);
            e
        })
    }

    /// Creates each missing prefix through `mkdir`, so every intermediate
    /// directory is charged and checked on its own.
    fn mkdir_all(&self, p: &str, mode: u32) -> Result<()> {
        for prefix in path::prefixes(p) {
            if self.inner.stat(&prefix).is_ok() {
                continue;
            }
            self.mkdir(&prefix, mode)?;
        }
        Ok(())
    }

    fn remove(&self, p: &str) -> Result<()> {
        self.remove_with(p, |fs, p| fs.remove(p))
    }

    fn remove_all(&self, p: &str) -> Result<()> {
        self.remove_with(p, |fs, p| fs.remove_all(p))
    }
}

impl std::fmt::Debug for CapacityFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityFs")
            .field("inner", &self.inner.name())
            .field("budget", &self.budget)
            .field("accounting", &self.accounting)
            .finish()
    }
}
