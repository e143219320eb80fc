//! File handle that charges writes against a shared capacity.

use std::io::SeekFrom;
use std::sync::Arc;

use capfs_core::budget::Capacity;
use capfs_core::error::{Error, Result};
use capfs_core::fs::{FsFile, Metadata};

/// How writes and truncates are settled against the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Accounting {
    /// Charge the file's real growth: size after minus size before.
    #[default]
    Exact,
    /// Charge every byte written, even over existing bytes, and subtract the
    /// new length on truncate.
    Legacy,
}

impl Accounting {
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            Accounting::Exact
        } else {
            Accounting::Legacy
        }
    }
}

pub(crate) fn exceeded(capacity: &dyn Capacity, requested: i64) -> Error {
    Error::CapacityExceeded {
        requested,
        used: capacity.used(),
        limit: capacity.limit(),
    }
}

/// Wraps one open file of the underlying store.
///
/// Reads, seeks, sync and close are forwarded untouched.
pub struct LimitedFile {
    inner: Box<dyn FsFile>,
    capacity: Arc<dyn Capacity>,
    accounting: Accounting,
}

impl LimitedFile {
    pub fn new(inner: Box<dyn FsFile>, capacity: Arc<dyn Capacity>) -> Self {
        Self::with_accounting(inner, capacity, Accounting::default())
    }

    pub fn with_accounting(
        inner: Box<dyn FsFile>,
        capacity: Arc<dyn Capacity>,
        accounting: Accounting,
    ) -> Self {
        Self {
            inner,
            capacity,
            accounting,
        }
    }

    pub fn accounting(&self) -> Accounting {
        self.accounting
    }

    /// Swap the wrapped handle, returning the previous one.
    pub fn replace_inner(&mut self, inner: Box<dyn FsFile>) -> Box<dyn FsFile> {
        std::mem::replace(&mut self.inner, inner)
    }

    pub fn into_inner(self) -> Box<dyn FsFile> {
        self.inner
    }

    fn size_now(&self) -> Option<i64> {
        match self.accounting {
            Accounting::Exact => self.inner.stat().ok().map(|m| m.size()),
            Accounting::Legacy => None,
        }
    }

    /// Bytes to reserve before writing `len` bytes at `offset`.
    ///
    /// Exact mode covers the whole growth a write past end-of-file causes,
    /// never less than `len`. Legacy mode reserves `len`.
    fn reservation(&mut self, len: i64, offset: Option<u64>, before: Option<i64>) -> i64 {
        let Some(before) = before else {
            return len;
        };
        let offset = match offset {
            Some(offset) => Some(offset),
            None => self.inner.seek(SeekFrom::Current(0)).ok(),
        };
        match offset.and_then(|o| i64::try_from(o).ok()) {
            Some(offset) => len.max(offset.saturating_add(len).saturating_sub(before)),
            None => len,
        }
    }

    /// Reserve what the write may grow the file by, run it, then settle the
    /// reservation to what the file actually grew by.
    fn charged_write(
        &mut self,
        buf: &[u8],
        offset: Option<u64>,
        write: impl FnOnce(&mut dyn FsFile, &[u8]) -> Result<usize>,
    ) -> Result<usize> {
        let len = i64::try_from(buf.len()).unwrap_or(i64::MAX);
        let before = self.size_now();
        let requested = self.reservation(len, offset, before);
        if !self.capacity.try_reserve(requested) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                file = self.inner.name(),
                requested,
                used = self.capacity.used(),
                limit = self.capacity.limit(),
                "write rejected: not enough capacity"
            );
            return Err(exceeded(self.capacity.as_ref(), requested));
        }

        let result = write(self.inner.as_mut(), buf);
        let written = result.as_ref().map_or(0, |n| *n as i64);
        let charged = match (before, self.size_now()) {
            (Some(before), Some(after)) => after - before,
            _ => written,
        };
        self.capacity.adjust(charged - requested);
        result
    }
}

impl FsFile for LimitedFile {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.inner.read_at(buf, offset)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.charged_write(buf, None, |f, b| f.write(b))
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.charged_write(buf, Some(offset), |f, b| f.write_at(b, offset))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.seek(pos)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let new_size = i64::try_from(size).unwrap_or(i64::MAX);
        match self.accounting {
            Accounting::Legacy => {
                self.inner.truncate(size)?;
                self.capacity.adjust(-new_size);
                Ok(())
            }
            Accounting::Exact => {
                let old_size = self.inner.stat()?.size();
                let growth = new_size - old_size;
                if growth > 0 && !self.capacity.try_reserve(growth) {
                    return Err(exceeded(self.capacity.as_ref(), growth));
                }
                if let Err(e) = self.inner.truncate(size) {
                    if growth > 0 {
                        self.capacity.adjust(-growth);
                    }
                    return Err(e);
                }
                if growth < 0 {
                    self.capacity.adjust(growth);
                }
                Ok(())
            }
        }
    }

    fn stat(&self) -> Result<Metadata> {
        self.inner.stat()
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.inner.close()
    }
}
