//! Capability set required from a wrapped filesystem.
//!
//! Both traits are object-safe. Decorators hold a `dyn Fs` / `dyn FsFile` and
//! implement the same trait, forwarding whatever they don't override.

use std::io::{self, SeekFrom};

use crate::error::Result;

/// Stat result reported by a store for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Declared size in bytes. Directories report their own overhead.
    pub len: u64,
    pub is_dir: bool,
}

impl Metadata {
    pub fn file(len: u64) -> Self {
        Self { len, is_dir: false }
    }

    pub fn dir(len: u64) -> Self {
        Self { len, is_dir: true }
    }

    /// Size as a signed byte count for budget arithmetic.
    pub fn size(&self) -> i64 {
        i64::try_from(self.len).unwrap_or(i64::MAX)
    }
}

/// Flags for `Fs::open_file`, shaped like `std::fs::OpenOptions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, yes: bool) -> Self {
        self.read = yes;
        self
    }

    pub fn write(mut self, yes: bool) -> Self {
        self.write = yes;
        self
    }

    pub fn append(mut self, yes: bool) -> Self {
        self.append = yes;
        self
    }

    pub fn truncate(mut self, yes: bool) -> Self {
        self.truncate = yes;
        self
    }

    pub fn create(mut self, yes: bool) -> Self {
        self.create = yes;
        self
    }

    pub fn create_new(mut self, yes: bool) -> Self {
        self.create_new = yes;
        self
    }

    /// Read-write without creating or truncating.
    pub fn read_write() -> Self {
        Self::new().read(true).write(true)
    }

    /// The flags `Fs::create` implies.
    pub fn create_truncate() -> Self {
        Self::read_write().create(true).truncate(true)
    }
}

/// One open file of a wrapped store.
pub trait FsFile: Send {
    /// Path this handle was opened with.
    fn name(&self) -> &str;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize>;

    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize>;

    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    fn truncate(&mut self, size: u64) -> Result<()>;

    fn stat(&self) -> Result<Metadata>;

    fn sync(&mut self) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

impl FsFile for Box<dyn FsFile> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        (**self).read_at(buf, offset)
    }
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        (**self).write_at(buf, offset)
    }
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }
    fn truncate(&mut self, size: u64) -> Result<()> {
        (**self).truncate(size)
    }
    fn stat(&self) -> Result<Metadata> {
        (**self).stat()
    }
    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
    fn close(self: Box<Self>) -> Result<()> {
        let inner: Box<dyn FsFile> = *self;
        inner.close()
    }
}

/// A hierarchical store. Paths are `/`-separated; `""` and `"/"` name the root.
pub trait Fs: Send + Sync {
    fn name(&self) -> String;

    fn stat(&self, path: &str) -> Result<Metadata>;

    /// Names (not paths) of the direct children of a directory.
    fn read_dir(&self, path: &str) -> Result<Vec<String>>;

    /// Create or truncate a file, opened read-write.
    fn create(&self, path: &str) -> Result<Box<dyn FsFile>>;

    fn open(&self, path: &str) -> Result<Box<dyn FsFile>>;

    fn open_file(&self, path: &str, opts: &OpenOptions, mode: u32) -> Result<Box<dyn FsFile>>;

    fn mkdir(&self, path: &str, mode: u32) -> Result<()>;

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()>;

    /// Remove a file or an empty directory.
    fn remove(&self, path: &str) -> Result<()>;

    /// Remove a path and all of its children. Missing paths are not an error.
    fn remove_all(&self, path: &str) -> Result<()>;
}

/// Adapter exposing an `FsFile` through the `std::io` traits.
pub struct IoFile<F: FsFile>(pub F);

impl<F: FsFile> IoFile<F> {
    pub fn into_inner(self) -> F {
        self.0
    }
}

impl<F: FsFile> io::Read for IoFile<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(Into::into)
    }
}

impl<F: FsFile> io::Write for IoFile<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.sync().map_err(Into::into)
    }
}

impl<F: FsFile> io::Seek for IoFile<F> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_options_presets() {
        let opts = OpenOptions::create_truncate();
        assert!(opts.read && opts.write && opts.create && opts.truncate);
        assert!(!opts.append && !opts.create_new);
        assert_eq!(OpenOptions::read_write(), OpenOptions::new().read(true).write(true));
    }

    #[test]
    fn metadata_size_saturates() {
        assert_eq!(Metadata::file(u64::MAX).size(), i64::MAX);
        assert_eq!(Metadata::dir(4096).size(), 4096);
    }
}
