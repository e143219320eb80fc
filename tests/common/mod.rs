//! Fault-injecting store shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use capfs::{Fs, FsFile, MemFs, Metadata, OpenOptions, Result};

#[derive(Default, Clone)]
pub struct Faults {
    /// `stat` of this exact path fails with `UnexpectedEof`.
    pub fail_stat: Option<String>,
    /// `stat` of this exact path reports 99999 bytes.
    pub oversized: Option<String>,
    /// create/open/open_file/mkdir/mkdir_all fail.
    pub fail_create: bool,
    /// remove/remove_all fail.
    pub fail_remove: bool,
    pub name: Option<String>,
}

/// A `MemFs` whose behavior can be broken on demand, even while wrapped.
pub struct FaultyFs {
    pub mem: Arc<MemFs>,
    faults: Mutex<Faults>,
}

fn eof() -> capfs::Error {
    io::Error::from(io::ErrorKind::UnexpectedEof).into()
}

impl FaultyFs {
    pub fn new(mem: Arc<MemFs>) -> Arc<Self> {
        Arc::new(Self {
            mem,
            faults: Mutex::new(Faults::default()),
        })
    }

    pub fn set(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }

    pub fn clear(&self) {
        self.set(Faults::default());
    }

    fn faults(&self) -> Faults {
        self.faults.lock().unwrap().clone()
    }
}

impl Fs for FaultyFs {
    fn name(&self) -> String {
        self.faults().name.unwrap_or_else(|| self.mem.name())
    }

    fn stat(&self, p: &str) -> Result<Metadata> {
        let faults = self.faults();
        if faults.fail_stat.as_deref() == Some(p) {
            return Err(eof());
        }
        let meta = self.mem.stat(p)?;
        if faults.oversized.as_deref() == Some(p) {
            return Ok(Metadata { len: 99999, ..meta });
        }
        Ok(meta)
    }

    fn read_dir(&self, p: &str) -> Result<Vec<String>> {
        self.mem.read_dir(p)
    }

    fn create(&self, p: &str) -> Result<Box<dyn FsFile>> {
        if self.faults().fail_create {
            return Err(eof());
        }
        self.mem.create(p)
    }

    fn open(&self, p: &str) -> Result<Box<dyn FsFile>> {
        if self.faults().fail_create {
            return Err(eof());
        }
        self.mem.open(p)
    }

    fn open_file(&self, p: &str, opts: &OpenOptions, mode: u32) -> Result<Box<dyn FsFile>> {
        if self.faults().fail_create {
            return Err(eof());
        }
        self.mem.open_file(p, opts, mode)
    }

    fn mkdir(&self, p: &str, mode: u32) -> Result<()> {
        if self.faults().fail_create {
            return Err(eof());
        }
        self.mem.mkdir(p, mode)
    }

    fn mkdir_all(&self, p: &str, mode: u32) -> Result<()> {
        if self.faults().fail_create {
            return Err(eof());
        }
        self.mem.mkdir_all(p, mode)
    }

    fn remove(&self, p: &str) -> Result<()> {
        if self.faults().fail_remove {
            return Err(eof());
        }
        self.mem.remove(p)
    }

    fn remove_all(&self, p: &str) -> Result<()> {
        if self.faults().fail_remove {
            return Err(eof());
        }
        self.mem.remove_all(p)
    }
}

pub fn is_eof(err: &capfs::Error) -> bool {
    err.io_kind() == Some(io::ErrorKind::UnexpectedEof)
}
