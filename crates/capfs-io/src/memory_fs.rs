//! In-memory store for tests and `memory://` configs.
//!
//! A map from normalized path to node. The root (`""`) always exists. File
//! contents are shared between the tree and every open handle, so a write
//! through a handle is visible to `stat` immediately.

use std::collections::BTreeMap;
use std::io::{self, SeekFrom};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use capfs_core::error::Result;
use capfs_core::fs::{Fs, FsFile, Metadata, OpenOptions};
use capfs_core::path;

/// Stated size of every directory unless configured otherwise.
pub const DEFAULT_DIR_SIZE: u64 = 4096;

type Data = Arc<Mutex<Vec<u8>>>;

#[derive(Clone)]
enum Node {
    Dir,
    File(Data),
}

/// Thread-safe in-memory tree.
#[derive(Clone)]
pub struct MemFs {
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
    dir_size: u64,
}

fn normalize(p: &str) -> String {
    path::components(p).collect::<Vec<_>>().join("/")
}

fn parent_of(p: &str) -> &str {
    p.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn lock(data: &Data) -> MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(PoisonError::into_inner)
}

fn err(kind: io::ErrorKind, msg: String) -> capfs_core::Error {
    io::Error::new(kind, msg).into()
}

fn not_found(p: &str) -> capfs_core::Error {
    err(io::ErrorKind::NotFound, format!("path not found: {p}"))
}

impl MemFs {
    pub fn new() -> Self {
        Self::with_dir_size(DEFAULT_DIR_SIZE)
    }

    pub fn with_dir_size(dir_size: u64) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::Dir);
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            dir_size,
        }
    }

    pub fn dir_size(&self) -> u64 {
        self.dir_size
    }

    /// Create or replace a file with `bytes` (used by tests).
    pub fn write_file(&self, p: &str, bytes: &[u8]) -> Result<()> {
        let mut f = self.create(p)?;
        f.write_all(bytes)?;
        f.close()
    }

    /// Whole contents of a file (used by tests).
    pub fn read_file(&self, p: &str) -> Result<Vec<u8>> {
        match self.read().get(&normalize(p)) {
            Some(Node::File(data)) => Ok(lock(data).clone()),
            Some(Node::Dir) => Err(err(io::ErrorKind::Other, format!("is a directory: {p}"))),
            None => Err(not_found(p)),
        }
    }

    /// Check if a path exists
    pub fn contains(&self, p: &str) -> bool {
        self.read().contains_key(&normalize(p))
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Node>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Node>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_parent(nodes: &BTreeMap<String, Node>, key: &str) -> Result<()> {
        match nodes.get(parent_of(key)) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(err(
                io::ErrorKind::Other,
                format!("parent is not a directory: {key}"),
            )),
            None => Err(not_found(parent_of(key))),
        }
    }

    fn has_children(nodes: &BTreeMap<String, Node>, key: &str) -> bool {
        let prefix = if key.is_empty() { String::new() } else { format!("{key}/") };
        nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .any(|(k, _)| !k.is_empty())
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Fs for MemFs {
    fn name(&self) -> String {
        "MemFs".to_string()
    }

    fn stat(&self, p: &str) -> Result<Metadata> {
        match self.read().get(&normalize(p)) {
            Some(Node::Dir) => Ok(Metadata::dir(self.dir_size)),
            Some(Node::File(data)) => Ok(Metadata::file(lock(data).len() as u64)),
            None => Err(not_found(p)),
        }
    }

    fn read_dir(&self, p: &str) -> Result<Vec<String>> {
        let key = normalize(p);
        let nodes = self.read();
        match nodes.get(&key) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(err(io::ErrorKind::Other, format!("not a directory: {p}")))
            }
            None => return Err(not_found(p)),
        }
        Ok(nodes
            .keys()
            .filter(|k| !k.is_empty() && parent_of(k) == key)
            .map(|k| k.rsplit('/').next().unwrap_or(k.as_str()).to_string())
            .collect())
    }

    fn create(&self, p: &str) -> Result<Box<dyn FsFile>> {
        self.open_file(p, &OpenOptions::create_truncate(), 0o666)
    }

    fn open(&self, p: &str) -> Result<Box<dyn FsFile>> {
        self.open_file(p, &OpenOptions::new().read(true), 0)
    }

    fn open_file(&self, p: &str, opts: &OpenOptions, _mode: u32) -> Result<Box<dyn FsFile>> {
        let key = normalize(p);
        let mut nodes = self.write();
        let data = match nodes.get(&key) {
            Some(Node::Dir) => {
                return Err(err(io::ErrorKind::Other, format!("is a directory: {p}")))
            }
            Some(Node::File(_)) if opts.create_new => {
                return Err(err(io::ErrorKind::AlreadyExists, format!("file exists: {p}")))
            }
            Some(Node::File(data)) => {
                if opts.truncate && (opts.write || opts.append) {
                    lock(data).clear();
                }
                Arc::clone(data)
            }
            None if opts.create || opts.create_new => {
                Self::check_parent(&nodes, &key)?;
                let data: Data = Arc::default();
                nodes.insert(key.clone(), Node::File(Arc::clone(&data)));
                data
            }
            None => return Err(not_found(p)),
        };
        Ok(Box::new(MemFile {
            name: p.to_string(),
            data,
            pos: 0,
            readable: opts.read || !(opts.write || opts.append),
            writable: opts.write || opts.append,
            append: opts.append,
        }))
    }

    fn mkdir(&self, p: &str, _mode: u32) -> Result<()> {
        let key = normalize(p);
        let mut nodes = self.write();
        if nodes.contains_key(&key) {
            return Err(err(io::ErrorKind::AlreadyExists, format!("file exists: {p}")));
        }
        Self::check_parent(&nodes, &key)?;
        nodes.insert(key, Node::Dir);
        Ok(())
    }

    fn mkdir_all(&self, p: &str, _mode: u32) -> Result<()> {
        let mut nodes = self.write();
        for prefix in path::prefixes(&normalize(p)) {
            match nodes.get(&prefix) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => {
                    return Err(err(
                        io::ErrorKind::Other,
                        format!("not a directory: {prefix}"),
                    ))
                }
                None => {
                    nodes.insert(prefix, Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn remove(&self, p: &str) -> Result<()> {
        let key = normalize(p);
        let mut nodes = self.write();
        if key.is_empty() {
            return Err(err(io::ErrorKind::PermissionDenied, "cannot remove root".into()));
        }
        match nodes.get(&key) {
            None => return Err(not_found(p)),
            Some(Node::Dir) if Self::has_children(&nodes, &key) => {
                return Err(err(
                    io::ErrorKind::Other,
                    format!("directory not empty: {p}"),
                ))
            }
            Some(_) => {}
        }
        nodes.remove(&key);
        Ok(())
    }

    fn remove_all(&self, p: &str) -> Result<()> {
        let key = normalize(p);
        let prefix = format!("{key}/");
        let mut nodes = self.write();
        nodes.retain(|k, _| {
            if key.is_empty() {
                k.is_empty()
            } else {
                k != &key && !k.starts_with(&prefix)
            }
        });
        Ok(())
    }
}

/// Handle onto one in-memory file.
pub struct MemFile {
    name: String,
    data: Data,
    pos: u64,
    readable: bool,
    writable: bool,
    append: bool,
}

impl MemFile {
    fn check_readable(&self) -> Result<()> {
        if self.readable {
            Ok(())
        } else {
            Err(err(
                io::ErrorKind::PermissionDenied,
                format!("file handle is write only: {}", self.name),
            ))
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(err(
                io::ErrorKind::PermissionDenied,
                format!("file handle is read only: {}", self.name),
            ))
        }
    }
}

fn read_into(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    if start >= data.len() {
        return 0;
    }
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

fn write_into(data: &mut Vec<u8>, buf: &[u8], offset: u64) -> Result<()> {
    let start = usize::try_from(offset)
        .map_err(|_| err(io::ErrorKind::InvalidInput, "offset too large".into()))?;
    let end = start + buf.len();
    if data.len() < end {
        data.resize(end, 0);
    }
    data[start..end].copy_from_slice(buf);
    Ok(())
}

impl FsFile for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_readable()?;
        let n = read_into(&lock(&self.data), buf, self.pos);
        self.pos += n as u64;
        Ok(n)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.check_readable()?;
        Ok(read_into(&lock(&self.data), buf, offset))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_writable()?;
        let mut data = lock(&self.data);
        if self.append {
            self.pos = data.len() as u64;
        }
        write_into(&mut data, buf, self.pos)?;
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.check_writable()?;
        write_into(&mut lock(&self.data), buf, offset)?;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = lock(&self.data).len() as i64;
        let next = match pos {
            SeekFrom::Start(off) => i64::try_from(off).unwrap_or(i64::MAX),
            SeekFrom::Current(delta) => (self.pos as i64).saturating_add(delta),
            SeekFrom::End(delta) => len.saturating_add(delta),
        };
        if next < 0 {
            return Err(err(io::ErrorKind::InvalidInput, "seek before start".into()));
        }
        self.pos = next as u64;
        Ok(self.pos)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.check_writable()?;
        let size = usize::try_from(size)
            .map_err(|_| err(io::ErrorKind::InvalidInput, "size too large".into()))?;
        lock(&self.data).resize(size, 0);
        Ok(())
    }

    fn stat(&self) -> Result<Metadata> {
        Ok(Metadata::file(lock(&self.data).len() as u64))
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
