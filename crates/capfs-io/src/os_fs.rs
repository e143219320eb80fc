use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use capfs_core::error::Result;
use capfs_core::fs::{Fs, FsFile, Metadata, OpenOptions};
use capfs_core::path;

/// Host directory store (rooted at `root`; every path is resolved under it).
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    /// Root the store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, p: &str) -> PathBuf {
        let mut out = self.root.clone();
        out.extend(path::components(p));
        out
    }
}

fn metadata_of(meta: &fs::Metadata) -> Metadata {
    Metadata {
        len: meta.len(),
        // a symlink metadata reports is_dir() == false
        is_dir: meta.is_dir(),
    }
}

impl Fs for OsFs {
    fn name(&self) -> String {
        "OsFs".to_string()
    }

    /// Symlinks below the root are reported as themselves, never followed.
    fn stat(&self, p: &str) -> Result<Metadata> {
        let target = self.resolve(p);
        let meta = if path::is_root(p) {
            fs::metadata(target)?
        } else {
            fs::symlink_metadata(target)?
        };
        Ok(metadata_of(&meta))
    }

    fn read_dir(&self, p: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(p))? {
            let name = entry?.file_name().into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name is not valid UTF-8: {name:?}"),
                )
            })?;
            names.push(name);
        }
        Ok(names)
    }

    fn create(&self, p: &str) -> Result<Box<dyn FsFile>> {
        self.open_file(p, &OpenOptions::create_truncate(), 0o666)
    }

    fn open(&self, p: &str) -> Result<Box<dyn FsFile>> {
        self.open_file(p, &OpenOptions::new().read(true), 0)
    }

    fn open_file(&self, p: &str, opts: &OpenOptions, mode: u32) -> Result<Box<dyn FsFile>> {
        let mut std_opts = fs::OpenOptions::new();
        std_opts
            .read(opts.read || !(opts.write || opts.append))
            .write(opts.write)
            .append(opts.append)
            .truncate(opts.truncate)
            .create(opts.create)
            .create_new(opts.create_new);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            if mode != 0 {
                std_opts.mode(mode);
            }
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = std_opts.open(self.resolve(p))?;
        Ok(Box::new(OsFile {
            name: p.to_string(),
            file,
        }))
    }

    fn mkdir(&self, p: &str, mode: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(self.resolve(p))?;
        Ok(())
    }

    fn mkdir_all(&self, p: &str, mode: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(self.resolve(p))?;
        Ok(())
    }

    fn remove(&self, p: &str) -> Result<()> {
        if path::is_root(p) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "cannot remove root").into());
        }
        let target = self.resolve(p);
        if fs::symlink_metadata(&target)?.is_dir() {
            fs::remove_dir(target)?;
        } else {
            fs::remove_file(target)?;
        }
        Ok(())
    }

    /// On the root, clears its contents and keeps the directory.
    fn remove_all(&self, p: &str) -> Result<()> {
        if path::is_root(p) {
            for name in self.read_dir(p)? {
                self.remove_all(&name)?;
            }
            return Ok(());
        }
        let target = self.resolve(p);
        let meta = match fs::symlink_metadata(&target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            fs::remove_dir_all(target)?;
        } else {
            fs::remove_file(target)?;
        }
        Ok(())
    }
}

/// Handle onto one host file.
pub struct OsFile {
    name: String,
    file: File,
}

impl OsFile {
    /// Run `f` at `offset`, then restore the cursor.
    fn at<T>(&mut self, offset: u64, f: impl FnOnce(&mut File) -> io::Result<T>) -> Result<T> {
        let pos = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(offset))?;
        let out = f(&mut self.file);
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(out?)
    }
}

impl FsFile for OsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.at(offset, |f| f.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.file.write(buf)?)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.at(offset, |f| f.write(buf))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file.seek(pos)?)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        Ok(self.file.set_len(size)?)
    }

    fn stat(&self) -> Result<Metadata> {
        Ok(metadata_of(&self.file.metadata()?))
    }

    fn sync(&mut self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
