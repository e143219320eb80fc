//! Recursive size accounting.

use capfs_core::error::{Error, Result};
use capfs_core::fs::Fs;
use capfs_core::path;

fn traversal(path: &str, source: Error) -> Error {
    Error::Traversal {
        path: path.to_string(),
        source: Box::new(source),
    }
}

/// Sum the stated size of `root` and every entry below it.
///
/// `""` scans the whole store. The walk stops at the first listing or stat
/// failure and reports it as `Error::Traversal`; no partial sum is returned.
pub fn size_sum<F: Fs + ?Sized>(fs: &F, root: &str) -> Result<i64> {
    let mut total: i64 = 0;
    let mut _entries = 0usize;
    let mut pending = vec![root.to_string()];

    while let Some(current) = pending.pop() {
        let meta = fs.stat(&current).map_err(|e| traversal(&current, e))?;
        total = total.saturating_add(meta.size());
        _entries += 1;

        if meta.is_dir {
            let names = fs.read_dir(&current).map_err(|e| traversal(&current, e))?;
            pending.extend(names.iter().map(|name| path::join(&current, name)));
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(root, entries = _entries, total, "size scan complete");

    Ok(total)
}
