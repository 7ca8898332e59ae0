//! File-based locking for single-writer safety.
//!
//! Cross-platform (fs2) advisory lock held on the heap file `<path>.db` for the lifetime of a
//! `DataManager`. A second handle on the same files fails fast with `DmError::Locked` instead of
//! blocking. The lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::DmError;

pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Unlock errors on drop are ignored.
        let _ = self.file.unlock();
    }
}

/// Try to take the exclusive lock on `target` (which must exist). Never blocks.
pub fn try_lock_exclusive(target: &Path) -> Result<LockGuard> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(target)
        .with_context(|| format!("open lock target {}", target.display()))?;
    if file.try_lock_exclusive().is_err() {
        return Err(DmError::Locked(target.to_path_buf()).into());
    }
    Ok(LockGuard {
        file,
        path: target.to_path_buf(),
    })
}
