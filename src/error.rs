//! Typed failure kinds of the data manager.
//!
//! Public functions return `anyhow::Result`; kinds a caller has to tell apart are raised as
//! `DmError` and recovered with `err.downcast_ref::<DmError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DmError {
    /// Every cache slot is held and nothing can be evicted.
    #[error("cache is full")]
    CacheFull,

    /// No page with enough free space could be obtained within the retry bound.
    #[error("database busy: no page with free space after retries")]
    DatabaseBusy,

    #[error("data too large: record of {len} bytes exceeds page capacity {max}")]
    DataTooLarge { len: usize, max: usize },

    #[error("bad log file: {0}")]
    BadLogFile(String),

    #[error("bad xid file: {0}")]
    BadXidFile(String),

    #[error("page cache of {pages} pages is below the minimum of {min}")]
    CacheTooSmall { pages: usize, min: usize },

    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("file does not exist: {}", .0.display())]
    FileNotExists(PathBuf),

    /// `release` called more times than `get` for this key.
    #[error("release of key {key} without a matching get")]
    ReleaseUnderflow { key: u64 },

    #[error("bad record at uid {uid:#x}: {reason}")]
    BadRecord { uid: u64, reason: String },

    #[error("database files are locked by another handle: {}", .0.display())]
    Locked(PathBuf),

    #[error("data manager is closed")]
    Closed,
}

impl DmError {
    /// Resource exhaustion: the caller may back off and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CacheFull | Self::DatabaseBusy)
    }

    /// Startup must abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BadLogFile(_) | Self::BadXidFile(_) | Self::CacheTooSmall { .. }
        )
    }
}

/// Find a `DmError` anywhere in an anyhow chain.
pub fn kind_of(err: &anyhow::Error) -> Option<&DmError> {
    err.chain().find_map(|e| e.downcast_ref::<DmError>())
}
