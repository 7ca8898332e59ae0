//! wal — write-ahead log `<path>.log`.
//!
//! ```text
//! file  := [xchecksum i32][entry]*
//! entry := [size u32][checksum i32][payload; size]
//! ```
//!
//! Submodules:
//! - encode.rs — entry framing and the checksum fold.
//! - reader.rs — parsing one entry at a position, whole-file scan.
//! - writer.rs — `FileLogger`: append + checksum fence, sequential read, tail repair on open.
//! - record.rs — the two record shapes carried in entry payloads (insert, update).
//! - replay.rs — crash recovery driven by the log.
//!
//! Integers are big-endian. `xchecksum` folds every framed entry (header and payload) in file
//! order; it is rewritten and fsynced after each append, which makes it the durability fence.

use anyhow::Result;

pub mod encode;
pub mod reader;
pub mod record;
pub mod replay;
pub mod writer;

pub use encode::{fold, wrap_entry};
pub use reader::{scan_file, LogScan};
pub use record::LogRecord;
pub use replay::{recover, RecoveryStats};
pub use writer::FileLogger;

/// Append-only log as seen by the data manager and recovery.
pub trait Logger: Send + Sync {
    /// Append one entry and fence it; returns once both are on disk.
    fn log(&self, data: &[u8]) -> Result<()>;

    /// Payload of the next entry from the read cursor, `None` at the end.
    fn next(&self) -> Result<Option<Vec<u8>>>;

    /// Move the read cursor back to the first entry.
    fn rewind(&self) -> Result<()>;

    /// Cut the file to `len` bytes.
    fn truncate(&self, len: u64) -> Result<()>;

    fn close(&self) -> Result<()>;
}
