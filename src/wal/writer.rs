//! wal/writer — `FileLogger`.
//!
//! Appends are serialised by one mutex covering the entry write, the header rewrite and the
//! fsync. On open the file is scanned and its tail repaired:
//!
//! 1. fold == header: accept; bytes past the last verified entry are cut off.
//! 2. fold != header after a torn entry: cut at the last verified entry, rewrite the header.
//! 3. fold != header, no torn entry, header == fold without the final entry: that entry was
//!    written but never fenced; cut it off.
//! 4. anything else: the header itself is damaged, `BadLogFile`.

use anyhow::{Context, Result};
use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::encode::{fold, wrap_entry};
use super::reader::{read_entry_at, scan, LogScan};
use super::Logger;
use crate::consts::WAL_HDR_SIZE;
use crate::error::DmError;
use crate::metrics::{record_wal_append, record_wal_fsync, record_wal_tail_truncation};

struct Inner {
    file: File,
    len: u64,
    xchecksum: i32,
    read_pos: u64,
}

pub struct FileLogger {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileLogger {
    /// Create an empty log (zero checksum header). Fails if the file exists.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(DmError::FileExists(path.to_path_buf()).into());
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("create log {}", path.display()))?;
        write_header(&mut file, 0)?;
        debug!("wal: created {}", path.display());
        Ok(Self::from_parts(path, file, WAL_HDR_SIZE, 0))
    }

    /// Open an existing log and repair its tail.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DmError::FileNotExists(path.to_path_buf()).into());
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open log {}", path.display()))?;
        let s = scan(&mut file, |_| {})?;
        let (len, xchecksum) = repair_tail(&mut file, path, &s)?;
        debug!(
            "wal: opened {} ({} bytes, {} entries)",
            path.display(),
            len,
            s.entries
        );
        Ok(Self::from_parts(path, file, len, xchecksum))
    }

    fn from_parts(path: &Path, file: File, len: u64, xchecksum: i32) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner {
                file,
                len,
                xchecksum,
                read_pos: WAL_HDR_SIZE,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length.
    pub fn len(&self) -> u64 {
        self.inner.lock().unwrap().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == WAL_HDR_SIZE
    }

    pub fn checksum(&self) -> i32 {
        self.inner.lock().unwrap().xchecksum
    }
}

fn write_header(file: &mut File, xchecksum: i32) -> Result<()> {
    let mut hdr = [0u8; WAL_HDR_SIZE as usize];
    BigEndian::write_i32(&mut hdr, xchecksum);
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&hdr)?;
    file.sync_data()?;
    record_wal_fsync();
    Ok(())
}

fn cut(file: &mut File, len: u64) -> Result<()> {
    file.set_len(len)?;
    file.sync_data()?;
    record_wal_fsync();
    record_wal_tail_truncation();
    Ok(())
}

/// Apply the tail policy; returns the accepted length and checksum.
fn repair_tail(file: &mut File, path: &Path, s: &LogScan) -> Result<(u64, i32)> {
    if s.checksum_ok() {
        if s.torn {
            warn!(
                "wal: {}: dropping {} unverifiable bytes after the last entry",
                path.display(),
                s.file_len - s.good_end
            );
            cut(file, s.good_end)?;
        }
        return Ok((s.good_end, s.accumulated));
    }
    if s.torn {
        warn!(
            "wal: {}: torn entry at {}, truncating {} -> {} bytes",
            path.display(),
            s.good_end,
            s.file_len,
            s.good_end
        );
        cut(file, s.good_end)?;
        write_header(file, s.accumulated)?;
        return Ok((s.good_end, s.accumulated));
    }
    if s.entries > 0 && s.before_last == s.stored {
        warn!(
            "wal: {}: final entry at {} was never fenced, dropping it",
            path.display(),
            s.last_start
        );
        cut(file, s.last_start)?;
        return Ok((s.last_start, s.before_last));
    }
    Err(DmError::BadLogFile(format!(
        "{}: stored checksum {:#010x} does not match entries ({:#010x})",
        path.display(),
        s.stored,
        s.accumulated
    ))
    .into())
}

impl Logger for FileLogger {
    fn log(&self, data: &[u8]) -> Result<()> {
        let entry = wrap_entry(data);
        let mut g = self.inner.lock().unwrap();
        let pos = g.len;
        g.file.seek(SeekFrom::Start(pos))?;
        g.file
            .write_all(&entry)
            .with_context(|| format!("append to {}", self.path.display()))?;
        let xchecksum = fold(g.xchecksum, &entry);
        write_header(&mut g.file, xchecksum)
            .with_context(|| format!("fence {}", self.path.display()))?;
        g.xchecksum = xchecksum;
        g.len = pos + entry.len() as u64;
        record_wal_append(entry.len());
        Ok(())
    }

    fn next(&self) -> Result<Option<Vec<u8>>> {
        let mut g = self.inner.lock().unwrap();
        let (pos, len) = (g.read_pos, g.len);
        match read_entry_at(&mut g.file, pos, len)? {
            Some(e) => {
                g.read_pos = e.end();
                Ok(Some(e.payload().to_vec()))
            }
            None => Ok(None),
        }
    }

    fn rewind(&self) -> Result<()> {
        self.inner.lock().unwrap().read_pos = WAL_HDR_SIZE;
        Ok(())
    }

    fn truncate(&self, len: u64) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        g.file
            .set_len(len)
            .with_context(|| format!("truncate {}", self.path.display()))?;
        g.file.sync_data()?;
        g.len = len;
        g.read_pos = g.read_pos.min(len.max(WAL_HDR_SIZE));
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let g = self.inner.lock().unwrap();
        g.file
            .sync_all()
            .with_context(|| format!("sync {}", self.path.display()))?;
        Ok(())
    }
}
