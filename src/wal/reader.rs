//! wal/reader — entry parsing and whole-file scan.
//!
//! A short or checksum-failing entry is a torn write, not an I/O error: parsing reports it as
//! `None` and the scan records where the good prefix ends.

use anyhow::{Context, Result};
use byteorder::{BigEndian, ByteOrder};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::encode::fold;
use crate::consts::{WAL_ENTRY_OFF_CHECKSUM, WAL_ENTRY_OFF_DATA, WAL_ENTRY_OFF_SIZE, WAL_HDR_SIZE};
use crate::error::DmError;

/// One verified entry: the full frame and where it starts.
#[derive(Debug)]
pub struct RawEntry {
    pub pos: u64,
    pub frame: Vec<u8>,
}

impl RawEntry {
    pub fn payload(&self) -> &[u8] {
        &self.frame[WAL_ENTRY_OFF_DATA..]
    }

    pub fn end(&self) -> u64 {
        self.pos + self.frame.len() as u64
    }
}

/// Parse the entry at `pos`. `Ok(None)` when the file ends at `pos` or the entry there is
/// short or fails its checksum.
pub fn read_entry_at(f: &mut File, pos: u64, file_len: u64) -> Result<Option<RawEntry>> {
    let hdr_len = WAL_ENTRY_OFF_DATA as u64;
    if pos + hdr_len > file_len {
        return Ok(None);
    }
    let mut hdr = [0u8; WAL_ENTRY_OFF_DATA];
    f.seek(SeekFrom::Start(pos))?;
    f.read_exact(&mut hdr)?;
    let size = BigEndian::read_u32(&hdr[WAL_ENTRY_OFF_SIZE..WAL_ENTRY_OFF_CHECKSUM]) as u64;
    if pos + hdr_len + size > file_len {
        return Ok(None);
    }
    let mut frame = vec![0u8; (hdr_len + size) as usize];
    frame[..WAL_ENTRY_OFF_DATA].copy_from_slice(&hdr);
    f.read_exact(&mut frame[WAL_ENTRY_OFF_DATA..])?;
    let want = BigEndian::read_i32(&hdr[WAL_ENTRY_OFF_CHECKSUM..WAL_ENTRY_OFF_DATA]);
    if fold(0, &frame[WAL_ENTRY_OFF_DATA..]) != want {
        return Ok(None);
    }
    Ok(Some(RawEntry { pos, frame }))
}

/// Result of walking a log from the first entry to the first bad one (or the end).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LogScan {
    pub file_len: u64,
    /// Checksum stored in the file header.
    pub stored: i32,
    /// Fold over every verified entry.
    pub accumulated: i32,
    /// Fold over every verified entry except the last one.
    pub before_last: i32,
    /// Start of the last verified entry (header end when there is none).
    pub last_start: u64,
    /// End of the verified prefix.
    pub good_end: u64,
    pub entries: u64,
    /// The walk stopped on a short or corrupt entry rather than at end of file.
    pub torn: bool,
}

impl LogScan {
    pub fn checksum_ok(&self) -> bool {
        self.stored == self.accumulated
    }
}

/// Walk all entries of an open log, handing each verified payload to `visit`.
pub fn scan(f: &mut File, mut visit: impl FnMut(&[u8])) -> Result<LogScan> {
    let file_len = f.metadata()?.len();
    if file_len < WAL_HDR_SIZE {
        return Err(DmError::BadLogFile(format!(
            "log of {} bytes has no checksum header",
            file_len
        ))
        .into());
    }
    let mut hdr = [0u8; WAL_HDR_SIZE as usize];
    f.seek(SeekFrom::Start(0))?;
    f.read_exact(&mut hdr)?;

    let mut s = LogScan {
        file_len,
        stored: BigEndian::read_i32(&hdr),
        last_start: WAL_HDR_SIZE,
        good_end: WAL_HDR_SIZE,
        ..Default::default()
    };
    while let Some(e) = read_entry_at(f, s.good_end, file_len)? {
        s.before_last = s.accumulated;
        s.accumulated = fold(s.accumulated, &e.frame);
        s.last_start = e.pos;
        s.good_end = e.end();
        s.entries += 1;
        visit(e.payload());
    }
    s.torn = s.good_end < file_len;
    Ok(s)
}

/// Read-only scan of a log file on disk; returns the summary and every verified payload.
pub fn scan_file(path: &Path) -> Result<(LogScan, Vec<Vec<u8>>)> {
    let mut f = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open log {}", path.display()))?;
    let mut payloads = Vec::new();
    let s = scan(&mut f, |p| payloads.push(p.to_vec()))?;
    Ok((s, payloads))
}
