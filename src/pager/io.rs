//! pager/io — positioned page I/O.
//!
//! Seek and read (or write) form one critical section under the file mutex, so concurrent
//! loaders never interleave on the shared cursor.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use crate::consts::PAGE_SIZE;
use crate::metrics::record_page_flush;
use crate::page::Page;

use super::core::FilePageCache;

#[inline]
pub fn page_offset(pgno: u32) -> u64 {
    (pgno as u64 - 1) * PAGE_SIZE as u64
}

/// Read one full page.
pub fn read_page_at(file: &Mutex<File>, pgno: u32) -> Result<Vec<u8>> {
    if pgno == 0 {
        anyhow::bail!("page numbers start at 1");
    }
    let mut buf = vec![0u8; PAGE_SIZE];
    let mut f = file.lock().unwrap();
    f.seek(SeekFrom::Start(page_offset(pgno)))?;
    f.read_exact(&mut buf)
        .with_context(|| format!("read page {}", pgno))?;
    Ok(buf)
}

/// Write one full page and fsync the data.
pub fn write_page_at(file: &Mutex<File>, pgno: u32, data: &[u8]) -> Result<()> {
    if pgno == 0 {
        anyhow::bail!("page numbers start at 1");
    }
    debug_assert_eq!(data.len(), PAGE_SIZE);
    let mut f = file.lock().unwrap();
    f.seek(SeekFrom::Start(page_offset(pgno)))?;
    f.write_all(data)
        .with_context(|| format!("write page {}", pgno))?;
    f.sync_data()
        .with_context(|| format!("fsync after page {}", pgno))?;
    record_page_flush();
    Ok(())
}

impl FilePageCache {
    pub(crate) fn flush(&self, page: &Page) -> Result<()> {
        write_page_at(&self.file, page.pgno(), &page.to_vec())
    }
}
