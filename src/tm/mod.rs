//! tm — transaction status file `<path>.xid`.
//!
//! ```text
//! [counter u64 BE][status u8 for xid 1][status u8 for xid 2]...
//! ```
//!
//! Status: 0 active, 1 committed, 2 aborted. Xid 0 is the super transaction: never active,
//! always committed, never stored.

use anyhow::{Context, Result};
use byteorder::{BigEndian, ByteOrder};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::consts::{
    SUPER_XID, XID_ABORTED, XID_ACTIVE, XID_COMMITTED, XID_FIELD_SIZE, XID_HDR_SIZE,
};
use crate::error::DmError;

pub trait TransactionManager: Send + Sync {
    fn begin(&self) -> Result<u64>;
    fn commit(&self, xid: u64) -> Result<()>;
    fn abort(&self, xid: u64) -> Result<()>;
    fn is_active(&self, xid: u64) -> Result<bool>;
    fn is_committed(&self, xid: u64) -> Result<bool>;
    fn is_aborted(&self, xid: u64) -> Result<bool>;
    fn close(&self) -> Result<()>;
}

struct Inner {
    file: File,
    counter: u64,
}

pub struct XidFile {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[inline]
fn status_pos(xid: u64) -> u64 {
    XID_HDR_SIZE + (xid - 1) * XID_FIELD_SIZE
}

impl XidFile {
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(DmError::FileExists(path.to_path_buf()).into());
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("create xid file {}", path.display()))?;
        file.write_all(&[0u8; XID_HDR_SIZE as usize])?;
        file.sync_data()?;
        debug!("tm: created {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { file, counter: 0 }),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DmError::FileNotExists(path.to_path_buf()).into());
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open xid file {}", path.display()))?;
        let len = file.metadata()?.len();
        if len < XID_HDR_SIZE {
            return Err(DmError::BadXidFile(format!("{} bytes, no header", len)).into());
        }
        let mut hdr = [0u8; XID_HDR_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut hdr)?;
        let counter = BigEndian::read_u64(&hdr);
        let want = counter
            .checked_add(1)
            .map(status_pos)
            .ok_or_else(|| DmError::BadXidFile(format!("counter {} overflows", counter)))?;
        if len != want {
            return Err(DmError::BadXidFile(format!(
                "length {} does not match counter {} (expected {})",
                len, counter, want
            ))
            .into());
        }
        debug!("tm: opened {} (counter {})", path.display(), counter);
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { file, counter }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest xid handed out so far.
    pub fn counter(&self) -> u64 {
        self.inner.lock().unwrap().counter
    }

    fn set_status(&self, xid: u64, status: u8) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        if xid == SUPER_XID || xid > g.counter {
            return Err(DmError::BadXidFile(format!(
                "xid {} outside 1..={}",
                xid, g.counter
            ))
            .into());
        }
        g.file.seek(SeekFrom::Start(status_pos(xid)))?;
        g.file.write_all(&[status])?;
        g.file
            .sync_data()
            .with_context(|| format!("fsync {}", self.path.display()))?;
        Ok(())
    }

    fn status(&self, xid: u64) -> Result<u8> {
        let mut g = self.inner.lock().unwrap();
        if xid > g.counter {
            return Err(DmError::BadXidFile(format!(
                "xid {} outside 1..={}",
                xid, g.counter
            ))
            .into());
        }
        let mut b = [0u8; 1];
        g.file.seek(SeekFrom::Start(status_pos(xid)))?;
        g.file.read_exact(&mut b)?;
        Ok(b[0])
    }
}

impl TransactionManager for XidFile {
    fn begin(&self) -> Result<u64> {
        let mut g = self.inner.lock().unwrap();
        let xid = g.counter + 1;
        g.file.seek(SeekFrom::Start(status_pos(xid)))?;
        g.file.write_all(&[XID_ACTIVE])?;
        let mut hdr = [0u8; XID_HDR_SIZE as usize];
        BigEndian::write_u64(&mut hdr, xid);
        g.file.seek(SeekFrom::Start(0))?;
        g.file.write_all(&hdr)?;
        g.file
            .sync_data()
            .with_context(|| format!("fsync {}", self.path.display()))?;
        g.counter = xid;
        Ok(xid)
    }

    fn commit(&self, xid: u64) -> Result<()> {
        self.set_status(xid, XID_COMMITTED)
    }

    fn abort(&self, xid: u64) -> Result<()> {
        self.set_status(xid, XID_ABORTED)
    }

    fn is_active(&self, xid: u64) -> Result<bool> {
        if xid == SUPER_XID {
            return Ok(false);
        }
        Ok(self.status(xid)? == XID_ACTIVE)
    }

    fn is_committed(&self, xid: u64) -> Result<bool> {
        if xid == SUPER_XID {
            return Ok(true);
        }
        Ok(self.status(xid)? == XID_COMMITTED)
    }

    fn is_aborted(&self, xid: u64) -> Result<bool> {
        if xid == SUPER_XID {
            return Ok(false);
        }
        Ok(self.status(xid)? == XID_ABORTED)
    }

    fn close(&self) -> Result<()> {
        let g = self.inner.lock().unwrap();
        g.file
            .sync_all()
            .with_context(|| format!("sync {}", self.path.display()))?;
        Ok(())
    }
}
