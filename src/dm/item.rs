//! dm/item — a record inside a page and its mutation bracket.
//!
//! ```text
//! [valid u8][size u16 BE][payload; size]     valid: 0 live, 1 deleted
//! ```
//!
//! Mutation goes through `DataItem::before()`, which takes the record's write lock and
//! snapshots the current bytes. The returned guard either logs the change (`after`) or puts
//! the snapshot back (`un_before`, or simply dropping it).

use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ByteOrder};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use super::uid::Uid;
use crate::consts::{
    ITEM_INVALID, ITEM_OFF_DATA, ITEM_OFF_SIZE, ITEM_OFF_VALID, ITEM_VALID, PAGE_SIZE,
};
use crate::error::DmError;
use crate::page::Page;
use crate::wal::{LogRecord, Logger};

/// Record image for a new payload.
pub fn wrap_raw(payload: &[u8]) -> Vec<u8> {
    let mut raw = vec![0u8; ITEM_OFF_DATA + payload.len()];
    raw[ITEM_OFF_VALID] = ITEM_VALID;
    BigEndian::write_u16(&mut raw[ITEM_OFF_SIZE..ITEM_OFF_DATA], payload.len() as u16);
    raw[ITEM_OFF_DATA..].copy_from_slice(payload);
    raw
}

pub struct DataItem {
    uid: Uid,
    page: Arc<Page>,
    start: usize,
    size: usize,
    lock: RwLock<()>,
    logger: Arc<dyn Logger>,
}

impl DataItem {
    /// Materialise the record at `uid` from its (already pinned) page.
    pub(crate) fn parse(uid: Uid, page: Arc<Page>, logger: Arc<dyn Logger>) -> Result<Self> {
        let start = uid.offset as usize;
        let bad = |reason: String| DmError::BadRecord {
            uid: uid.to_u64(),
            reason,
        };
        if start + ITEM_OFF_DATA > PAGE_SIZE {
            return Err(bad(format!("offset {} past page end", start)).into());
        }
        let size = page.read(|d| {
            BigEndian::read_u16(&d[start + ITEM_OFF_SIZE..start + ITEM_OFF_DATA]) as usize
        });
        if start + ITEM_OFF_DATA + size > PAGE_SIZE {
            return Err(bad(format!("size {} runs past page end", size)).into());
        }
        Ok(Self {
            uid,
            page,
            start,
            size,
            lock: RwLock::new(()),
            logger,
        })
    }

    #[inline]
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub(crate) fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// Payload length.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    fn raw_end(&self) -> usize {
        self.start + ITEM_OFF_DATA + self.size
    }

    pub fn is_valid(&self) -> bool {
        let _r = self.lock.read().unwrap();
        self.page.read(|d| d[self.start + ITEM_OFF_VALID] == ITEM_VALID)
    }

    pub fn payload(&self) -> Vec<u8> {
        let _r = self.lock.read().unwrap();
        self.page
            .read(|d| d[self.start + ITEM_OFF_DATA..self.raw_end()].to_vec())
    }

    /// Whole record image, header included.
    pub fn raw(&self) -> Vec<u8> {
        let _r = self.lock.read().unwrap();
        self.raw_unlocked()
    }

    fn raw_unlocked(&self) -> Vec<u8> {
        self.page.read(|d| d[self.start..self.raw_end()].to_vec())
    }

    fn put_raw(&self, raw: &[u8]) {
        self.page
            .write(|d| d[self.start..self.raw_end()].copy_from_slice(raw));
    }

    /// Open a mutation bracket. Blocks while another bracket on this record is open.
    pub fn before(&self) -> ItemWriteGuard<'_> {
        let lock = self.lock.write().unwrap();
        self.page.set_dirty(true);
        let old_raw = self.raw_unlocked();
        ItemWriteGuard {
            item: self,
            _lock: lock,
            old_raw,
            done: false,
        }
    }
}

impl std::fmt::Debug for DataItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataItem")
            .field("uid", &self.uid)
            .field("len", &self.size)
            .finish()
    }
}

/// Open mutation bracket on one record. Dropping it without `after` rolls the record back.
pub struct ItemWriteGuard<'a> {
    item: &'a DataItem,
    _lock: RwLockWriteGuard<'a, ()>,
    old_raw: Vec<u8>,
    done: bool,
}

impl<'a> ItemWriteGuard<'a> {
    /// Record image captured when the bracket opened.
    pub fn old_raw(&self) -> &[u8] {
        &self.old_raw
    }

    pub fn payload(&self) -> Vec<u8> {
        let it = self.item;
        it.page
            .read(|d| d[it.start + ITEM_OFF_DATA..it.raw_end()].to_vec())
    }

    /// Overwrite part of the payload.
    pub fn write_payload(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let it = self.item;
        if offset + bytes.len() > it.size {
            return Err(anyhow!(
                "write of {} bytes at {} exceeds record length {}",
                bytes.len(),
                offset,
                it.size
            ));
        }
        let at = it.start + ITEM_OFF_DATA + offset;
        it.page
            .write(|d| d[at..at + bytes.len()].copy_from_slice(bytes));
        Ok(())
    }

    /// Replace the payload; records never change length.
    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.item.size {
            return Err(anyhow!(
                "payload of {} bytes cannot replace a {}-byte record",
                bytes.len(),
                self.item.size
            ));
        }
        self.write_payload(0, bytes)
    }

    /// Tombstone the record.
    pub fn mark_deleted(&mut self) {
        let at = self.item.start + ITEM_OFF_VALID;
        self.item.page.write(|d| d[at] = ITEM_INVALID);
    }

    /// Log the change under `xid` and close the bracket. If the log append fails the
    /// record is restored before the error is returned.
    pub fn after(mut self, xid: u64) -> Result<()> {
        let rec = LogRecord::Update {
            xid,
            uid: self.item.uid,
            old_raw: self.old_raw.clone(),
            new_raw: self.item.raw_unlocked(),
        };
        let res = self.item.logger.log(&rec.encode());
        if res.is_ok() {
            self.done = true;
        }
        res
    }

    /// Abandon the change.
    pub fn un_before(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if !self.done {
            self.item.put_raw(&self.old_raw);
            self.done = true;
        }
    }
}

impl Drop for ItemWriteGuard<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
