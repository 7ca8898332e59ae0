//! dm/ops — record operations.

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;

use super::core::DataManager;
use super::item::{wrap_raw, DataItem};
use super::uid::Uid;
use crate::consts::{INSERT_SELECT_ATTEMPTS, MAX_PAGE_DATA};
use crate::error::DmError;
use crate::free::PageInfo;
use crate::metrics::{record_busy, record_insert, record_insert_new_page};
use crate::page::common::{fso, free_space, init_page, insert_data};
use crate::wal::LogRecord;

impl DataManager {
    /// Store `payload` as a new record under `xid`. The insert is logged before the page is
    /// touched.
    pub fn insert(&self, xid: u64, payload: &[u8]) -> Result<Uid> {
        self.ensure_open()?;
        let raw = wrap_raw(payload);
        if raw.len() > MAX_PAGE_DATA {
            return Err(DmError::DataTooLarge {
                len: raw.len(),
                max: MAX_PAGE_DATA,
            }
            .into());
        }

        let pi = self.pick_page(raw.len())?;
        let page = match self.pc.get_page(pi.pgno) {
            Ok(p) => p,
            Err(e) => {
                // Untouched page: the selected hint still holds.
                self.index.add(pi.pgno, pi.free_space);
                return Err(e);
            }
        };

        let res = (|| -> Result<Uid> {
            let rec = LogRecord::Insert {
                xid,
                pgno: pi.pgno,
                offset: fso(&page),
                raw: raw.clone(),
            };
            self.logger
                .log(&rec.encode())
                .with_context(|| format!("log insert into page {}", pi.pgno))?;
            let offset = insert_data(&page, &raw)?;
            debug_assert_eq!(offset, rec.offset());
            Ok(Uid::new(pi.pgno, offset))
        })();

        self.index.add(pi.pgno, free_space(&page));
        let released = self.pc.release(&page);
        let uid = res?;
        released?;
        record_insert();
        Ok(uid)
    }

    /// Take a page with room for `len` bytes out of the index, allocating fresh pages when
    /// the index has none.
    fn pick_page(&self, len: usize) -> Result<PageInfo> {
        for _ in 0..INSERT_SELECT_ATTEMPTS {
            if let Some(pi) = self.index.select(len) {
                return Ok(pi);
            }
            let pgno = self.pc.new_page(&init_page())?;
            self.index.add(pgno, MAX_PAGE_DATA);
            record_insert_new_page();
            debug!("dm: new record page {}", pgno);
        }
        record_busy();
        Err(DmError::DatabaseBusy.into())
    }

    /// Look a record up. Deleted records read as `None`. A returned item must be handed back
    /// with `release`.
    pub fn read(&self, uid: Uid) -> Result<Option<Arc<DataItem>>> {
        self.ensure_open()?;
        let item = self.items.get(uid.to_u64())?;
        if !item.is_valid() {
            self.items.release(uid.to_u64())?;
            return Ok(None);
        }
        Ok(Some(item))
    }

    pub fn release(&self, item: &DataItem) -> Result<()> {
        self.items.release(item.uid().to_u64())
    }

    /// Copy of a live record's payload.
    pub fn read_bytes(&self, uid: Uid) -> Result<Option<Vec<u8>>> {
        let Some(item) = self.read(uid)? else {
            return Ok(None);
        };
        let bytes = item.payload();
        self.release(&item)?;
        Ok(Some(bytes))
    }

    /// Tombstone a record under `xid`. `false` when it is already gone.
    pub fn delete(&self, xid: u64, uid: Uid) -> Result<bool> {
        self.mutate(uid, |item| {
            let mut g = item.before();
            g.mark_deleted();
            g.after(xid)
        })
    }

    /// Overwrite a record's payload under `xid`; `bytes` must match its length.
    pub fn update(&self, xid: u64, uid: Uid, bytes: &[u8]) -> Result<bool> {
        self.mutate(uid, |item| {
            let mut g = item.before();
            g.set_payload(bytes)?;
            g.after(xid)
        })
    }

    fn mutate(&self, uid: Uid, f: impl FnOnce(&DataItem) -> Result<()>) -> Result<bool> {
        let Some(item) = self.read(uid)? else {
            return Ok(false);
        };
        let res = f(&item);
        let released = self.release(&item);
        res?;
        released?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::XID_SUFFIX;
    use crate::error::kind_of;
    use crate::metrics;
    use crate::tm::{TransactionManager, XidFile};
    use crate::util::with_suffix;
    use crate::DmBuilder;

    #[test]
    fn page_pick_gives_up_with_busy_after_bounded_attempts() -> Result<()> {
        let root = std::env::temp_dir().join(format!(
            "pagedm-pick-busy-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&root)?;
        let base = root.join("data");
        let tm: Arc<dyn TransactionManager> =
            Arc::new(XidFile::create(&with_suffix(&base, XID_SUFFIX))?);
        let cfg = DmBuilder::from_default().page_cache_pages(16).build();
        let dm = DataManager::create(&base, cfg, tm)?;

        let busy_before = metrics::snapshot().dm_busy;
        let pages_before = dm.page_count();

        // No page, however fresh, can serve this, so every attempt allocates and misses.
        let err = dm.pick_page(MAX_PAGE_DATA + 1).unwrap_err();
        let kind = kind_of(&err).expect("typed error");
        assert!(matches!(kind, DmError::DatabaseBusy));
        assert!(kind.is_retryable());
        assert!(metrics::snapshot().dm_busy > busy_before);

        let added = INSERT_SELECT_ATTEMPTS as u32;
        assert_eq!(dm.page_count(), pages_before + added);
        // Pages allocated on the way stay available to later inserts.
        assert_eq!(dm.indexed_pages(), INSERT_SELECT_ATTEMPTS);
        let uid = dm.insert(0, b"lands on a spare page")?;
        assert!(uid.pgno > pages_before);
        assert_eq!(dm.page_count(), pages_before + added);

        dm.close()?;
        Ok(())
    }
}
