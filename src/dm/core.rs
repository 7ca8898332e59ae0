//! dm/core — `DataManager` structure and shared helpers.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::item::DataItem;
use super::uid::Uid;
use crate::cache::RcCache;
use crate::config::{DmBuilder, DmConfig};
use crate::error::DmError;
use crate::free::PageIndex;
use crate::lock::LockGuard;
use crate::page::Page;
use crate::pager::PageCache;
use crate::tm::TransactionManager;
use crate::wal::{Logger, RecoveryStats};

pub struct DataManager {
    pub(crate) base: PathBuf,
    pub(crate) cfg: DmConfig,
    pub(crate) pc: Arc<dyn PageCache>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) tm: Arc<dyn TransactionManager>,
    pub(crate) index: PageIndex,
    pub(crate) items: RcCache<Arc<DataItem>>,
    pub(crate) first_page: Mutex<Option<Arc<Page>>>,
    pub(crate) lock: Mutex<Option<LockGuard>>,
    pub(crate) closed: AtomicBool,
    pub(crate) recovery: Option<RecoveryStats>,
}

impl DataManager {
    /// Config builder seeded from the environment.
    pub fn builder() -> DmBuilder {
        DmBuilder::new()
    }

    /// Base path shared by `<base>.db`, `<base>.log` and `<base>.xid`.
    pub fn path(&self) -> &Path {
        &self.base
    }

    pub fn config(&self) -> &DmConfig {
        &self.cfg
    }

    pub fn tm(&self) -> &Arc<dyn TransactionManager> {
        &self.tm
    }

    pub fn page_count(&self) -> u32 {
        self.pc.page_count()
    }

    /// Pages currently known to the free-space index.
    pub fn indexed_pages(&self) -> usize {
        self.index.len()
    }

    /// What recovery did when this handle was opened; `None` after a clean shutdown.
    pub fn recovery_stats(&self) -> Option<&RecoveryStats> {
        self.recovery.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DmError::Closed.into());
        }
        Ok(())
    }

    /// Record cache keyed by packed uid. Loading pins the record's page until eviction.
    pub(crate) fn item_cache(
        capacity: usize,
        pc: Arc<dyn PageCache>,
        logger: Arc<dyn Logger>,
    ) -> RcCache<Arc<DataItem>> {
        let load_pc = Arc::clone(&pc);
        let loader = Box::new(move |key: u64| -> Result<Arc<DataItem>> {
            let uid = Uid::from_u64(key);
            let page = load_pc.get_page(uid.pgno)?;
            match DataItem::parse(uid, Arc::clone(&page), Arc::clone(&logger)) {
                Ok(item) => Ok(Arc::new(item)),
                Err(e) => {
                    load_pc.release(&page)?;
                    Err(e)
                }
            }
        });
        let evictor = Box::new(move |item: &Arc<DataItem>| -> Result<()> {
            pc.release(item.page())
        });
        RcCache::new(capacity, loader, evictor)
    }
}
