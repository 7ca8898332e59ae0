//! dm/open — create(), open() with crash recovery, close().

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::core::DataManager;
use crate::config::DmConfig;
use crate::consts::{DB_SUFFIX, FIRST_PGNO, LOG_SUFFIX};
use crate::error::DmError;
use crate::free::PageIndex;
use crate::lock::{try_lock_exclusive, LockGuard};
use crate::page::{common, first};
use crate::pager::{FilePageCache, PageCache};
use crate::tm::TransactionManager;
use crate::util::with_suffix;
use crate::wal::{recover, FileLogger, Logger, RecoveryStats};

impl DataManager {
    /// Create `<base>.db` and `<base>.log`. Neither may exist yet.
    pub fn create(base: &Path, cfg: DmConfig, tm: Arc<dyn TransactionManager>) -> Result<Self> {
        cfg.validate()?;
        let db_path = with_suffix(base, DB_SUFFIX);
        let log_path = with_suffix(base, LOG_SUFFIX);
        for p in [&db_path, &log_path] {
            if p.exists() {
                return Err(DmError::FileExists(p.clone()).into());
            }
        }

        let pc = FilePageCache::create(&db_path, cfg.page_cache_pages)?;
        let lock = take_lock(&cfg, &db_path)?;
        let logger = FileLogger::create(&log_path)?;
        let pc: Arc<dyn PageCache> = Arc::new(pc);
        let logger: Arc<dyn Logger> = Arc::new(logger);

        let pgno = pc.new_page(&first::init_first_page())?;
        debug_assert_eq!(pgno, FIRST_PGNO);
        let first_page = pc.get_page(FIRST_PGNO)?;

        info!("dm: created {}", base.display());
        Ok(Self::assemble(base, cfg, pc, logger, tm, lock, first_page, None))
    }

    /// Open an existing database, running recovery if the last session did not close cleanly.
    pub fn open(base: &Path, cfg: DmConfig, tm: Arc<dyn TransactionManager>) -> Result<Self> {
        cfg.validate()?;
        let db_path = with_suffix(base, DB_SUFFIX);
        let log_path = with_suffix(base, LOG_SUFFIX);

        let pc = FilePageCache::open(&db_path, cfg.page_cache_pages)?;
        let lock = take_lock(&cfg, &db_path)?;
        let logger = FileLogger::open(&log_path)?;
        let pc: Arc<dyn PageCache> = Arc::new(pc);
        let logger: Arc<dyn Logger> = Arc::new(logger);

        let first_page = pc
            .get_page(FIRST_PGNO)
            .with_context(|| format!("load first page of {}", db_path.display()))?;
        let recovery = if first::check(&first_page) {
            None
        } else {
            warn!("dm: {} was not closed cleanly, recovering", base.display());
            Some(recover(tm.as_ref(), logger.as_ref(), pc.as_ref())?)
        };

        let dm = Self::assemble(base, cfg, pc, logger, tm, lock, first_page, recovery);
        dm.fill_page_index()?;
        if let Some(fp) = dm.first_page.lock().unwrap().as_ref() {
            first::set_open_marker(fp);
            dm.pc.flush_page(fp)?;
        }
        info!(
            "dm: opened {} ({} pages, {} indexed)",
            base.display(),
            dm.page_count(),
            dm.indexed_pages()
        );
        Ok(dm)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        base: &Path,
        cfg: DmConfig,
        pc: Arc<dyn PageCache>,
        logger: Arc<dyn Logger>,
        tm: Arc<dyn TransactionManager>,
        lock: Option<LockGuard>,
        first_page: Arc<crate::page::Page>,
        recovery: Option<RecoveryStats>,
    ) -> Self {
        let items = Self::item_cache(cfg.item_cache_items, Arc::clone(&pc), Arc::clone(&logger));
        Self {
            base: base.to_path_buf(),
            cfg,
            pc,
            logger,
            tm,
            index: PageIndex::new(),
            items,
            first_page: Mutex::new(Some(first_page)),
            lock: Mutex::new(lock),
            closed: AtomicBool::new(false),
            recovery,
        }
    }

    /// Register every record page's free space.
    fn fill_page_index(&self) -> Result<()> {
        for pgno in FIRST_PGNO + 1..=self.pc.page_count() {
            let page = self.pc.get_page(pgno)?;
            self.index.add(pgno, common::free_space(&page));
            self.pc.release(&page)?;
        }
        debug!("dm: indexed {} pages", self.index.len());
        Ok(())
    }

    /// Clean shutdown: write back records and pages, fence the log, stamp the first page.
    /// Further calls are no-ops. Dropping a `DataManager` without calling this is treated as
    /// a crash by the next `open`.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.items.close_all()?;
        self.logger.close()?;
        if let Some(fp) = self.first_page.lock().unwrap().take() {
            first::set_close_marker(&fp);
            self.pc.flush_page(&fp)?;
            self.pc.release(&fp)?;
        }
        self.pc.close()?;
        self.lock.lock().unwrap().take();
        info!("dm: closed {}", self.base.display());
        Ok(())
    }
}

fn take_lock(cfg: &DmConfig, db_path: &Path) -> Result<Option<LockGuard>> {
    if cfg.exclusive_lock {
        Ok(Some(try_lock_exclusive(db_path)?))
    } else {
        Ok(None)
    }
}
