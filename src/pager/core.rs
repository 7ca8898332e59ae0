//! pager/core — `FilePageCache`: structure, create()/open() and the cache plumbing.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::RcCache;
use crate::consts::{PAGE_CACHE_MIN_PAGES, PAGE_SIZE};
use crate::error::DmError;
use crate::metrics::{record_cache_eviction, record_cache_hit, record_cache_miss};
use crate::page::Page;

use super::io::{read_page_at, write_page_at};

pub struct FilePageCache {
    pub(crate) path: PathBuf,
    pub(crate) file: Arc<Mutex<File>>,
    pub(crate) page_count: AtomicU32,
    pub(crate) cache: RcCache<Arc<Page>>,
}

impl FilePageCache {
    /// Create a new, empty heap file. Fails if it already exists.
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        if path.exists() {
            return Err(DmError::FileExists(path.to_path_buf()).into());
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("create heap file {}", path.display()))?;
        debug!("pager: created {}", path.display());
        Ok(Self::with_file(path, file, 0, capacity))
    }

    /// Open an existing heap file.
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        if !path.exists() {
            return Err(DmError::FileNotExists(path.to_path_buf()).into());
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open heap file {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        if len % PAGE_SIZE as u64 != 0 {
            warn!(
                "pager: {} length {} is not a multiple of the page size; trailing bytes ignored",
                path.display(),
                len
            );
        }
        let pages = (len / PAGE_SIZE as u64) as u32;
        debug!("pager: opened {} ({} pages)", path.display(), pages);
        Ok(Self::with_file(path, file, pages, capacity))
    }

    fn with_file(path: &Path, file: File, pages: u32, capacity: usize) -> Self {
        let file = Arc::new(Mutex::new(file));

        let load_file = Arc::clone(&file);
        let loader = Box::new(move |key: u64| -> Result<Arc<Page>> {
            let pgno = key as u32;
            let buf = read_page_at(&load_file, pgno)?;
            Ok(Arc::new(Page::new(pgno, &buf)))
        });

        let evict_file = Arc::clone(&file);
        let evictor = Box::new(move |page: &Arc<Page>| -> Result<()> {
            record_cache_eviction();
            if page.is_dirty() {
                write_page_at(&evict_file, page.pgno(), &page.to_vec())?;
                page.set_dirty(false);
            }
            Ok(())
        });

        Self {
            path: path.to_path_buf(),
            file,
            page_count: AtomicU32::new(pages),
            cache: RcCache::new(capacity, loader, evictor),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn pages(&self) -> u32 {
        self.page_count.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn is_resident(&self, pgno: u32) -> bool {
        self.cache.is_resident(pgno as u64)
    }

    /// Current holder count of a resident page.
    pub fn ref_count(&self, pgno: u32) -> Option<usize> {
        self.cache.ref_count(pgno as u64)
    }

    pub(crate) fn fetch(&self, pgno: u32) -> Result<Arc<Page>> {
        let (page, hit) = self
            .cache
            .get_traced(pgno as u64)
            .with_context(|| format!("get page {}", pgno))?;
        if hit {
            record_cache_hit();
        } else {
            record_cache_miss();
        }
        Ok(page)
    }

    pub(crate) fn unpin(&self, pgno: u32) -> Result<()> {
        self.cache.release(pgno as u64)
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        self.cache.close_all()?;
        let f = self.file.lock().unwrap();
        f.sync_all()
            .with_context(|| format!("sync {}", self.path.display()))?;
        Ok(())
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity < PAGE_CACHE_MIN_PAGES {
        return Err(DmError::CacheTooSmall {
            pages: capacity,
            min: PAGE_CACHE_MIN_PAGES,
        }
        .into());
    }
    Ok(())
}
