//! Centralized configuration and builder for the data manager.
//!
//! `DmConfig::from_env()` collects the tunables from the environment; `DmBuilder` starts from
//! the environment (or from defaults) and overrides single fields.
//!
//! Env:
//! - DM_PAGE_CACHE_PAGES  page cache capacity in pages (default 1024, minimum 10)
//! - DM_MEMORY_BYTES      page cache capacity in bytes; wins over DM_PAGE_CACHE_PAGES
//! - DM_ITEM_CACHE_ITEMS  record cache capacity (default 0 = unbounded)
//! - DM_EXCLUSIVE_LOCK    take an exclusive fs lock on the heap file (default on)

use std::fmt;

use crate::consts::{PAGE_CACHE_MIN_PAGES, PAGE_SIZE};
use crate::error::DmError;

#[derive(Clone, Debug)]
pub struct DmConfig {
    /// Page cache size in pages.
    pub page_cache_pages: usize,

    /// Record cache size (0 = unbounded).
    pub item_cache_items: usize,

    /// Hold an exclusive advisory lock on `<path>.db` while open.
    pub exclusive_lock: bool,
}

impl Default for DmConfig {
    fn default() -> Self {
        Self {
            page_cache_pages: 1024,
            item_cache_items: 0,
            exclusive_lock: true,
        }
    }
}

fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl DmConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("DM_PAGE_CACHE_PAGES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.page_cache_pages = n;
            }
        }

        if let Ok(v) = std::env::var("DM_MEMORY_BYTES") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.page_cache_pages = (n / PAGE_SIZE as u64) as usize;
            }
        }

        if let Ok(v) = std::env::var("DM_ITEM_CACHE_ITEMS") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.item_cache_items = n;
            }
        }

        if let Ok(v) = std::env::var("DM_EXCLUSIVE_LOCK") {
            cfg.exclusive_lock = env_flag(&v);
        }

        cfg
    }

    pub fn with_page_cache_pages(mut self, pages: usize) -> Self {
        self.page_cache_pages = pages;
        self
    }

    /// Size the page cache from a memory budget.
    pub fn with_memory_bytes(mut self, bytes: u64) -> Self {
        self.page_cache_pages = (bytes / PAGE_SIZE as u64) as usize;
        self
    }

    pub fn with_item_cache_items(mut self, items: usize) -> Self {
        self.item_cache_items = items;
        self
    }

    pub fn with_exclusive_lock(mut self, on: bool) -> Self {
        self.exclusive_lock = on;
        self
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), DmError> {
        if self.page_cache_pages < PAGE_CACHE_MIN_PAGES {
            return Err(DmError::CacheTooSmall {
                pages: self.page_cache_pages,
                min: PAGE_CACHE_MIN_PAGES,
            });
        }
        Ok(())
    }
}

impl fmt::Display for DmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DmConfig {{ page_cache_pages: {}, item_cache_items: {}, exclusive_lock: {} }}",
            self.page_cache_pages,
            if self.item_cache_items == 0 {
                "unbounded".to_string()
            } else {
                self.item_cache_items.to_string()
            },
            self.exclusive_lock,
        )
    }
}

/// Builder returned by `DataManager::builder()`.
#[derive(Clone, Debug)]
pub struct DmBuilder {
    cfg: DmConfig,
}

impl Default for DmBuilder {
    fn default() -> Self {
        Self {
            cfg: DmConfig::from_env(),
        }
    }
}

impl DmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: DmConfig::default(),
        }
    }

    pub fn page_cache_pages(mut self, pages: usize) -> Self {
        self.cfg.page_cache_pages = pages;
        self
    }

    pub fn memory_bytes(mut self, bytes: u64) -> Self {
        self.cfg = self.cfg.with_memory_bytes(bytes);
        self
    }

    pub fn item_cache_items(mut self, items: usize) -> Self {
        self.cfg.item_cache_items = items;
        self
    }

    pub fn exclusive_lock(mut self, on: bool) -> Self {
        self.cfg.exclusive_lock = on;
        self
    }

    pub fn build(self) -> DmConfig {
        self.cfg
    }
}
