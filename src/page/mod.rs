//! page — in-memory page and the two on-disk page layouts.
//!
//! - mod.rs    — `Page`: fixed-size buffer, page number, dirty flag.
//! - common.rs — record pages: `[fso u16][data ...][free ...]`.
//! - first.rs  — page 1: open/close markers used to detect an unclean shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::consts::PAGE_SIZE;

pub mod common;
pub mod first;

/// One page resident in memory. Owned by the page cache; callers borrow it between
/// `get_page` and `release`.
pub struct Page {
    pgno: u32,
    data: RwLock<Vec<u8>>,
    dirty: AtomicBool,
}

impl Page {
    /// Build a page from `init`; shorter input is zero-padded to the page size.
    pub fn new(pgno: u32, init: &[u8]) -> Self {
        let mut data = vec![0u8; PAGE_SIZE];
        let n = init.len().min(PAGE_SIZE);
        data[..n].copy_from_slice(&init[..n]);
        Self {
            pgno,
            data: RwLock::new(data),
            dirty: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn pgno(&self) -> u32 {
        self.pgno
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Run `f` over the page bytes under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let g = self.data.read().unwrap();
        f(&g)
    }

    /// Run `f` over the page bytes under the exclusive lock; marks the page dirty.
    pub fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut g = self.data.write().unwrap();
        self.set_dirty(true);
        f(&mut g)
    }

    /// Copy of the whole page (used by the flush path).
    pub fn to_vec(&self) -> Vec<u8> {
        self.read(|d| d.to_vec())
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("pgno", &self.pgno)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
