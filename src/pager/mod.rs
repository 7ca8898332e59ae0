//! pager — page cache over the heap file `<path>.db`.
//!
//! Submodules:
//! - core.rs  — `FilePageCache`: file handle, page counter, the ref-counted cache of pages.
//! - io.rs    — positioned page reads/writes under the file lock, flush.
//! - alloc.rs — sequential page allocation and recovery-time truncation.
//!
//! Pages are 1-based: page `n` lives at file offset `(n-1) * PAGE_SIZE`.

use anyhow::Result;
use std::sync::Arc;

use crate::page::Page;

pub mod alloc;
pub mod core;
pub mod io;

pub use core::FilePageCache;

/// What the data manager and recovery need from a page store.
///
/// `get_page` lends a page; every successful call must be paired with one `release`.
pub trait PageCache: Send + Sync {
    /// Allocate the next page number, write `init` there and return the number.
    /// The page is not left resident.
    fn new_page(&self, init: &[u8]) -> Result<u32>;

    fn get_page(&self, pgno: u32) -> Result<Arc<Page>>;

    /// Drop one reference; a page whose count reaches zero is written back if dirty.
    fn release(&self, page: &Page) -> Result<()>;

    /// Cut the store down to `max_pgno` pages. Only called before any page is cached.
    fn truncate_by_pgno(&self, max_pgno: u32) -> Result<()>;

    fn page_count(&self) -> u32;

    /// Synchronous write of one page followed by fsync.
    fn flush_page(&self, page: &Page) -> Result<()>;

    /// Write back every resident page and sync the file.
    fn close(&self) -> Result<()>;
}

impl PageCache for FilePageCache {
    fn new_page(&self, init: &[u8]) -> Result<u32> {
        self.allocate(init)
    }

    fn get_page(&self, pgno: u32) -> Result<Arc<Page>> {
        self.fetch(pgno)
    }

    fn release(&self, page: &Page) -> Result<()> {
        self.unpin(page.pgno())
    }

    fn truncate_by_pgno(&self, max_pgno: u32) -> Result<()> {
        self.truncate_to(max_pgno)
    }

    fn page_count(&self) -> u32 {
        self.pages()
    }

    fn flush_page(&self, page: &Page) -> Result<()> {
        self.flush(page)
    }

    fn close(&self) -> Result<()> {
        self.shutdown()
    }
}
