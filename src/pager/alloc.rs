//! pager/alloc — page allocation and truncation.

use anyhow::{Context, Result};
use log::debug;
use std::sync::atomic::Ordering;

use crate::consts::PAGE_SIZE;
use crate::metrics::record_page_allocated;
use crate::page::Page;

use super::core::FilePageCache;
use super::io::write_page_at;

impl FilePageCache {
    /// Hand out the next page number and write its initial image. The page is not cached;
    /// the first `get_page` faults it in from disk.
    pub(crate) fn allocate(&self, init: &[u8]) -> Result<u32> {
        let pgno = self.page_count.fetch_add(1, Ordering::AcqRel) + 1;
        let page = Page::new(pgno, init);
        write_page_at(&self.file, pgno, &page.to_vec())
            .with_context(|| format!("initialise page {}", pgno))?;
        record_page_allocated();
        debug!("pager: allocated page {}", pgno);
        Ok(pgno)
    }

    pub(crate) fn truncate_to(&self, max_pgno: u32) -> Result<()> {
        let len = max_pgno as u64 * PAGE_SIZE as u64;
        {
            let f = self.file.lock().unwrap();
            f.set_len(len)
                .with_context(|| format!("truncate {} to {} bytes", self.path.display(), len))?;
            f.sync_all()?;
        }
        self.page_count.store(max_pgno, Ordering::Release);
        debug!("pager: truncated to {} pages", max_pgno);
        Ok(())
    }
}
