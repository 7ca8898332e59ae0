//! Recovery driven against an in-memory page store.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use pagedm::consts::{ITEM_INVALID, ITEM_VALID};
use pagedm::dm::item::wrap_raw;
use pagedm::page::common::{fso, init_page};
use pagedm::page::Page;
use pagedm::wal::{recover, FileLogger, LogRecord, Logger};
use pagedm::{PageCache, TransactionManager, Uid, XidFile};

/// Pages live in a map; nothing is ever written anywhere.
struct MemPageCache {
    pages: Mutex<HashMap<u32, (Arc<Page>, usize)>>,
    count: AtomicU32,
}

impl MemPageCache {
    fn with_pages(n: u32) -> Self {
        let mut map = HashMap::new();
        for pgno in 1..=n {
            map.insert(pgno, (Arc::new(Page::new(pgno, &init_page())), 0));
        }
        Self {
            pages: Mutex::new(map),
            count: AtomicU32::new(n),
        }
    }

    fn snapshot(&self, pgno: u32) -> Vec<u8> {
        self.pages.lock().unwrap()[&pgno].0.to_vec()
    }

    fn holders(&self) -> usize {
        self.pages.lock().unwrap().values().map(|(_, r)| *r).sum()
    }
}

impl PageCache for MemPageCache {
    fn new_page(&self, init: &[u8]) -> Result<u32> {
        let pgno = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        self.pages
            .lock()
            .unwrap()
            .insert(pgno, (Arc::new(Page::new(pgno, init)), 0));
        Ok(pgno)
    }

    fn get_page(&self, pgno: u32) -> Result<Arc<Page>> {
        let mut g = self.pages.lock().unwrap();
        let (page, refs) = g
            .get_mut(&pgno)
            .ok_or_else(|| anyhow!("no page {}", pgno))?;
        *refs += 1;
        Ok(Arc::clone(page))
    }

    fn release(&self, page: &Page) -> Result<()> {
        let mut g = self.pages.lock().unwrap();
        let (_, refs) = g
            .get_mut(&page.pgno())
            .ok_or_else(|| anyhow!("no page {}", page.pgno()))?;
        *refs = refs
            .checked_sub(1)
            .ok_or_else(|| anyhow!("extra release of {}", page.pgno()))?;
        Ok(())
    }

    fn truncate_by_pgno(&self, max_pgno: u32) -> Result<()> {
        self.pages.lock().unwrap().retain(|&n, _| n <= max_pgno);
        self.count.store(max_pgno, Ordering::Release);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    fn flush_page(&self, _page: &Page) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn redo_then_undo_in_reverse() -> Result<()> {
    let root = unique_root("recover-mem");
    fs::create_dir_all(&root)?;
    let log = FileLogger::create(&root.join("r.log"))?;
    let tm = XidFile::create(&root.join("r.xid"))?;

    let x1 = tm.begin()?; // committed
    let x2 = tm.begin()?; // left active
    let x3 = tm.begin()?; // aborted

    let a0 = wrap_raw(b"aaaa");
    let a1 = wrap_raw(b"AAAA");
    let a2 = wrap_raw(b"zzzz");
    let b0 = wrap_raw(b"bb");
    let a_off = 2u16;
    let b_off = a_off + a0.len() as u16;
    let a = Uid::new(2, a_off);

    let entries = [
        LogRecord::Insert { xid: x1, pgno: 2, offset: a_off, raw: a0.clone() },
        LogRecord::Update { xid: x1, uid: a, old_raw: a0.clone(), new_raw: a1.clone() },
        LogRecord::Insert { xid: x2, pgno: 2, offset: b_off, raw: b0.clone() },
        LogRecord::Update { xid: x2, uid: a, old_raw: a1.clone(), new_raw: a2.clone() },
        LogRecord::Insert { xid: x3, pgno: 3, offset: 2, raw: wrap_raw(b"c") },
    ];
    for e in &entries {
        log.log(&e.encode())?;
    }
    tm.commit(x1)?;
    tm.abort(x3)?;

    // Page 5 was allocated but never logged against.
    let pc = MemPageCache::with_pages(5);
    let stats = recover(&tm, &log, &pc)?;

    assert_eq!(stats.max_pgno, 3);
    assert_eq!(pc.page_count(), 3);
    assert_eq!(stats.redone, 3);
    assert_eq!(stats.undone, 2);
    assert_eq!(stats.aborted_txns, 1);
    assert_eq!(pc.holders(), 0, "every page handed back");

    assert!(tm.is_aborted(x2)?);
    assert!(tm.is_committed(x1)?);

    let p2 = pc.snapshot(2);
    let a_at = a_off as usize;
    assert_eq!(&p2[a_at..a_at + a1.len()], &a1[..], "x1 update redone, x2 update undone");
    let b_at = b_off as usize;
    assert_eq!(p2[b_at], ITEM_INVALID, "x2 insert tombstoned");
    assert_eq!(&p2[b_at + 3..b_at + 5], b"bb");

    let p3 = Page::new(3, &pc.snapshot(3));
    assert_eq!(fso(&p3), 6);
    p3.read(|d| assert_eq!(d[2], ITEM_VALID));
    Ok(())
}

#[test]
fn empty_log_keeps_only_first_page() -> Result<()> {
    let root = unique_root("recover-empty");
    fs::create_dir_all(&root)?;
    let log = FileLogger::create(&root.join("e.log"))?;
    let tm = XidFile::create(&root.join("e.xid"))?;
    let pc = MemPageCache::with_pages(4);

    let stats = recover(&tm, &log, &pc)?;
    assert_eq!(stats.max_pgno, 1);
    assert_eq!(stats.redone + stats.undone + stats.aborted_txns, 0);
    assert_eq!(pc.page_count(), 1);
    Ok(())
}

#[test]
fn replay_is_idempotent() -> Result<()> {
    let root = unique_root("recover-twice");
    fs::create_dir_all(&root)?;
    let log = FileLogger::create(&root.join("t.log"))?;
    let tm = XidFile::create(&root.join("t.xid"))?;
    let x = tm.begin()?;
    log.log(
        &LogRecord::Insert { xid: x, pgno: 2, offset: 2, raw: wrap_raw(b"once") }.encode(),
    )?;
    tm.commit(x)?;

    let pc = MemPageCache::with_pages(2);
    recover(&tm, &log, &pc)?;
    let first = pc.snapshot(2);
    recover(&tm, &log, &pc)?;
    assert_eq!(pc.snapshot(2), first);
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pagedm-{}-{}-{}", prefix, pid, t))
}
