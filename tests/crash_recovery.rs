use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagedm::consts::XID_SUFFIX;
use pagedm::util::with_suffix;
use pagedm::{DataManager, DmBuilder, DmConfig, TransactionManager, XidFile};

// Dropping a DataManager without close() is an unclean shutdown: the first page keeps a
// mismatched marker and the next open runs recovery.

#[test]
fn committed_work_is_redone_after_crash() -> Result<()> {
    let (base, tm) = fresh("crash-redo")?;
    let (a, b);
    {
        let dm = DataManager::create(&base, cfg(), Arc::clone(&tm))?;
        let xid = tm.begin()?;
        a = dm.insert(xid, b"alpha-v1")?;
        b = dm.insert(xid, b"bravo-v1")?;
        assert!(dm.update(xid, a, b"alpha-v2")?);
        tm.commit(xid)?;
        // crash
    }

    let tm = reopen_tm(&base)?;
    let dm = DataManager::open(&base, cfg(), Arc::clone(&tm))?;
    let stats = dm.recovery_stats().expect("recovery must run").clone();
    assert_eq!(stats.redone, 3);
    assert_eq!(stats.undone, 0);
    assert_eq!(stats.max_pgno, a.pgno.max(b.pgno));
    assert_eq!(dm.read_bytes(a)?.as_deref(), Some(&b"alpha-v2"[..]));
    assert_eq!(dm.read_bytes(b)?.as_deref(), Some(&b"bravo-v1"[..]));
    dm.close()?;

    // The clean close above means the next open skips recovery.
    let dm = DataManager::open(&base, cfg(), Arc::clone(&tm))?;
    assert!(dm.recovery_stats().is_none());
    dm.close()?;
    Ok(())
}

#[test]
fn active_transaction_is_undone_and_aborted() -> Result<()> {
    let (base, tm) = fresh("crash-undo")?;
    let (kept, loose, x2);
    {
        let dm = DataManager::create(&base, cfg(), Arc::clone(&tm))?;
        let x1 = tm.begin()?;
        kept = dm.insert(x1, b"original")?;
        tm.commit(x1)?;

        x2 = tm.begin()?;
        assert!(dm.update(x2, kept, b"modified")?);
        assert!(dm.update(x2, kept, b"twice!!!")?);
        loose = dm.insert(x2, b"never committed")?;
        assert_eq!(dm.read_bytes(kept)?.as_deref(), Some(&b"twice!!!"[..]));
        // crash with x2 still active
    }

    let tm = reopen_tm(&base)?;
    assert!(tm.is_active(x2)?);
    let dm = DataManager::open(&base, cfg(), Arc::clone(&tm))?;
    let stats = dm.recovery_stats().expect("recovery must run").clone();
    assert_eq!(stats.aborted_txns, 1);
    assert_eq!(stats.undone, 3);

    assert_eq!(dm.read_bytes(kept)?.as_deref(), Some(&b"original"[..]));
    assert!(dm.read_bytes(loose)?.is_none(), "undone insert is a tombstone");
    assert!(tm.is_aborted(x2)?);
    assert!(!tm.is_active(x2)?);
    dm.close()?;
    Ok(())
}

#[test]
fn aborted_transaction_effects_are_replayed_as_logged() -> Result<()> {
    // Aborted transactions are not active, so their entries take the redo path: the
    // caller that aborted is expected to have reverted the bytes itself.
    let (base, tm) = fresh("crash-aborted")?;
    let uid;
    {
        let dm = DataManager::create(&base, cfg(), Arc::clone(&tm))?;
        let x = tm.begin()?;
        uid = dm.insert(x, b"payload")?;
        assert!(dm.delete(x, uid)?);
        tm.abort(x)?;
    }
    let tm = reopen_tm(&base)?;
    let dm = DataManager::open(&base, cfg(), Arc::clone(&tm))?;
    let stats = dm.recovery_stats().expect("recovery").clone();
    assert_eq!(stats.redone, 2);
    assert_eq!(stats.aborted_txns, 0);
    assert!(dm.read_bytes(uid)?.is_none());
    dm.close()?;
    Ok(())
}

#[test]
fn unlogged_pages_are_truncated_away() -> Result<()> {
    let (base, tm) = fresh("crash-truncate")?;
    {
        let dm = DataManager::create(&base, cfg(), Arc::clone(&tm))?;
        assert_eq!(dm.page_count(), 1);
        // crash right after create: nothing logged
    }
    let tm = reopen_tm(&base)?;
    let dm = DataManager::open(&base, cfg(), Arc::clone(&tm))?;
    assert_eq!(dm.recovery_stats().map(|s| s.max_pgno), Some(1));
    assert_eq!(dm.page_count(), 1);
    let uid = dm.insert(0, b"after recovery")?;
    assert_eq!(uid.pgno, 2);
    dm.close()?;
    Ok(())
}

// ---------- helpers ----------

fn cfg() -> DmConfig {
    DmBuilder::from_default().page_cache_pages(32).build()
}

fn reopen_tm(base: &Path) -> Result<Arc<dyn TransactionManager>> {
    Ok(Arc::new(XidFile::open(&with_suffix(base, XID_SUFFIX))?))
}

fn fresh(prefix: &str) -> Result<(PathBuf, Arc<dyn TransactionManager>)> {
    let root = unique_root(prefix);
    fs::create_dir_all(&root)?;
    let base = root.join("data");
    let tm: Arc<dyn TransactionManager> =
        Arc::new(XidFile::create(&with_suffix(&base, XID_SUFFIX))?);
    Ok((base, tm))
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pagedm-{}-{}-{}", prefix, pid, t))
}
