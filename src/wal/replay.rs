//! wal/replay — crash recovery.
//!
//! Three passes over the log, each from the first entry:
//! 1. scan: highest page number referenced (at least 1); the heap file is cut to it.
//! 2. redo: entries of transactions that are no longer active are applied forward.
//! 3. undo: entries of still-active transactions are reverted newest first, per transaction;
//!    each such transaction is then marked aborted.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeMap;

use super::record::LogRecord;
use super::Logger;
use crate::consts::{ITEM_INVALID, ITEM_OFF_VALID};
use crate::metrics::{
    record_recovery_aborted_txn, record_recovery_redo, record_recovery_run, record_recovery_undo,
};
use crate::page::common::{recover_insert, recover_update};
use crate::page::Page;
use crate::pager::PageCache;
use crate::tm::TransactionManager;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RecoveryStats {
    pub max_pgno: u32,
    pub redone: u64,
    pub undone: u64,
    pub aborted_txns: u64,
}

pub fn recover(
    tm: &dyn TransactionManager,
    log: &dyn Logger,
    pc: &dyn PageCache,
) -> Result<RecoveryStats> {
    record_recovery_run();
    info!("recovery: start");
    let mut stats = RecoveryStats::default();

    // scan
    let mut max_pgno = 1u32;
    for_each_record(log, |rec| {
        max_pgno = max_pgno.max(rec.pgno());
        Ok(())
    })?;
    pc.truncate_by_pgno(max_pgno)
        .context("recovery: truncate heap file")?;
    stats.max_pgno = max_pgno;
    info!("recovery: truncate to {} pages", max_pgno);

    // redo
    for_each_record(log, |rec| {
        if tm.is_active(rec.xid())? {
            return Ok(());
        }
        redo(pc, &rec)?;
        stats.redone += 1;
        Ok(())
    })?;
    record_recovery_redo(stats.redone);
    info!("recovery: redo applied {}", stats.redone);

    // undo
    let mut pending: BTreeMap<u64, Vec<LogRecord>> = BTreeMap::new();
    for_each_record(log, |rec| {
        if tm.is_active(rec.xid())? {
            pending.entry(rec.xid()).or_default().push(rec);
        }
        Ok(())
    })?;
    for (xid, recs) in pending {
        for rec in recs.iter().rev() {
            undo(pc, rec)?;
            stats.undone += 1;
        }
        tm.abort(xid)
            .with_context(|| format!("recovery: abort xid {}", xid))?;
        record_recovery_aborted_txn();
        stats.aborted_txns += 1;
        debug!("recovery: rolled back xid {} ({} entries)", xid, recs.len());
    }
    record_recovery_undo(stats.undone);
    info!(
        "recovery: undo {} txns ({} entries)",
        stats.aborted_txns, stats.undone
    );

    log.rewind()?;
    Ok(stats)
}

fn for_each_record(
    log: &dyn Logger,
    mut f: impl FnMut(LogRecord) -> Result<()>,
) -> Result<()> {
    log.rewind()?;
    while let Some(buf) = log.next()? {
        f(LogRecord::decode(&buf)?)?;
    }
    Ok(())
}

/// Borrow a page for `f`, releasing it on every path.
fn with_page(pc: &dyn PageCache, pgno: u32, f: impl FnOnce(&Page) -> Result<()>) -> Result<()> {
    let page = pc
        .get_page(pgno)
        .with_context(|| format!("recovery: load page {}", pgno))?;
    let res = f(&page);
    let rel = pc.release(&page);
    res.and(rel)
}

fn redo(pc: &dyn PageCache, rec: &LogRecord) -> Result<()> {
    match rec {
        LogRecord::Insert {
            pgno, offset, raw, ..
        } => with_page(pc, *pgno, |p| recover_insert(p, raw, *offset)),
        LogRecord::Update { uid, new_raw, .. } => {
            with_page(pc, uid.pgno, |p| recover_update(p, new_raw, uid.offset))
        }
    }
}

fn undo(pc: &dyn PageCache, rec: &LogRecord) -> Result<()> {
    match rec {
        LogRecord::Insert {
            pgno, offset, raw, ..
        } => {
            let mut dead = raw.clone();
            if let Some(flag) = dead.get_mut(ITEM_OFF_VALID) {
                *flag = ITEM_INVALID;
            }
            with_page(pc, *pgno, |p| recover_insert(p, &dead, *offset))
        }
        LogRecord::Update { uid, old_raw, .. } => {
            with_page(pc, uid.pgno, |p| recover_update(p, old_raw, uid.offset))
        }
    }
}
