//! Lightweight global metrics.
//!
//! Thread-safe atomic counters for the page cache, the WAL, recovery and the insert path.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Page cache -----
static PAGE_CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static PAGE_CACHE_MISSES: AtomicU64 = AtomicU64::new(0);
static PAGE_CACHE_EVICTIONS: AtomicU64 = AtomicU64::new(0);
static PAGE_FLUSHES: AtomicU64 = AtomicU64::new(0);
static PAGES_ALLOCATED: AtomicU64 = AtomicU64::new(0);

// ----- WAL -----
static WAL_APPENDS_TOTAL: AtomicU64 = AtomicU64::new(0);
static WAL_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static WAL_FSYNC_CALLS: AtomicU64 = AtomicU64::new(0);
static WAL_TAIL_TRUNCATIONS: AtomicU64 = AtomicU64::new(0);

// ----- Recovery -----
static RECOVERY_RUNS: AtomicU64 = AtomicU64::new(0);
static RECOVERY_REDO: AtomicU64 = AtomicU64::new(0);
static RECOVERY_UNDO: AtomicU64 = AtomicU64::new(0);
static RECOVERY_ABORTED_TXNS: AtomicU64 = AtomicU64::new(0);

// ----- Data manager -----
static DM_INSERTS: AtomicU64 = AtomicU64::new(0);
static DM_INSERT_NEW_PAGES: AtomicU64 = AtomicU64::new(0);
static DM_BUSY: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub page_cache_hits: u64,
    pub page_cache_misses: u64,
    pub page_cache_evictions: u64,
    pub page_flushes: u64,
    pub pages_allocated: u64,

    pub wal_appends_total: u64,
    pub wal_bytes_written: u64,
    pub wal_fsync_calls: u64,
    pub wal_tail_truncations: u64,

    pub recovery_runs: u64,
    pub recovery_redo: u64,
    pub recovery_undo: u64,
    pub recovery_aborted_txns: u64,

    pub dm_inserts: u64,
    pub dm_insert_new_pages: u64,
    pub dm_busy: u64,
}

impl MetricsSnapshot {
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.page_cache_hits + self.page_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.page_cache_hits as f64 / total as f64
        }
    }
}

// ----- Recorders (page cache) -----
pub fn record_cache_hit() {
    PAGE_CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_cache_miss() {
    PAGE_CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_cache_eviction() {
    PAGE_CACHE_EVICTIONS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_page_flush() {
    PAGE_FLUSHES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_page_allocated() {
    PAGES_ALLOCATED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (WAL) -----
pub fn record_wal_append(entry_len: usize) {
    WAL_APPENDS_TOTAL.fetch_add(1, Ordering::Relaxed);
    WAL_BYTES_WRITTEN.fetch_add(entry_len as u64, Ordering::Relaxed);
}
pub fn record_wal_fsync() {
    WAL_FSYNC_CALLS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_wal_tail_truncation() {
    WAL_TAIL_TRUNCATIONS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (recovery) -----
pub fn record_recovery_run() {
    RECOVERY_RUNS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_recovery_redo(n: u64) {
    RECOVERY_REDO.fetch_add(n, Ordering::Relaxed);
}
pub fn record_recovery_undo(n: u64) {
    RECOVERY_UNDO.fetch_add(n, Ordering::Relaxed);
}
pub fn record_recovery_aborted_txn() {
    RECOVERY_ABORTED_TXNS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (data manager) -----
pub fn record_insert() {
    DM_INSERTS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_insert_new_page() {
    DM_INSERT_NEW_PAGES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_busy() {
    DM_BUSY.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        page_cache_hits: PAGE_CACHE_HITS.load(Ordering::Relaxed),
        page_cache_misses: PAGE_CACHE_MISSES.load(Ordering::Relaxed),
        page_cache_evictions: PAGE_CACHE_EVICTIONS.load(Ordering::Relaxed),
        page_flushes: PAGE_FLUSHES.load(Ordering::Relaxed),
        pages_allocated: PAGES_ALLOCATED.load(Ordering::Relaxed),

        wal_appends_total: WAL_APPENDS_TOTAL.load(Ordering::Relaxed),
        wal_bytes_written: WAL_BYTES_WRITTEN.load(Ordering::Relaxed),
        wal_fsync_calls: WAL_FSYNC_CALLS.load(Ordering::Relaxed),
        wal_tail_truncations: WAL_TAIL_TRUNCATIONS.load(Ordering::Relaxed),

        recovery_runs: RECOVERY_RUNS.load(Ordering::Relaxed),
        recovery_redo: RECOVERY_REDO.load(Ordering::Relaxed),
        recovery_undo: RECOVERY_UNDO.load(Ordering::Relaxed),
        recovery_aborted_txns: RECOVERY_ABORTED_TXNS.load(Ordering::Relaxed),

        dm_inserts: DM_INSERTS.load(Ordering::Relaxed),
        dm_insert_new_pages: DM_INSERT_NEW_PAGES.load(Ordering::Relaxed),
        dm_busy: DM_BUSY.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    PAGE_CACHE_HITS.store(0, Ordering::Relaxed);
    PAGE_CACHE_MISSES.store(0, Ordering::Relaxed);
    PAGE_CACHE_EVICTIONS.store(0, Ordering::Relaxed);
    PAGE_FLUSHES.store(0, Ordering::Relaxed);
    PAGES_ALLOCATED.store(0, Ordering::Relaxed);

    WAL_APPENDS_TOTAL.store(0, Ordering::Relaxed);
    WAL_BYTES_WRITTEN.store(0, Ordering::Relaxed);
    WAL_FSYNC_CALLS.store(0, Ordering::Relaxed);
    WAL_TAIL_TRUNCATIONS.store(0, Ordering::Relaxed);

    RECOVERY_RUNS.store(0, Ordering::Relaxed);
    RECOVERY_REDO.store(0, Ordering::Relaxed);
    RECOVERY_UNDO.store(0, Ordering::Relaxed);
    RECOVERY_ABORTED_TXNS.store(0, Ordering::Relaxed);

    DM_INSERTS.store(0, Ordering::Relaxed);
    DM_INSERT_NEW_PAGES.store(0, Ordering::Relaxed);
    DM_BUSY.store(0, Ordering::Relaxed);
}
