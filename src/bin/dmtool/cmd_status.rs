use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use pagedm::consts::{DB_SUFFIX, LOG_SUFFIX, PAGE_SIZE, XID_SUFFIX};
use pagedm::metrics::{self, MetricsSnapshot};
use pagedm::page::first;
use pagedm::util::with_suffix;
use pagedm::wal::{scan_file, LogScan};
use pagedm::XidFile;

#[derive(Serialize)]
struct Status {
    db_bytes: u64,
    pages: u64,
    clean_shutdown: bool,
    log: LogScan,
    log_checksum_ok: bool,
    xid_counter: u64,
    metrics: MetricsSnapshot,
}

fn first_page_clean(db: &Path) -> Result<bool> {
    let mut f = File::open(db).with_context(|| format!("open {}", db.display()))?;
    let mut buf = vec![0u8; PAGE_SIZE];
    f.read_exact(&mut buf)
        .with_context(|| format!("read first page of {}", db.display()))?;
    Ok(first::check_raw(&buf))
}

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let db = with_suffix(&path, DB_SUFFIX);
    let db_bytes = std::fs::metadata(&db)
        .with_context(|| format!("stat {}", db.display()))?
        .len();
    let (log, _) = scan_file(&with_suffix(&path, LOG_SUFFIX))?;
    let xid_counter = XidFile::open(&with_suffix(&path, XID_SUFFIX))?.counter();

    let st = Status {
        db_bytes,
        pages: db_bytes / PAGE_SIZE as u64,
        clean_shutdown: first_page_clean(&db)?,
        log_checksum_ok: log.checksum_ok() && !log.torn,
        log,
        xid_counter,
        metrics: metrics::snapshot(),
    };

    if json {
        println!("{}", serde_json::to_string(&st)?);
        return Ok(());
    }

    println!("path           = {}", path.display());
    println!("db bytes       = {}", st.db_bytes);
    println!("pages          = {}", st.pages);
    println!("clean shutdown = {}", st.clean_shutdown);
    println!("log bytes      = {}", st.log.file_len);
    println!("log entries    = {}", st.log.entries);
    println!(
        "log checksum   = stored {:#010x}, computed {:#010x}{}",
        st.log.stored,
        st.log.accumulated,
        if st.log.torn { " (torn tail)" } else { "" }
    );
    println!("xid counter    = {}", st.xid_counter);
    println!("cache hit ratio= {:.3}", st.metrics.cache_hit_ratio());
    Ok(())
}
