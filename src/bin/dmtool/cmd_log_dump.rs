use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use pagedm::consts::LOG_SUFFIX;
use pagedm::util::with_suffix;
use pagedm::wal::{scan_file, LogRecord};

#[derive(Serialize)]
struct Entry {
    index: u64,
    kind: &'static str,
    xid: u64,
    pgno: u32,
    offset: u16,
    len: usize,
}

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let (scan, payloads) = scan_file(&with_suffix(&path, LOG_SUFFIX))?;
    let mut entries = Vec::with_capacity(payloads.len());
    for (i, p) in payloads.iter().enumerate() {
        let rec = LogRecord::decode(p)?;
        let len = match &rec {
            LogRecord::Insert { raw, .. } => raw.len(),
            LogRecord::Update { new_raw, .. } => new_raw.len(),
        };
        entries.push(Entry {
            index: i as u64,
            kind: rec.kind(),
            xid: rec.xid(),
            pgno: rec.pgno(),
            offset: rec.offset(),
            len,
        });
    }

    if json {
        println!("{}", serde_json::to_string(&entries)?);
        return Ok(());
    }
    for e in &entries {
        println!(
            "#{:<6} {:<6} xid={:<8} page={:<6} off={:<5} len={}",
            e.index, e.kind, e.xid, e.pgno, e.offset, e.len
        );
    }
    if scan.torn {
        println!("-- torn tail at byte {} of {}", scan.good_end, scan.file_len);
    }
    Ok(())
}
