use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagedm::consts::XID_SUFFIX;
use pagedm::util::with_suffix;
use pagedm::{DataManager, DmConfig, TransactionManager, XidFile};

/// Open the data manager together with its transaction file.
pub fn open_dm(path: &Path) -> Result<(DataManager, Arc<dyn TransactionManager>)> {
    let tm: Arc<dyn TransactionManager> = Arc::new(XidFile::open(&with_suffix(path, XID_SUFFIX))?);
    let dm = DataManager::open(path, DmConfig::from_env(), Arc::clone(&tm))?;
    Ok((dm, tm))
}

/// Run `f` inside one transaction: commit on success, abort on failure.
pub fn in_txn<T>(
    tm: &dyn TransactionManager,
    f: impl FnOnce(u64) -> Result<T>,
) -> Result<T> {
    let xid = tm.begin()?;
    match f(xid) {
        Ok(v) => {
            tm.commit(xid)?;
            Ok(v)
        }
        Err(e) => {
            tm.abort(xid)?;
            Err(e)
        }
    }
}

pub fn decode_value_arg(arg: &str) -> Result<Vec<u8>> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    if let Some(p) = arg.strip_prefix('@') {
        let path = PathBuf::from(p);
        let mut f = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("open value file {}", path.display()))?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        return Ok(buf);
    }
    if let Some(hx) = arg.strip_prefix("hex:") {
        return decode_hex(hx);
    }
    Ok(arg.as_bytes().to_vec())
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(anyhow!("hex string must have even length"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| anyhow!("invalid hex at pos {}", i))
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// UTF-8 text as is, anything else as `hex:..`.
pub fn display_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("hex:{}", to_hex(bytes)),
    }
}
