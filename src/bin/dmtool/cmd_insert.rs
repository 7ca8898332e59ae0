use anyhow::Result;
use std::path::PathBuf;

use crate::util::{decode_value_arg, in_txn, open_dm};

pub fn exec(path: PathBuf, value: String) -> Result<()> {
    let bytes = decode_value_arg(&value)?;
    let (dm, tm) = open_dm(&path)?;
    let uid = in_txn(tm.as_ref(), |xid| dm.insert(xid, &bytes))?;
    dm.close()?;
    println!("{} (page {}, offset {})", uid, uid.pgno, uid.offset);
    Ok(())
}
