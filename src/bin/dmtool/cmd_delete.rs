use anyhow::Result;
use std::path::PathBuf;

use pagedm::Uid;

use crate::util::{in_txn, open_dm};

pub fn exec(path: PathBuf, uid: Uid) -> Result<()> {
    let (dm, tm) = open_dm(&path)?;
    let res = in_txn(tm.as_ref(), |xid| dm.delete(xid, uid));
    dm.close()?;
    if res? {
        println!("deleted {}", uid);
    } else {
        println!("not found");
    }
    Ok(())
}
