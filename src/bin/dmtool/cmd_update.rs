use anyhow::{anyhow, Result};
use std::path::PathBuf;

use pagedm::Uid;

use crate::util::{decode_value_arg, in_txn, open_dm};

pub fn exec(path: PathBuf, uid: Uid, value: String) -> Result<()> {
    let bytes = decode_value_arg(&value)?;
    let (dm, tm) = open_dm(&path)?;
    let res = in_txn(tm.as_ref(), |xid| {
        if dm.update(xid, uid, &bytes)? {
            Ok(())
        } else {
            Err(anyhow!("uid {} not found", uid))
        }
    });
    dm.close()?;
    res?;
    println!("updated {}", uid);
    Ok(())
}
