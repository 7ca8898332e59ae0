use anyhow::{Context, Result};
use std::path::PathBuf;

use pagedm::Uid;

use crate::util::{display_bytes, open_dm};

pub fn exec(path: PathBuf, uid: Uid, out: Option<PathBuf>) -> Result<()> {
    let (dm, _tm) = open_dm(&path)?;
    let found = dm.read_bytes(uid);
    dm.close()?;
    match found? {
        Some(bytes) => match out {
            Some(p) => {
                std::fs::write(&p, &bytes).with_context(|| format!("write {}", p.display()))?;
                println!("{} bytes -> {}", bytes.len(), p.display());
            }
            None => println!("{}", display_bytes(&bytes)),
        },
        None => println!("not found"),
    }
    Ok(())
}
