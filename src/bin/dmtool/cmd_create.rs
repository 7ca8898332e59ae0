use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use pagedm::consts::XID_SUFFIX;
use pagedm::util::with_suffix;
use pagedm::{DataManager, DmConfig, TransactionManager, XidFile};

pub fn exec(path: PathBuf) -> Result<()> {
    let tm: Arc<dyn TransactionManager> =
        Arc::new(XidFile::create(&with_suffix(&path, XID_SUFFIX))?);
    let dm = DataManager::create(&path, DmConfig::from_env(), Arc::clone(&tm))?;
    dm.close()?;
    tm.close()?;
    println!("created {}", path.display());
    Ok(())
}
