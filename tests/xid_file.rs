use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use pagedm::consts::{SUPER_XID, XID_ABORTED, XID_ACTIVE, XID_COMMITTED};
use pagedm::error::kind_of;
use pagedm::{DmError, TransactionManager, XidFile};

#[test]
fn statuses_are_one_byte_per_xid() -> Result<()> {
    let root = unique_root("xid-layout");
    fs::create_dir_all(&root)?;
    let path = root.join("t.xid");

    let tm = XidFile::create(&path)?;
    assert_eq!(fs::metadata(&path)?.len(), 8);
    let a = tm.begin()?;
    let b = tm.begin()?;
    let c = tm.begin()?;
    assert_eq!((a, b, c), (1, 2, 3));
    tm.commit(a)?;
    tm.abort(c)?;

    assert!(tm.is_committed(a)?);
    assert!(tm.is_active(b)?);
    assert!(tm.is_aborted(c)?);
    assert!(!tm.is_active(c)?);
    tm.close()?;
    drop(tm);

    let bytes = fs::read(&path)?;
    assert_eq!(bytes.len(), 8 + 3);
    assert_eq!(&bytes[..8], &3u64.to_be_bytes());
    assert_eq!(&bytes[8..], &[XID_COMMITTED, XID_ACTIVE, XID_ABORTED]);

    let tm = XidFile::open(&path)?;
    assert_eq!(tm.counter(), 3);
    assert!(tm.is_active(b)?);
    assert_eq!(tm.begin()?, 4);
    Ok(())
}

#[test]
fn super_xid_is_always_committed() -> Result<()> {
    let root = unique_root("xid-super");
    fs::create_dir_all(&root)?;
    let tm = XidFile::create(&root.join("s.xid"))?;
    assert!(!tm.is_active(SUPER_XID)?);
    assert!(tm.is_committed(SUPER_XID)?);
    assert!(!tm.is_aborted(SUPER_XID)?);

    let err = tm.commit(SUPER_XID).unwrap_err();
    assert!(matches!(kind_of(&err), Some(DmError::BadXidFile(_))));
    let err = tm.abort(7).unwrap_err();
    assert!(matches!(kind_of(&err), Some(DmError::BadXidFile(_))));
    Ok(())
}

#[test]
fn mismatched_length_is_rejected() -> Result<()> {
    let root = unique_root("xid-bad");
    fs::create_dir_all(&root)?;
    let path = root.join("b.xid");
    {
        let tm = XidFile::create(&path)?;
        tm.begin()?;
    }
    let mut bytes = fs::read(&path)?;
    bytes.push(XID_ACTIVE);
    fs::write(&path, &bytes)?;

    let err = XidFile::open(&path).err().unwrap();
    let kind = kind_of(&err).expect("typed error");
    assert!(matches!(kind, DmError::BadXidFile(_)));
    assert!(kind.is_fatal());

    let err = XidFile::create(&path).err().unwrap();
    assert!(matches!(kind_of(&err), Some(DmError::FileExists(_))));
    let err = XidFile::open(&root.join("missing.xid")).err().unwrap();
    assert!(matches!(kind_of(&err), Some(DmError::FileNotExists(_))));
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pagedm-{}-{}-{}", prefix, pid, t))
}
