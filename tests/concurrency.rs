use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use pagedm::consts::XID_SUFFIX;
use pagedm::util::with_suffix;
use pagedm::{DataManager, DmBuilder, TransactionManager, Uid, XidFile};

const THREADS: usize = 8;
const PER_THREAD: usize = 60;

#[test]
fn parallel_writers_then_crash_and_reopen() -> Result<()> {
    let root = unique_root("concurrency");
    fs::create_dir_all(&root)?;
    let base = root.join("data");
    let xid_path = with_suffix(&base, XID_SUFFIX);
    let tm: Arc<dyn TransactionManager> = Arc::new(XidFile::create(&xid_path)?);
    let cfg = DmBuilder::from_default().page_cache_pages(32).build();
    let dm = Arc::new(DataManager::create(&base, cfg.clone(), Arc::clone(&tm))?);

    let mut handles = Vec::new();
    for t in 0..THREADS {
        let dm = Arc::clone(&dm);
        let tm = Arc::clone(&tm);
        handles.push(thread::spawn(move || -> Result<Vec<(Uid, Vec<u8>, bool)>> {
            let mut rng = oorandom::Rand32::new(t as u64 + 1);
            let xid = tm.begin()?;
            let mut out = Vec::with_capacity(PER_THREAD);
            for i in 0..PER_THREAD {
                let len = rng.rand_range(4..300) as usize;
                let payload: Vec<u8> = (0..len).map(|j| (t * 31 + i + j) as u8).collect();
                let uid = dm.insert(xid, &payload)?;
                out.push((uid, payload, true));
            }
            // Readers and writers of distinct records interleave freely.
            for (i, (uid, payload, live)) in out.iter_mut().enumerate() {
                assert_eq!(dm.read_bytes(*uid)?.as_deref(), Some(payload.as_slice()));
                match i % 3 {
                    0 => {
                        assert!(dm.delete(xid, *uid)?);
                        *live = false;
                    }
                    1 => {
                        payload.iter_mut().for_each(|b| *b = !*b);
                        assert!(dm.update(xid, *uid, payload)?);
                    }
                    _ => {}
                }
            }
            tm.commit(xid)?;
            Ok(out)
        }));
    }

    let mut all = Vec::new();
    for h in handles {
        all.extend(h.join().expect("writer panicked")?);
    }

    // Every uid is distinct.
    let mut uids: Vec<u64> = all.iter().map(|(u, _, _)| u.to_u64()).collect();
    uids.sort_unstable();
    uids.dedup();
    assert_eq!(uids.len(), THREADS * PER_THREAD);

    // Crash: drop without close.
    drop(dm);

    let tm: Arc<dyn TransactionManager> = Arc::new(XidFile::open(&xid_path)?);
    let dm = DataManager::open(&base, cfg, Arc::clone(&tm))?;
    assert!(dm.recovery_stats().is_some());
    for (uid, payload, live) in &all {
        let got = dm.read_bytes(*uid)?;
        if *live {
            assert_eq!(got.as_deref(), Some(payload.as_slice()), "uid {}", uid);
        } else {
            assert!(got.is_none(), "uid {} should be deleted", uid);
        }
    }
    dm.close()?;
    Ok(())
}

#[test]
fn same_record_readers_share_one_item() -> Result<()> {
    let root = unique_root("shared-item");
    fs::create_dir_all(&root)?;
    let base = root.join("data");
    let tm: Arc<dyn TransactionManager> =
        Arc::new(XidFile::create(&with_suffix(&base, XID_SUFFIX))?);
    let cfg = DmBuilder::from_default().page_cache_pages(16).build();
    let dm = Arc::new(DataManager::create(&base, cfg, Arc::clone(&tm))?);
    let uid = dm.insert(0, b"shared")?;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let dm = Arc::clone(&dm);
            thread::spawn(move || -> Result<()> {
                for _ in 0..200 {
                    let item = dm.read(uid)?.expect("live");
                    assert_eq!(item.payload(), b"shared");
                    dm.release(&item)?;
                }
                Ok(())
            })
        })
        .collect();
    for h in handles {
        h.join().expect("reader panicked")?;
    }
    dm.close()?;
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
