//! Reference-counted resource cache.
//!
//! Design:
//! - HashMap<key, Entry> holds the resident values and their holder counts.
//! - `loading` holds the keys whose first fetch is in flight; a second `get` for such a key
//!   parks on the condvar until the loader finishes, then retries.
//! - A value leaves the cache only when its count drops to zero (`release`) or at shutdown
//!   (`close_all`); either way the evictor (write-back hook) sees it exactly once.
//! - Capacity counts resident and in-flight keys; 0 means unbounded.
//!
//! The loader and evictor are closures supplied by the owner (page cache, record cache).

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};

use crate::error::DmError;

pub type Loader<T> = Box<dyn Fn(u64) -> Result<T> + Send + Sync>;
pub type Evictor<T> = Box<dyn Fn(&T) -> Result<()> + Send + Sync>;

struct Entry<T> {
    value: T,
    refs: usize,
}

struct State<T> {
    entries: HashMap<u64, Entry<T>>,
    loading: HashSet<u64>,
}

pub struct RcCache<T: Clone> {
    cap: usize,
    state: Mutex<State<T>>,
    loaded: Condvar,
    loader: Loader<T>,
    evictor: Evictor<T>,
}

/// Clears a key's in-flight marker and wakes its waiters, also when the loader fails or
/// panics.
struct InFlight<'a, T: Clone> {
    cache: &'a RcCache<T>,
    key: u64,
}

impl<T: Clone> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let mut st = match self.cache.state.lock() {
            Ok(st) => st,
            Err(poisoned) => poisoned.into_inner(),
        };
        st.loading.remove(&self.key);
        drop(st);
        self.cache.loaded.notify_all();
    }
}

impl<T: Clone> RcCache<T> {
    pub fn new(cap: usize, loader: Loader<T>, evictor: Evictor<T>) -> Self {
        Self {
            cap,
            state: Mutex::new(State {
                entries: HashMap::new(),
                loading: HashSet::new(),
            }),
            loaded: Condvar::new(),
            loader,
            evictor,
        }
    }

    /// Borrow the value for `key`, loading it on first use.
    pub fn get(&self, key: u64) -> Result<T> {
        self.get_traced(key).map(|(v, _)| v)
    }

    /// Like `get`, also reports whether the value was already resident.
    pub fn get_traced(&self, key: u64) -> Result<(T, bool)> {
        let mut st = self.state.lock().unwrap();
        loop {
            if st.loading.contains(&key) {
                st = self.loaded.wait(st).unwrap();
                continue;
            }
            if let Some(e) = st.entries.get_mut(&key) {
                e.refs += 1;
                return Ok((e.value.clone(), true));
            }
            if self.cap > 0 && st.entries.len() + st.loading.len() >= self.cap {
                return Err(DmError::CacheFull.into());
            }
            st.loading.insert(key);
            break;
        }
        drop(st);

        let inflight = InFlight { cache: self, key };
        let v = (self.loader)(key)?;
        let mut st = self.state.lock().unwrap();
        st.loading.remove(&key);
        st.entries.insert(
            key,
            Entry {
                value: v.clone(),
                refs: 1,
            },
        );
        drop(st);
        drop(inflight);
        Ok((v, false))
    }

    /// Give back one reference. The last holder triggers the evictor.
    pub fn release(&self, key: u64) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        let last = match st.entries.get_mut(&key) {
            None => return Err(DmError::ReleaseUnderflow { key }.into()),
            Some(e) => {
                e.refs -= 1;
                e.refs == 0
            }
        };
        if !last {
            return Ok(());
        }
        match st.entries.remove(&key) {
            // Evict under the lock: a concurrent get of this key must see the written-back state.
            Some(e) => (self.evictor)(&e.value),
            None => Ok(()),
        }
    }

    /// Evict everything regardless of holders. Shutdown only.
    pub fn close_all(&self) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        let mut first_err = None;
        for (_, e) in st.entries.drain() {
            if let Err(err) = (self.evictor)(&e.value) {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_resident(&self, key: u64) -> bool {
        self.state.lock().unwrap().entries.contains_key(&key)
    }

    /// Current holder count, None if not resident.
    pub fn ref_count(&self, key: u64) -> Option<usize> {
        self.state.lock().unwrap().entries.get(&key).map(|e| e.refs)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}
