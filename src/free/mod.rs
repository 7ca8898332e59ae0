//! free — in-memory free-space index.
//!
//! Pages are filed into 41 buckets by `free / (PAGE_SIZE / 40)`. The index is advisory:
//! it holds page numbers and the free byte count seen at `add` time, never page handles.
//! `select` removes the entry it returns; the caller re-adds the page with its current free
//! space once done with it, so a page is never in the index while someone writes to it.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::consts::{FREE_INTERVALS, FREE_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub pgno: u32,
    pub free_space: usize,
}

pub struct PageIndex {
    buckets: Mutex<Vec<VecDeque<PageInfo>>>,
}

#[inline]
fn bucket_of(space: usize) -> usize {
    (space / FREE_THRESHOLD).min(FREE_INTERVALS)
}

impl PageIndex {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(vec![VecDeque::new(); FREE_INTERVALS + 1]),
        }
    }

    pub fn add(&self, pgno: u32, free_space: usize) {
        let mut b = self.buckets.lock().unwrap();
        b[bucket_of(free_space)].push_back(PageInfo { pgno, free_space });
    }

    /// Take a page that can hold `space` bytes.
    ///
    /// Buckets above the request's own bucket hold only pages that fit, so the first
    /// non-empty one wins. The request's own bucket is searched last and entry by entry,
    /// since its pages may fall just short of `space`. Without that last step a record
    /// landing in the top bucket could never be placed; it applies to every bucket, not
    /// only the top one, and never yields a page with less than `space` free.
    pub fn select(&self, space: usize) -> Option<PageInfo> {
        let mut b = self.buckets.lock().unwrap();
        let own = bucket_of(space);
        for list in b.iter_mut().skip(own + 1) {
            if let Some(pi) = list.pop_front() {
                return Some(pi);
            }
        }
        let pos = b[own].iter().position(|pi| pi.free_space >= space)?;
        b[own].remove(pos)
    }

    /// Number of pages currently indexed.
    pub fn len(&self) -> usize {
        self.buckets.lock().unwrap().iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PageIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_PAGE_DATA;

    #[test]
    fn select_prefers_higher_bucket_and_removes() {
        let idx = PageIndex::new();
        idx.add(2, 100);
        idx.add(3, 5000);
        let pi = idx.select(90).unwrap();
        // 100 shares bucket 0 with 90; the 5000-byte page is taken first.
        assert_eq!(pi.pgno, 3);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.select(90).unwrap().pgno, 2);
        assert!(idx.select(90).is_none());
    }

    #[test]
    fn same_bucket_entry_must_actually_fit() {
        let idx = PageIndex::new();
        idx.add(7, FREE_THRESHOLD + 10);
        assert!(idx.select(FREE_THRESHOLD + 11).is_none());
        assert_eq!(idx.select(FREE_THRESHOLD + 10).unwrap().pgno, 7);
    }

    #[test]
    fn full_page_serves_largest_record() {
        let idx = PageIndex::new();
        idx.add(4, MAX_PAGE_DATA);
        let pi = idx.select(MAX_PAGE_DATA).unwrap();
        assert_eq!(pi.pgno, 4);
        assert!(idx.is_empty());
    }

    #[test]
    fn never_returns_a_page_that_is_too_small() {
        let mut rng = oorandom::Rand32::new(0x5eed);
        let idx = PageIndex::new();
        for pgno in 2..200u32 {
            idx.add(pgno, rng.rand_range(0..MAX_PAGE_DATA as u32) as usize);
        }
        for _ in 0..400 {
            let want = rng.rand_range(1..MAX_PAGE_DATA as u32) as usize;
            if let Some(pi) = idx.select(want) {
                assert!(pi.free_space >= want);
            }
        }
    }
}
