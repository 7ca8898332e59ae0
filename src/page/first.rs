//! page/first — page 1, the validity page.
//!
//! Every open writes 8 random bytes at [100,108); a clean close copies them to [108,116).
//! On the next open, equal ranges mean the previous session shut down cleanly.

use super::Page;
use crate::consts::{FIRST_MARKER_LEN, FIRST_OFF_MARKER, PAGE_SIZE};
use crate::util::random_bytes;

const OPEN: std::ops::Range<usize> = FIRST_OFF_MARKER..FIRST_OFF_MARKER + FIRST_MARKER_LEN;
const CLOSE: std::ops::Range<usize> =
    FIRST_OFF_MARKER + FIRST_MARKER_LEN..FIRST_OFF_MARKER + 2 * FIRST_MARKER_LEN;

/// Page image for a brand-new database, already carrying an open marker.
pub fn init_first_page() -> Vec<u8> {
    let mut data = vec![0u8; PAGE_SIZE];
    data[OPEN].copy_from_slice(&random_bytes(FIRST_MARKER_LEN));
    data
}

/// Stamp a fresh open marker (session start).
pub fn set_open_marker(page: &Page) {
    let marker = random_bytes(FIRST_MARKER_LEN);
    page.write(|d| d[OPEN].copy_from_slice(&marker));
}

/// Copy the open marker into the close slot (clean shutdown).
pub fn set_close_marker(page: &Page) {
    page.write(|d| d.copy_within(OPEN, CLOSE.start));
}

/// True when the last session closed cleanly.
pub fn check(page: &Page) -> bool {
    page.read(check_raw)
}

pub fn check_raw(data: &[u8]) -> bool {
    data[OPEN] == data[CLOSE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_marker_invalidates_until_close() {
        let p = Page::new(1, &init_first_page());
        assert!(!check(&p));
        set_close_marker(&p);
        assert!(check(&p));
        set_open_marker(&p);
        assert!(!check(&p));
        set_close_marker(&p);
        assert!(check(&p));
        assert!(p.is_dirty());
    }
}
