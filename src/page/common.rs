//! page/common — layout of record pages.
//!
//! ```text
//! [0..2)    free-space offset (u16 BE), initially 2
//! [2..fso)  records, appended back to back
//! [fso..)   free
//! ```
//!
//! Records are never moved or removed, so the offset only grows.

use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ByteOrder};

use super::Page;
use crate::consts::{PAGE_OFF_DATA, PAGE_OFF_FSO, PAGE_SIZE};

/// Fresh record page image.
pub fn init_page() -> Vec<u8> {
    let mut data = vec![0u8; PAGE_SIZE];
    set_fso_raw(&mut data, PAGE_OFF_DATA as u16);
    data
}

#[inline]
pub fn fso_raw(data: &[u8]) -> u16 {
    BigEndian::read_u16(&data[PAGE_OFF_FSO..PAGE_OFF_FSO + 2])
}

#[inline]
fn set_fso_raw(data: &mut [u8], off: u16) {
    BigEndian::write_u16(&mut data[PAGE_OFF_FSO..PAGE_OFF_FSO + 2], off);
}

/// Current free-space offset.
pub fn fso(page: &Page) -> u16 {
    page.read(fso_raw)
}

/// Free bytes left on the page.
pub fn free_space(page: &Page) -> usize {
    PAGE_SIZE.saturating_sub(fso(page) as usize)
}

/// Free bytes of a raw page image.
pub fn free_space_raw(data: &[u8]) -> usize {
    PAGE_SIZE.saturating_sub(fso_raw(data) as usize)
}

/// Append `data` at the free edge and return where it landed.
pub fn insert_data(page: &Page, data: &[u8]) -> Result<u16> {
    page.write(|buf| {
        let off = fso_raw(buf) as usize;
        let end = off + data.len();
        if end > PAGE_SIZE {
            return Err(anyhow!(
                "page {}: {} bytes do not fit at offset {}",
                page.pgno(),
                data.len(),
                off
            ));
        }
        buf[off..end].copy_from_slice(data);
        set_fso_raw(buf, end as u16);
        Ok(off as u16)
    })
}

/// Replay an insert at a fixed offset. The free-space offset only moves forward, so replaying
/// an old insert on a page that grew since is harmless.
pub fn recover_insert(page: &Page, data: &[u8], offset: u16) -> Result<()> {
    page.write(|buf| {
        let off = offset as usize;
        let end = off + data.len();
        if off < PAGE_OFF_DATA || end > PAGE_SIZE {
            return Err(anyhow!(
                "page {}: insert replay [{}, {}) outside the data area",
                page.pgno(),
                off,
                end
            ));
        }
        buf[off..end].copy_from_slice(data);
        if (fso_raw(buf) as usize) < end {
            set_fso_raw(buf, end as u16);
        }
        Ok(())
    })
}

/// Overwrite bytes in place. Updates never change a record's length, so the free-space
/// offset is left alone.
pub fn recover_update(page: &Page, data: &[u8], offset: u16) -> Result<()> {
    page.write(|buf| {
        let off = offset as usize;
        let end = off + data.len();
        if off < PAGE_OFF_DATA || end > PAGE_SIZE {
            return Err(anyhow!(
                "page {}: update replay [{}, {}) outside the data area",
                page.pgno(),
                off,
                end
            ));
        }
        buf[off..end].copy_from_slice(data);
        Ok(())
    })
}
