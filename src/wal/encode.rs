//! wal/encode — entry framing and checksums.

use byteorder::{BigEndian, ByteOrder};

use crate::consts::{
    WAL_CHECKSUM_SEED, WAL_ENTRY_OFF_CHECKSUM, WAL_ENTRY_OFF_DATA, WAL_ENTRY_OFF_SIZE,
};

/// `acc * SEED + b` over `bytes`, bytes taken as signed, 32-bit wrapping.
#[inline]
pub fn fold(acc: i32, bytes: &[u8]) -> i32 {
    bytes.iter().fold(acc, |acc, &b| {
        acc.wrapping_mul(WAL_CHECKSUM_SEED).wrapping_add(b as i8 as i32)
    })
}

/// Frame a payload: `[size][checksum][payload]`.
pub fn wrap_entry(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; WAL_ENTRY_OFF_DATA + payload.len()];
    BigEndian::write_u32(
        &mut out[WAL_ENTRY_OFF_SIZE..WAL_ENTRY_OFF_CHECKSUM],
        payload.len() as u32,
    );
    BigEndian::write_i32(
        &mut out[WAL_ENTRY_OFF_CHECKSUM..WAL_ENTRY_OFF_DATA],
        fold(0, payload),
    );
    out[WAL_ENTRY_OFF_DATA..].copy_from_slice(payload);
    out
}
