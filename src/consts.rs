//! Shared format constants (heap file, pages, WAL, xid file).

// -------- Files --------
pub const DB_SUFFIX: &str = ".db";
pub const LOG_SUFFIX: &str = ".log";
pub const XID_SUFFIX: &str = ".xid";

// -------- Pages --------
/// Fixed page size of the heap file.
pub const PAGE_SIZE: usize = 1 << 13;

/// Page 1 holds the validity markers, records start on page 2.
pub const FIRST_PGNO: u32 = 1;

/// Smallest page cache the engine agrees to run with.
pub const PAGE_CACHE_MIN_PAGES: usize = 10;

// Common page layout: [fso u16][data ...]
pub const PAGE_OFF_FSO: usize = 0;
pub const PAGE_OFF_DATA: usize = 2;
pub const MAX_PAGE_DATA: usize = PAGE_SIZE - PAGE_OFF_DATA;

// First page: random marker at [100,108), its copy at [108,116) after a clean close.
pub const FIRST_OFF_MARKER: usize = 100;
pub const FIRST_MARKER_LEN: usize = 8;

// -------- DataItem --------
// [valid u8][size u16][payload]
pub const ITEM_OFF_VALID: usize = 0;
pub const ITEM_OFF_SIZE: usize = 1;
pub const ITEM_OFF_DATA: usize = 3;
pub const ITEM_VALID: u8 = 0;
pub const ITEM_INVALID: u8 = 1;

// -------- Free-space index --------
pub const FREE_INTERVALS: usize = 40;
pub const FREE_THRESHOLD: usize = PAGE_SIZE / FREE_INTERVALS;

/// Select attempts before an insert reports `DatabaseBusy`.
pub const INSERT_SELECT_ATTEMPTS: usize = 5;

// -------- WAL --------
// File: [xchecksum i32][entry]*
// Entry: [size u32][checksum i32][payload]
pub const WAL_HDR_SIZE: u64 = 4;
pub const WAL_ENTRY_OFF_SIZE: usize = 0;
pub const WAL_ENTRY_OFF_CHECKSUM: usize = 4;
pub const WAL_ENTRY_OFF_DATA: usize = 8;
pub const WAL_CHECKSUM_SEED: i32 = 13331;

// Log record types
pub const LOG_TYPE_INSERT: u8 = 0;
pub const LOG_TYPE_UPDATE: u8 = 1;

// -------- Transaction status file --------
pub const XID_HDR_SIZE: u64 = 8;
pub const XID_FIELD_SIZE: u64 = 1;
pub const XID_ACTIVE: u8 = 0;
pub const XID_COMMITTED: u8 = 1;
pub const XID_ABORTED: u8 = 2;
pub const SUPER_XID: u64 = 0;
