//! dm — the data manager: records addressed by uid on top of the page cache, the free-space
//! index and the write-ahead log.
//!
//! - core.rs — `DataManager` structure, accessors.
//! - open.rs — create / open (with recovery) / close.
//! - ops.rs  — insert, read, release, delete, update.
//! - item.rs — `DataItem` and the `before`/`after` mutation guard.
//! - uid.rs  — `Uid`.

pub mod core;
pub mod item;
pub mod open;
pub mod ops;
pub mod uid;

pub use self::core::DataManager;
pub use item::{DataItem, ItemWriteGuard};
pub use uid::Uid;
