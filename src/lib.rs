// Base modules
pub mod consts;
pub mod error;
pub mod config;
pub mod metrics;
pub mod lock;
pub mod util; // src/util/mod.rs

// Storage layers (directories with mod.rs)
pub mod cache; // generic ref-counted cache
pub mod page;  // src/page/{mod,common,first}.rs
pub mod pager; // src/pager/{mod,core,io,alloc}.rs
pub mod free;  // src/free/mod.rs
pub mod wal;   // src/wal/{mod,encode,reader,writer,record,replay}.rs
pub mod tm;    // src/tm/mod.rs
pub mod dm;    // src/dm/{mod,core,open,ops,item,uid}.rs

// Convenience re-exports
pub use config::{DmBuilder, DmConfig};
pub use dm::{DataItem, DataManager, ItemWriteGuard, Uid};
pub use error::DmError;
pub use pager::{FilePageCache, PageCache};
pub use tm::{TransactionManager, XidFile};
pub use wal::{FileLogger, Logger, RecoveryStats};
