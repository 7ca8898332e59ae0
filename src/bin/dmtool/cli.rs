use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pagedm::Uid;

/// Inspect and poke a pagedm database (`<path>.db`, `<path>.log`, `<path>.xid`).
#[derive(Parser, Debug)]
#[command(name = "dmtool", version, about = "pagedm diagnostics")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create a new, empty database
    Create {
        #[arg(long)]
        path: PathBuf,
    },
    /// Insert one record in its own transaction; prints the uid
    Insert {
        #[arg(long)]
        path: PathBuf,
        /// Literal UTF-8, `hex:..`, `@file` or `-` for stdin
        #[arg(long)]
        value: String,
    },
    /// Read a record by uid (decimal, 0x-hex or pgno:offset)
    Read {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        uid: Uid,
        /// Write the raw payload to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Overwrite a record with a payload of the same length
    Update {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        uid: Uid,
        #[arg(long)]
        value: String,
    },
    /// Tombstone a record
    Delete {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        uid: Uid,
    },
    /// File sizes, shutdown state, log health, transaction counter (read-only)
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Decode every entry of the write-ahead log (read-only)
    LogDump {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
