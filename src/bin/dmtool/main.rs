use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_create;
mod cmd_insert;
mod cmd_read;
mod cmd_update;
mod cmd_delete;
mod cmd_status;
mod cmd_log_dump;

fn init_logger() {
    // RUST_LOG wins; default is info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Create { path } => cmd_create::exec(path),

        cli::Cmd::Insert { path, value } => cmd_insert::exec(path, value),

        cli::Cmd::Read { path, uid, out } => cmd_read::exec(path, uid, out),

        cli::Cmd::Update { path, uid, value } => cmd_update::exec(path, uid, value),

        cli::Cmd::Delete { path, uid } => cmd_delete::exec(path, uid),

        cli::Cmd::Status { path, json } => cmd_status::exec(path, json),

        cli::Cmd::LogDump { path, json } => cmd_log_dump::exec(path, json),
    }
}
