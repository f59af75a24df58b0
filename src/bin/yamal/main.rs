use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_init;
mod cmd_status;
mod cmd_dump;
mod cmd_write;
mod cmd_close;
mod cmd_prealloc;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт: info.
    // Пример: RUST_LOG=debug yamal status --path ./log.ytp
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
        cli::Cmd::Init { path, closable } => cmd_init::exec(path, closable),

        cli::Cmd::Status { path, json } => cmd_status::exec(path, json),

        cli::Cmd::Dump {
            path,
            list,
            hex,
            follow,
        } => cmd_dump::exec(path, list, hex, follow),

        cli::Cmd::Write { path, list, value } => cmd_write::exec(path, list, value),

        cli::Cmd::Close { path, list } => cmd_close::exec(path, list),

        cli::Cmd::Prealloc { path, size } => cmd_prealloc::exec(path, size),
    }
}
