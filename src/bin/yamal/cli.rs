use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Инспекция и запись yamal-файлов
#[derive(Parser, Debug)]
#[command(
    name = "yamal",
    version,
    about = "yamal append log CLI",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create (or attach to) a yamal file and initialise its header
    Init {
        #[arg(long)]
        path: PathBuf,
        /// Allow lists of this file to be closed. Fixed at creation.
        #[arg(long, default_value_t = false)]
        closable: bool,
    },
    /// Print header, per-list summary and metrics
    ///
    /// Пример:
    ///   yamal status --path ./log.ytp
    ///   yamal status --path ./log.ytp --json
    Status {
        #[arg(long)]
        path: PathBuf,
        /// JSON output (single object)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the messages of one list
    Dump {
        #[arg(long)]
        path: PathBuf,
        /// List index (0 data, 1 announcements, 2 subscriptions, 3 index)
        #[arg(long, default_value_t = 0)]
        list: usize,
        /// Print payloads as hex instead of text
        #[arg(long, default_value_t = false)]
        hex: bool,
        /// Keep polling for new messages until the list is closed (Ctrl-C to stop)
        #[arg(long, default_value_t = false)]
        follow: bool,
    },
    /// Append one message (the file must already be initialised)
    ///
    /// Value: literal UTF-8, `hex:...`, `@file` or `-` for stdin.
    Write {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 0)]
        list: usize,
        #[arg(long)]
        value: String,
    },
    /// Close a list permanently (closable files only)
    Close {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        list: usize,
    },
    /// Eagerly allocate and map pages covering the first `size` bytes
    Prealloc {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        size: u64,
    },
}
