use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "parkwatch")]
#[command(about = "Live public parking availability, with an offline cache", long_about = None)]
pub struct Cli {
    /// Skip the network and serve whatever is cached
    #[arg(long, global = true)]
    pub offline: bool,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the feeds and print every update (Enter refreshes, Ctrl-C quits)
    Watch,
    /// Fetch both feeds once and print them as JSON
    Fetch,
    /// Inspect or clear the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show how old each cached snapshot is
    Status,
    /// Delete both cached snapshots
    Clear,
}
