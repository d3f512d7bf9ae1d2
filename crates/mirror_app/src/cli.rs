use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::platform::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(name = "catalog-mirror")]
#[command(about = "Local mirror of an online software catalog")]
#[command(version)]
pub struct Cli {
    /// Settings file (RON). Defaults to ./catalog_mirror.ron when present.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding record files and the failure ledger.
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Catalog listing page.
    #[arg(long, value_name = "URL", global = true)]
    pub listing_url: Option<String>,

    /// Parallel extractions during a bulk harvest.
    #[arg(long, value_name = "N", global = true)]
    pub concurrency: Option<usize>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Where log lines go.
    #[arg(long, value_enum, default_value = "terminal", global = true)]
    pub log: LogTarget,

    /// Without a subcommand the interactive menu is shown.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search stored records by title.
    Search { query: String },
    /// Harvest the whole catalog again, overwriting stored records.
    Refresh {
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every record file and the failure ledger.
    Clean {
        #[arg(short, long)]
        yes: bool,
    },
    /// Retry every ledger entry sequentially.
    Retry,
    /// Find incomplete records and queue them in the failure ledger.
    Quickcheck {
        #[arg(short, long)]
        yes: bool,
    },
    /// Harvest catalog entries that have no stored record yet.
    Updates,
    /// Resolve one acquisition link of a stored record and download it.
    Download {
        /// Title search; prompted for when omitted.
        query: Option<String>,
        /// Target directory.
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
