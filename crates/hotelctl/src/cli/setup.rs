use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hotelctl",
    bin_name = "hotelctl",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Manage hotel listings with remote sync and local fallback", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory of the local listing store
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to hotelstore.toml in the platform config dir)
    #[arg(long, global = true, value_name = "FILE", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Attach an empty in-process remote store for this invocation; the
    /// local data is used read-only
    #[arg(long, global = true, help_heading = "Options")]
    pub demo_remote: bool,

    /// Verbose logging on stderr
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Add a pending listing from a JSON object
    Add {
        /// e.g. '{"name": "Lake View Inn", "rate": 100}'
        json: String,
    },

    /// Approve a pending listing
    Approve { id: String },

    /// Reject (drop) a pending listing
    Reject { id: String },

    /// List approved listings, newest first
    #[command(alias = "ls")]
    List {
        /// List pending listings instead
        #[arg(long)]
        pending: bool,
    },

    /// Merge a JSON object into an approved listing
    Update { id: String, json: String },

    /// Delete an approved listing
    #[command(alias = "rm")]
    Delete { id: String },

    /// Snapshot both collections into the backup slot
    Backup,

    /// Restore the local collections from the backup slot
    Restore,

    /// Copy local listings into the remote store
    Migrate,

    /// Print every update of a live feed
    Watch {
        /// Watch pending listings instead
        #[arg(long)]
        pending: bool,

        /// Stop after this many deliveries (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<usize>,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
