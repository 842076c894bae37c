// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "hvr")]
#[command(about = "Capture clustered Hyper-V machine configuration and restore it from storage snapshots")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Record the configuration of every clustered machine (scheduled task)
    Capture {
        /// Backup root (overrides backup.root)
        #[arg(long)]
        destination: Option<PathBuf>,

        /// Days to keep records (overrides backup.retention_days)
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// List stored configuration records for a machine, newest first
    Records {
        /// Machine name
        entity: String,
    },

    /// Restore a machine from a storage snapshot next to the original
    Restore {
        /// Machine whose configuration records are used (prompted when omitted)
        #[arg(long)]
        entity: Option<String>,

        /// Storage volume holding the machine's files (prompted when omitted)
        #[arg(long)]
        volume: Option<String>,

        /// Record to use, 1 = newest (prompted when omitted)
        #[arg(long)]
        record_index: Option<usize>,

        /// Snapshot name (prompted when omitted)
        #[arg(long)]
        snapshot: Option<String>,

        /// Delete the clone and share once the restore ends
        #[arg(long)]
        cleanup: bool,

        /// Never prompt for cleanup; the clone and share are kept unless --cleanup is given
        #[arg(long)]
        yes: bool,
    },

    /// Delete a clone left behind by an earlier restore, and its share
    Cleanup {
        /// Clone volume name as printed in the orphan notice
        #[arg(long = "clone")]
        clone_name: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Capture { .. } => "capture",
            Command::Records { .. } => "records",
            Command::Restore { .. } => "restore",
            Command::Cleanup { .. } => "cleanup",
        }
    }
}
