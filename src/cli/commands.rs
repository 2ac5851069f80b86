//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tap-kpa command-line interface
#[derive(Parser, Debug)]
#[command(name = "tap-kpa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test credentials against the API
    Check,

    /// Discover available streams and emit the catalog document
    Discover,

    /// Extract records and emit messages on stdout
    Sync {
        /// Catalog file with selection annotations
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Prior state file to resume from
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Print connector metadata and the settings it accepts
    About,
}
