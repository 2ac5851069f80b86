//! CLI module
//!
//! Command-line interface for the tap.
//!
//! # Commands
//!
//! - `check` - Test credentials against the API
//! - `discover` - Emit the catalog document
//! - `sync` - Extract records and emit messages on stdout
//! - `about` - Print connector metadata and accepted settings

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
