// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "tick-archive")]
#[command(about = concat!("Tick archive storage engine v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML), overlaid on built-in defaults and
    /// overridden by `TICK_ARCHIVE_*` environment variables
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the ingest demo: generate synthetic ticks and organisms, batch
    /// them through a streaming write session, and commit on a fixed
    /// interval until `tick_count` ticks have been written or a shutdown
    /// signal (SIGTERM/SIGINT/SIGHUP) arrives.
    Run {
        /// Number of ticks to generate and ingest
        #[arg(long, default_value = "1000")]
        tick_count: u64,

        /// Number of synthetic organisms alive per tick
        #[arg(long, default_value = "8")]
        organisms_per_tick: u32,

        /// Ticks staged per commit window
        #[arg(long, default_value = "50")]
        batch_size: u64,
    },

    /// Read back the environment chunk covering a single tick and print its
    /// cell-grid dimensions and counters.
    ReadTick {
        /// Tick number to look up
        tick: u64,
    },

    /// Print the lowest and highest tick number currently archived in the
    /// organism archive.
    Inspect,

    /// Validate a configuration file without starting any ingest work.
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
}

/// Parse CLI arguments
///
/// This is the entry point for CLI parsing. It uses clap to parse
/// arguments and returns the parsed CLI structure.
///
/// # Panics
///
/// Clap will exit the process with appropriate error message if parsing fails
pub fn parse_cli() -> Cli {
    Cli::parse()
}
