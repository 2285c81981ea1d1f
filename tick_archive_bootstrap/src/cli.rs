// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration
///
/// Holds all CLI arguments after security validation: paths that must
/// already exist are canonicalized, and every numeric argument is
/// range-checked.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// Validated command variants
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run {
        tick_count: u64,
        organisms_per_tick: u32,
        batch_size: u64,
    },
    ReadTick {
        tick: u64,
    },
    Inspect,
    ValidateConfig {
        config: PathBuf,
    },
}

/// Parse and validate CLI arguments
///
/// 1. Parse CLI with clap
/// 2. Validate all paths with `SecureArgParser`
/// 3. Validate all numeric values
/// 4. Return `ValidatedCli` on success
///
/// # Errors
///
/// Returns `ParseError` if any validation fails
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

/// Validate parsed CLI arguments
fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    let command = match cli.command {
        Commands::Run {
            tick_count,
            organisms_per_tick,
            batch_size,
        } => {
            let tick_count = SecureArgParser::validate_number("tick-count", tick_count, 1, 1_000_000_000)?;
            let organisms_per_tick = SecureArgParser::validate_number("organisms-per-tick", organisms_per_tick, 0, 1_000_000)?;
            let batch_size = SecureArgParser::validate_number("batch-size", batch_size, 1, tick_count.max(1))?;
            ValidatedCommand::Run {
                tick_count,
                organisms_per_tick,
                batch_size,
            }
        }
        Commands::ReadTick { tick } => ValidatedCommand::ReadTick { tick },
        Commands::Inspect => ValidatedCommand::Inspect,
        Commands::ValidateConfig { config } => {
            let validated_config = SecureArgParser::validate_path(&config.to_string_lossy())?;
            ValidatedCommand::ValidateConfig { config: validated_config }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn validates_run_command() {
        let cli = Cli::parse_from(["tick-archive", "run", "--tick-count", "100", "--batch-size", "10"]);
        let validated = validate_cli(cli).unwrap();
        match validated.command {
            ValidatedCommand::Run {
                tick_count, batch_size, ..
            } => {
                assert_eq!(tick_count, 100);
                assert_eq!(batch_size, 10);
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn rejects_batch_size_larger_than_tick_count() {
        let cli = Cli::parse_from(["tick-archive", "run", "--tick-count", "10", "--batch-size", "50"]);
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn validates_read_tick() {
        let cli = Cli::parse_from(["tick-archive", "read-tick", "7"]);
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::ReadTick { tick: 7 }));
    }
}
