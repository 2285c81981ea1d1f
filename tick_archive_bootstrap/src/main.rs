// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Tick Archive CLI
//!
//! Entry point for the `tick-archive` binary: parses and validates CLI
//! arguments, loads layered configuration, wires the composition root, and
//! dispatches to one of the `run`/`read-tick`/`inspect`/`validate-config`
//! subcommands.

use std::sync::Arc;
use std::time::Duration;

use tick_archive::infrastructure::config::ArchiveConfig;
use tick_archive_bootstrap::cli::ValidatedCommand;
use tick_archive_bootstrap::exit_code::{result_to_exit_code, ExitCode};
use tick_archive_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use tick_archive_bootstrap::runner::{self, enforce_shutdown_escalation, install_signal_handler};
use tick_archive_bootstrap::shutdown::ShutdownCoordinator;
use tick_archive_bootstrap::{bootstrap_cli, ValidatedCli};
use tick_archive_domain::ArchiveError;

#[tokio::main]
async fn main() {
    let logger = ConsoleLogger::new();

    let validated = match bootstrap_cli() {
        Ok(validated) => validated,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(ExitCode::UsageError.as_i32());
        }
    };

    if validated.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    if let Err(e) = tick_archive::infrastructure::logging::try_init_logging() {
        eprintln!("warning: tracing subscriber already installed: {e}");
    }

    let exit_code = run(&logger, validated).await;
    std::process::exit(exit_code.as_i32());
}

async fn run(logger: &dyn BootstrapLogger, validated: ValidatedCli) -> ExitCode {
    let config_path = validated.config.as_deref().map(|p| p.to_string_lossy().into_owned());
    let config = match ArchiveConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logger.error(&format!("failed to load configuration: {e}"));
            return ExitCode::Config;
        }
    };

    let result = dispatch(logger, &config, validated.command).await;
    result_to_exit_code(result)
}

async fn dispatch(logger: &dyn BootstrapLogger, config: &ArchiveConfig, command: ValidatedCommand) -> Result<(), ArchiveError> {
    match command {
        ValidatedCommand::Run {
            tick_count,
            organisms_per_tick,
            batch_size,
        } => run_ingest(logger, config, tick_count, organisms_per_tick, batch_size).await,
        ValidatedCommand::ReadTick { tick } => read_tick(logger, config, tick).await,
        ValidatedCommand::Inspect => inspect(logger, config).await,
        ValidatedCommand::ValidateConfig { config: path } => validate_config(logger, &path),
    }
}

/// Drives the `run` subcommand: builds the composition root, installs the
/// platform signal handler against a fresh [`ShutdownCoordinator`], and runs
/// the ingest loop to completion or to a shutdown boundary.
async fn run_ingest(
    logger: &dyn BootstrapLogger,
    config: &ArchiveConfig,
    tick_count: u64,
    organisms_per_tick: u32,
    batch_size: u64,
) -> Result<(), ArchiveError> {
    let archive = Arc::new(runner::build_archive(config).await?);
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(config.shutdown_grace_period_secs));
    install_signal_handler(coordinator.clone());

    logger.info(&format!("ingesting {tick_count} ticks in batches of {batch_size}"));
    let ingest_archive = Arc::clone(&archive);
    let ingest_coordinator = coordinator.clone();
    let mut ingest = tokio::spawn(async move {
        runner::run_ingest_demo(&ingest_archive, tick_count, organisms_per_tick, batch_size, &ingest_coordinator).await
    });

    let phase_archive = Arc::clone(&archive);
    let session_phase = move || match phase_archive.session().phase() {
        tick_archive::application::write_session::Phase::Waiting => tick_archive_bootstrap::shutdown::Phase::Waiting,
        tick_archive::application::write_session::Phase::Processing => tick_archive_bootstrap::shutdown::Phase::Processing,
    };
    let interrupt_archive = Arc::clone(&archive);
    let request_interrupt = move || interrupt_archive.session().request_interrupt();

    // Only race the escalation path once a signal actually arrives —
    // `wait_for_shutdown` returns immediately if shutdown was never
    // initiated, so racing it from the start would resolve before the
    // ingest loop had a chance to do any work.
    let shutdown_signal = coordinator.token();
    tokio::select! {
        result = &mut ingest => {
            coordinator.complete_shutdown();
            result.map_err(|e| ArchiveError::io_error(format!("ingest task panicked: {e}")))?
        }
        _ = shutdown_signal.cancelled() => {
            let escalation = enforce_shutdown_escalation(&coordinator, session_phase, request_interrupt).await;
            coordinator.complete_shutdown();
            escalation
        }
    }
}

async fn read_tick(logger: &dyn BootstrapLogger, config: &ArchiveConfig, tick: u64) -> Result<(), ArchiveError> {
    let archive = runner::build_archive(config).await?;
    let chunk = archive.session().chunk_store().read_chunk_containing(tick).await?;
    let reconstructed = chunk.decompress_tick(tick)?;
    logger.info(&format!(
        "tick {} captured_at={}ms cells={} organisms_created={} unique_genomes={}",
        reconstructed.tick_number,
        reconstructed.capture_time_ms,
        reconstructed.cell_grid.len(),
        reconstructed.total_organisms_created,
        reconstructed.total_unique_genomes,
    ));
    Ok(())
}

async fn inspect(logger: &dyn BootstrapLogger, config: &ArchiveConfig) -> Result<(), ArchiveError> {
    let archive = runner::build_archive(config).await?;
    match archive.session().organism_archive().get_available_tick_range().await? {
        Some((min, max)) => logger.info(&format!("organism archive covers ticks [{min}, {max}]")),
        None => logger.info("organism archive is empty"),
    }
    Ok(())
}

fn validate_config(logger: &dyn BootstrapLogger, path: &std::path::Path) -> Result<(), ArchiveError> {
    match ArchiveConfig::load(Some(&path.to_string_lossy())) {
        Ok(config) => {
            logger.info(&format!("{path:?} is valid: codec={} organism_strategy={:?}", config.codec, config.organism_strategy));
            Ok(())
        }
        Err(e) => Err(ArchiveError::write_error(format!("invalid configuration at {path:?}: {e}"))),
    }
}
