// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Composition Root
//!
//! Wires [`tick_archive::infrastructure::config::ArchiveConfig`] into the
//! concrete SQLite/filesystem adapters, then drives the `run`/`read-tick`/
//! `inspect` subcommands on top of them. `run` also demonstrates the
//! shutdown-phase contract (`shutdown::Phase`): a signal handler cancels a
//! [`shutdown::ShutdownCoordinator`], the ingest loop checks the token
//! between commit windows, and if the loop has not reached a `Waiting`
//! boundary by the configured grace period the coordinator forces an
//! interrupt and, after one more second, escalates to
//! [`tick_archive_domain::ArchiveError::ShutdownForced`].

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tick_archive::application::ingest_writer::IngestWriter;
use tick_archive::application::write_session::WriteSession;
use tick_archive::infrastructure::adapters::chunk_meta_store_fs::ChunkMetaStoreFs;
use tick_archive::infrastructure::adapters::chunk_store_sqlite::{chunk_to_wire_bytes, ChunkStoreSqlite};
use tick_archive::infrastructure::adapters::organism_archive_row_per_organism::OrganismArchiveRowPerOrganism;
use tick_archive::infrastructure::adapters::organism_archive_single_blob::OrganismArchiveSingleBlob;
use tick_archive::infrastructure::config::ArchiveConfig;
use tick_archive::infrastructure::metrics::ArchiveMetrics;
use tick_archive::infrastructure::repositories::schema;
use tick_archive_domain::repositories::{EnvironmentChunkStore, OrganismArchive};
use tick_archive_domain::services::{delta_codec, CodecRegistry};
use tick_archive_domain::value_objects::{
    CellGrid, Molecule, MoleculeTag, OrganismState, OrganismStrategy, RunNamespace, RuntimeBlob, TickData,
};
use tick_archive_domain::ArchiveError;

use crate::shutdown::{Phase, ShutdownCoordinator, ESCALATION_WINDOW};
use crate::signals::{create_signal_handler, SystemSignals};

/// Everything the composition root builds once config is loaded.
pub struct Archive {
    pub ingest: IngestWriter,
}

impl Archive {
    pub fn session(&self) -> &WriteSession {
        self.ingest.session()
    }
}

/// Wires one `ArchiveConfig` into a `WriteSession` backed by the chosen
/// organism strategy and a fresh SQLite pool, applying migrations first.
pub async fn build_archive(config: &ArchiveConfig) -> Result<Archive, ArchiveError> {
    tick_archive::infrastructure::repositories::schema::create_database_if_missing(&config.database_url)
        .await
        .map_err(|e| ArchiveError::io_error(format!("create database: {e}")))?;
    let pool = sqlx::SqlitePool::connect(&config.database_url)
        .await
        .map_err(|e| ArchiveError::io_error(format!("connect to database: {e}")))?;
    schema::ensure_schema(&pool).await.map_err(|e| ArchiveError::write_error(format!("apply migrations: {e}")))?;

    std::fs::create_dir_all(&config.chunk_directory)
        .map_err(|e| ArchiveError::io_error(format!("create chunk directory {}: {e}", config.chunk_directory)))?;

    let codec_registry = Arc::new(CodecRegistry::standard(config.zstd_level, config.gzip_level));
    let meta_store = Arc::new(ChunkMetaStoreFs::new(&config.chunk_directory));
    let run_namespace = RunNamespace::new(format!("run-{}", std::process::id())).map_err(ArchiveError::io_error)?;

    let chunk_store: Arc<dyn EnvironmentChunkStore> = Arc::new(ChunkStoreSqlite::new(
        pool.clone(),
        &config.chunk_directory,
        run_namespace,
        Arc::clone(&codec_registry),
        &config.codec,
        meta_store,
        config.max_files_per_directory,
    ));

    let organism_archive: Arc<dyn OrganismArchive> = match config.organism_strategy {
        OrganismStrategy::RowPerOrganism => {
            Arc::new(OrganismArchiveRowPerOrganism::new(pool, Arc::clone(&codec_registry), &config.codec))
        }
        OrganismStrategy::SingleBlobPerTick => {
            Arc::new(OrganismArchiveSingleBlob::new(pool, Arc::clone(&codec_registry), &config.codec))
        }
    };

    let session = WriteSession::new(chunk_store, organism_archive);
    let metrics = Arc::new(ArchiveMetrics::new(
        &prometheus::Registry::new(),
        Duration::from_secs(config.metrics_window_secs.max(1)),
    ));
    let ingest = IngestWriter::new(session, metrics);
    ingest.create_organism_tables().await?;

    Ok(Archive { ingest })
}

/// Generates `organisms_per_tick` deterministic synthetic organisms alive at
/// `tick`.
fn synthetic_tick(tick: u64, organisms_per_tick: u32) -> TickData {
    let mut flat_indices = Vec::with_capacity(organisms_per_tick as usize);
    let mut molecule_data = Vec::with_capacity(organisms_per_tick as usize);
    let mut organisms = Vec::with_capacity(organisms_per_tick as usize);

    for id in 0..organisms_per_tick {
        let index = (tick * 997 + id as u64) % 1_000_000;
        flat_indices.push(index);
        molecule_data.push(Molecule::new(MoleculeTag::Energy, (id % 64) as i32).pack());
        organisms.push(OrganismState {
            organism_id: id,
            parent_id: None,
            birth_tick: 0,
            program_id: "demo".to_string(),
            initial_position: vec![index],
            genome_hash: id as u64 * 31 + 7,
            tick_number: tick,
            energy: 100 - (tick % 100) as i32,
            ip: vec![0],
            dv: vec![1],
            data_pointers: vec![vec![0]],
            active_dp_index: 0,
            entropy: 0.5,
            molecule_marker: 0,
            runtime_blob: RuntimeBlob::default(),
        });
    }

    let mut paired: Vec<(u64, i32)> = flat_indices.into_iter().zip(molecule_data).collect();
    paired.sort_unstable_by_key(|(idx, _)| *idx);
    paired.dedup_by_key(|(idx, _)| *idx);
    let (flat_indices, molecule_data) = paired.into_iter().unzip();

    TickData {
        tick_number: tick,
        capture_time_ms: tick as i64,
        cell_grid: CellGrid::from_sorted(flat_indices, molecule_data),
        organisms,
        total_organisms_created: organisms_per_tick as u64,
        total_unique_genomes: organisms_per_tick as u64,
    }
}

/// Drives the demo ingest loop: generates `tick_count` synthetic ticks in
/// batches of `batch_size`, encoding each batch into one environment chunk
/// and staging every organism's tick state, committing once per batch.
///
/// Checks `coordinator`'s cancellation token between batches (the session is
/// always `Waiting` at that boundary) and honors the grace-timeout/forced-
/// interrupt/escalation contract: a shutdown requested mid-batch is only
/// acted on at the next `Waiting` boundary unless the grace period plus
/// [`ESCALATION_WINDOW`] elapses first, at which point the loop returns
/// [`ArchiveError::ShutdownForced`].
pub async fn run_ingest_demo(
    archive: &Archive,
    tick_count: u64,
    organisms_per_tick: u32,
    batch_size: u64,
    coordinator: &ShutdownCoordinator,
) -> Result<(), ArchiveError> {
    let mut tick = 0u64;
    while tick < tick_count {
        if coordinator.token().is_cancelled() {
            tracing::info!(tick, "shutdown requested at a waiting boundary, stopping ingest loop");
            return Ok(());
        }

        let batch_end = (tick + batch_size).min(tick_count);
        let ticks: Vec<TickData> = (tick..batch_end).map(|t| synthetic_tick(t, organisms_per_tick)).collect();
        let chunk = delta_codec::encode_chunk(&ticks)?;
        let wire_bytes = chunk_to_wire_bytes(&chunk);

        let write_result = async {
            archive
                .session()
                .add_environment_chunk(chunk.first_tick, chunk.last_tick, chunk.tick_count, wire_bytes)
                .await?;
            for t in &ticks {
                for organism in &t.organisms {
                    archive.session().add_organism_tick(organism).await?;
                }
            }
            archive.session().commit().await
        }
        .await;

        match write_result {
            Ok(()) => {}
            Err(e) => {
                archive.session().reset().await?;
                return Err(e);
            }
        }

        tick = batch_end;
        tracing::info!(tick, tick_count, "committed batch");
    }
    Ok(())
}

/// Spawns the platform signal handler, installs it against `coordinator`,
/// and returns immediately — the handler runs on its own task and calls
/// [`ShutdownCoordinator::initiate_shutdown`] on receipt of SIGTERM/SIGINT/
/// SIGHUP.
pub fn install_signal_handler(coordinator: ShutdownCoordinator) {
    let handler = create_signal_handler();
    tokio::spawn(async move {
        let coordinator = coordinator.clone();
        let callback: Box<dyn FnOnce() + Send> = Box::new(move || coordinator.initiate_shutdown());
        handler.wait_for_signal(callback).await;
    });
}

/// Waits out the shutdown-phase contract once a coordinator's grace period
/// has been initiated: if the ingest loop's session is still `Processing`
/// when the grace period elapses, forces the interrupt and gives it one
/// more [`ESCALATION_WINDOW`] before returning
/// [`ArchiveError::ShutdownForced`].
///
/// `request_interrupt` should call through to
/// [`tick_archive::application::write_session::WriteSession::request_interrupt`]
/// so the session actually records the pending interrupt (clearing it only
/// once it next reaches `Processing`) rather than this function merely
/// polling the phase.
pub async fn enforce_shutdown_escalation(
    coordinator: &ShutdownCoordinator,
    session_phase: impl Fn() -> Phase,
    request_interrupt: impl Fn() -> bool,
) -> Result<(), ArchiveError> {
    if coordinator.wait_for_shutdown().await {
        return Ok(());
    }
    if request_interrupt() {
        return Ok(());
    }
    tokio::time::sleep(ESCALATION_WINDOW).await;
    if session_phase() == Phase::Waiting {
        Ok(())
    } else {
        Err(ArchiveError::ShutdownForced)
    }
}
