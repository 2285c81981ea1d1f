// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Organism Archive — Strategy B: Single Blob Per Tick (C5)
//!
//! One `organism_ticks` row per `tick_number`, holding every organism alive
//! at that tick serialized into a single compressed blob. Cheaper to write
//! when a tick carries many organisms (one row, one compression pass instead
//! of N), at the cost of decompressing the whole tick even for a
//! single-organism read.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tick_archive_domain::repositories::OrganismArchive;
use tick_archive_domain::services::CodecRegistry;
use tick_archive_domain::value_objects::{OrganismState, OrganismStrategy, OrganismTickSummary};
use tick_archive_domain::ArchiveError;
use tracing::instrument;

#[derive(Default)]
struct PendingBatch {
    /// Organisms staged for the current window, keyed by `tick_number` so a
    /// tick that accumulates several `add_organism_tick` calls before commit
    /// still produces exactly one row.
    by_tick: HashMap<u64, Vec<OrganismState>>,
    metadata: HashMap<u32, OrganismState>,
}

/// SQLite-backed [`OrganismArchive`] implementing the single-blob-per-tick
/// layout.
pub struct OrganismArchiveSingleBlob {
    pool: sqlx::SqlitePool,
    codec_registry: Arc<CodecRegistry>,
    codec_name: String,
    pending: Mutex<PendingBatch>,
}

impl OrganismArchiveSingleBlob {
    pub fn new(pool: sqlx::SqlitePool, codec_registry: Arc<CodecRegistry>, codec_name: impl Into<String>) -> Self {
        Self {
            pool,
            codec_registry,
            codec_name: codec_name.into(),
            pending: Mutex::new(PendingBatch::default()),
        }
    }

    async fn read_blob_for_tick(&self, tick: u64) -> Result<Option<Vec<OrganismState>>, ArchiveError> {
        let blob: Option<Vec<u8>> = sqlx::query_scalar("SELECT organisms_blob FROM organism_ticks WHERE tick_number = ?")
            .bind(tick as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ArchiveError::io_error(format!("read organism tick blob {tick}: {e}")))?;
        let Some(compressed) = blob else {
            return Ok(None);
        };
        let raw = self
            .codec_registry
            .decompress(&compressed)
            .map_err(|e| ArchiveError::io_error(format!("decompress organism tick blob {tick}: {e}")))?;
        let organisms: Vec<OrganismState> =
            serde_json::from_slice(&raw).map_err(|e| ArchiveError::io_error(format!("corrupt organism tick blob {tick}: {e}")))?;
        Ok(Some(organisms))
    }
}

#[async_trait]
impl OrganismArchive for OrganismArchiveSingleBlob {
    fn strategy(&self) -> OrganismStrategy {
        OrganismStrategy::SingleBlobPerTick
    }

    async fn create_tables(&self) -> Result<(), ArchiveError> {
        crate::infrastructure::repositories::schema::ensure_schema(&self.pool)
            .await
            .map_err(|e| ArchiveError::write_error(format!("ensure organism schema: {e}")))
    }

    async fn add_organism_tick(&self, organism: &OrganismState) -> Result<(), ArchiveError> {
        let mut pending = self.pending.lock();
        pending.metadata.entry(organism.organism_id).or_insert_with(|| organism.clone());
        pending.by_tick.entry(organism.tick_number).or_default().push(organism.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit_organism_writes(&self) -> Result<(), ArchiveError> {
        let PendingBatch { by_tick, metadata } = std::mem::take(&mut *self.pending.lock());
        if by_tick.is_empty() && metadata.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ArchiveError::write_error(format!("begin organism-write transaction: {e}")))?;

        for organism in metadata.values() {
            sqlx::query(
                "INSERT OR IGNORE INTO organisms (organism_id, parent_id, birth_tick, program_id, initial_position, genome_hash) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(organism.organism_id as i64)
            .bind(organism.parent_id.map(|p| p as i64))
            .bind(organism.birth_tick as i64)
            .bind(&organism.program_id)
            .bind(serde_json::to_string(&organism.initial_position).unwrap_or_default())
            .bind(organism.genome_hash as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| ArchiveError::write_error(format!("merge organism metadata: {e}")))?;
        }

        for (tick_number, organisms) in &by_tick {
            let blob_json = serde_json::to_vec(organisms)
                .map_err(|e| ArchiveError::write_error(format!("serialize organism tick blob: {e}")))?;
            let organisms_blob = self
                .codec_registry
                .compress(&self.codec_name, &blob_json)
                .map_err(|e| ArchiveError::write_error(format!("compress organism tick blob: {e}")))?;

            sqlx::query("INSERT OR REPLACE INTO organism_ticks (tick_number, organisms_blob) VALUES (?, ?)")
                .bind(*tick_number as i64)
                .bind(organisms_blob)
                .execute(&mut *tx)
                .await
                .map_err(|e| ArchiveError::write_error(format!("insert organism tick row: {e}")))?;
        }

        tx.commit().await.map_err(|e| ArchiveError::write_error(format!("commit organism-write transaction: {e}")))?;
        Ok(())
    }

    async fn reset_streaming_state(&self) -> Result<(), ArchiveError> {
        *self.pending.lock() = PendingBatch::default();
        Ok(())
    }

    async fn read_organisms_at_tick(&self, tick: u64) -> Result<Vec<OrganismTickSummary>, ArchiveError> {
        let Some(organisms) = self.read_blob_for_tick(tick).await? else {
            return Ok(Vec::new());
        };
        Ok(organisms.iter().map(OrganismState::to_summary).collect())
    }

    async fn read_single_organism_state(&self, tick: u64, organism_id: u32) -> Result<Option<OrganismState>, ArchiveError> {
        let Some(organisms) = self.read_blob_for_tick(tick).await? else {
            return Ok(None);
        };
        Ok(organisms.into_iter().find(|o| o.organism_id == organism_id))
    }

    async fn get_available_tick_range(&self) -> Result<Option<(u64, u64)>, ArchiveError> {
        let row: (Option<i64>, Option<i64>) = sqlx::query_as("SELECT MIN(tick_number), MAX(tick_number) FROM organism_ticks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ArchiveError::io_error(format!("read available tick range: {e}")))?;
        Ok(match row {
            (Some(min), Some(max)) => Some((min as u64, max as u64)),
            _ => None,
        })
    }

    async fn read_total_organisms_created(&self, tick: u64) -> Result<u64, ArchiveError> {
        let max_id: Option<i64> = sqlx::query_scalar("SELECT MAX(organism_id) FROM organisms WHERE birth_tick <= ?")
            .bind(tick as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ArchiveError::io_error(format!("read total organisms created: {e}")))?;
        Ok(max_id.map(|id| id as u64).unwrap_or(0))
    }
}
