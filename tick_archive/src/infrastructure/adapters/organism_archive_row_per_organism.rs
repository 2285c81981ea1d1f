// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Organism Archive — Strategy A: Row Per Organism (C5)
//!
//! One `organism_states` row per `(tick_number, organism_id)`. Hot columns
//! (`energy`, `ip`, `dv`, `data_pointers`, `active_dp_index`, `entropy`,
//! `molecule_marker`, `is_dead`, `death_tick`) are extracted so
//! `read_organisms_at_tick` never decompresses `runtime_state_blob`; the blob
//! carries only the cold register-bank/stack/instruction-trace payload.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tick_archive_domain::repositories::OrganismArchive;
use tick_archive_domain::services::CodecRegistry;
use tick_archive_domain::value_objects::{OrganismState, OrganismStrategy, OrganismTickSummary, RuntimeBlob};
use tick_archive_domain::ArchiveError;
use tracing::instrument;

#[derive(Default)]
struct PendingBatch {
    rows: Vec<OrganismState>,
    metadata: Vec<OrganismState>,
    seen_this_window: HashSet<u32>,
}

/// SQLite-backed [`OrganismArchive`] implementing the row-per-organism
/// layout.
pub struct OrganismArchiveRowPerOrganism {
    pool: sqlx::SqlitePool,
    codec_registry: Arc<CodecRegistry>,
    codec_name: String,
    pending: Mutex<PendingBatch>,
}

impl OrganismArchiveRowPerOrganism {
    pub fn new(pool: sqlx::SqlitePool, codec_registry: Arc<CodecRegistry>, codec_name: impl Into<String>) -> Self {
        Self {
            pool,
            codec_registry,
            codec_name: codec_name.into(),
            pending: Mutex::new(PendingBatch::default()),
        }
    }
}

#[async_trait]
impl OrganismArchive for OrganismArchiveRowPerOrganism {
    fn strategy(&self) -> OrganismStrategy {
        OrganismStrategy::RowPerOrganism
    }

    async fn create_tables(&self) -> Result<(), ArchiveError> {
        crate::infrastructure::repositories::schema::ensure_schema(&self.pool)
            .await
            .map_err(|e| ArchiveError::write_error(format!("ensure organism schema: {e}")))
    }

    async fn add_organism_tick(&self, organism: &OrganismState) -> Result<(), ArchiveError> {
        let mut pending = self.pending.lock();
        if pending.seen_this_window.insert(organism.organism_id) {
            pending.metadata.push(organism.clone());
        }
        pending.rows.push(organism.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit_organism_writes(&self) -> Result<(), ArchiveError> {
        let PendingBatch { rows, metadata, .. } = std::mem::take(&mut *self.pending.lock());
        if rows.is_empty() && metadata.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ArchiveError::write_error(format!("begin organism-write transaction: {e}")))?;

        for organism in &metadata {
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

        for organism in &rows {
            let blob_json = serde_json::to_vec(&organism.runtime_blob)
                .map_err(|e| ArchiveError::write_error(format!("serialize runtime blob: {e}")))?;
            let runtime_state_blob = self
                .codec_registry
                .compress(&self.codec_name, &blob_json)
                .map_err(|e| ArchiveError::write_error(format!("compress runtime blob: {e}")))?;

            sqlx::query(
                "INSERT OR REPLACE INTO organism_states \
                 (tick_number, organism_id, energy, ip, dv, data_pointers, active_dp_index, runtime_state_blob, entropy, molecule_marker, is_dead, death_tick) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(organism.tick_number as i64)
            .bind(organism.organism_id as i64)
            .bind(organism.energy)
            .bind(serde_json::to_string(&organism.ip).unwrap_or_default())
            .bind(serde_json::to_string(&organism.dv).unwrap_or_default())
            .bind(serde_json::to_string(&organism.data_pointers).unwrap_or_default())
            .bind(organism.active_dp_index as i64)
            .bind(runtime_state_blob)
            .bind(organism.entropy)
            .bind(organism.molecule_marker)
            .bind(organism.runtime_blob.is_dead)
            .bind(organism.runtime_blob.death_tick.map(|t| t as i64))
            .execute(&mut *tx)
            .await
            .map_err(|e| ArchiveError::write_error(format!("insert organism state row: {e}")))?;
        }

        tx.commit().await.map_err(|e| ArchiveError::write_error(format!("commit organism-write transaction: {e}")))?;
        Ok(())
    }

    async fn reset_streaming_state(&self) -> Result<(), ArchiveError> {
        *self.pending.lock() = PendingBatch::default();
        Ok(())
    }

    async fn read_organisms_at_tick(&self, tick: u64) -> Result<Vec<OrganismTickSummary>, ArchiveError> {
        let rows: Vec<(i64, i64, String, String, String, i64, Option<i64>, i64, f64, i64, bool, Option<i64>)> = sqlx::query_as(
            "SELECT os.organism_id, os.energy, os.ip, os.dv, os.data_pointers, os.active_dp_index, \
                    o.parent_id, o.birth_tick, os.entropy, o.genome_hash, os.is_dead, os.death_tick \
             FROM organism_states os JOIN organisms o ON os.organism_id = o.organism_id \
             WHERE os.tick_number = ?",
        )
        .bind(tick as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ArchiveError::io_error(format!("read organisms at tick {tick}: {e}")))?;

        rows.into_iter()
            .map(
                |(organism_id, energy, ip, dv, data_pointers, active_dp_index, parent_id, birth_tick, entropy, genome_hash, is_dead, death_tick)| {
                    Ok(OrganismTickSummary {
                        organism_id: organism_id as u32,
                        energy,
                        ip: parse_json_vec(&ip)?,
                        dv: parse_json_vec(&dv)?,
                        data_pointers: serde_json::from_str(&data_pointers)
                            .map_err(|e| ArchiveError::io_error(format!("corrupt data_pointers column: {e}")))?,
                        active_dp_index: active_dp_index as u32,
                        parent_id: parent_id.map(|p| p as u32),
                        birth_tick: birth_tick as u64,
                        entropy,
                        genome_hash: genome_hash as u64,
                        is_dead,
                        death_tick: death_tick.map(|t| t as u64),
                    })
                },
            )
            .collect()
    }

    async fn read_single_organism_state(&self, tick: u64, organism_id: u32) -> Result<Option<OrganismState>, ArchiveError> {
        let Some(row) = sqlx::query_as::<_, SingleOrganismRow>(
            "SELECT o.parent_id, o.birth_tick, o.program_id, o.initial_position, o.genome_hash, \
                    os.energy, os.ip, os.dv, os.data_pointers, os.active_dp_index, os.entropy, \
                    os.molecule_marker, os.runtime_state_blob \
             FROM organism_states os JOIN organisms o ON os.organism_id = o.organism_id \
             WHERE os.tick_number = ? AND os.organism_id = ?",
        )
        .bind(tick as i64)
        .bind(organism_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ArchiveError::io_error(format!("read organism {organism_id} at tick {tick}: {e}")))?
        else {
            return Ok(None);
        };

        let raw_blob = self
            .codec_registry
            .decompress(&row.runtime_state_blob)
            .map_err(|e| ArchiveError::io_error(format!("decompress runtime blob: {e}")))?;
        let runtime_blob: RuntimeBlob =
            serde_json::from_slice(&raw_blob).map_err(|e| ArchiveError::io_error(format!("corrupt runtime blob: {e}")))?;

        Ok(Some(OrganismState {
            organism_id,
            parent_id: row.parent_id.map(|p| p as u32),
            birth_tick: row.birth_tick as u64,
            program_id: row.program_id,
            initial_position: parse_json_vec(&row.initial_position)?,
            genome_hash: row.genome_hash as u64,
            tick_number: tick,
            energy: row.energy,
            ip: parse_json_vec(&row.ip)?,
            dv: parse_json_vec(&row.dv)?,
            data_pointers: serde_json::from_str(&row.data_pointers)
                .map_err(|e| ArchiveError::io_error(format!("corrupt data_pointers column: {e}")))?,
            active_dp_index: row.active_dp_index as u32,
            entropy: row.entropy,
            molecule_marker: row.molecule_marker as i32,
            runtime_blob,
        }))
    }

    async fn get_available_tick_range(&self) -> Result<Option<(u64, u64)>, ArchiveError> {
        let row: (Option<i64>, Option<i64>) = sqlx::query_as("SELECT MIN(tick_number), MAX(tick_number) FROM organism_states")
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

fn parse_json_vec(json: &str) -> Result<Vec<i64>, ArchiveError> {
    serde_json::from_str(json).map_err(|e| ArchiveError::io_error(format!("corrupt vector column: {e}")))
}

#[derive(sqlx::FromRow)]
struct SingleOrganismRow {
    parent_id: Option<i64>,
    birth_tick: i64,
    program_id: String,
    initial_position: String,
    genome_hash: i64,
    energy: i64,
    ip: String,
    dv: String,
    data_pointers: String,
    active_dp_index: i64,
    entropy: f64,
    molecule_marker: i64,
    runtime_state_blob: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tick_archive_domain::value_objects::RuntimeBlob;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    fn sample_organism(tick: u64, id: u32) -> OrganismState {
        OrganismState {
            organism_id: id,
            parent_id: None,
            birth_tick: 0,
            program_id: "prog-a".to_string(),
            initial_position: vec![0, 0],
            genome_hash: 42,
            tick_number: tick,
            energy: 100,
            ip: vec![1, 2],
            dv: vec![1, 0],
            data_pointers: vec![vec![0, 0]],
            active_dp_index: 0,
            entropy: 0.5,
            molecule_marker: 7,
            runtime_blob: RuntimeBlob::default(),
        }
    }

    #[tokio::test]
    async fn write_then_read_summary_round_trips_hot_columns() {
        let pool = test_pool().await;
        let archive = OrganismArchiveRowPerOrganism::new(pool, Arc::new(CodecRegistry::standard(3, 6)), "zstd");
        archive.create_tables().await.unwrap();
        archive.add_organism_tick(&sample_organism(10, 1)).await.unwrap();
        archive.commit_organism_writes().await.unwrap();

        let summaries = archive.read_organisms_at_tick(10).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].organism_id, 1);
        assert_eq!(summaries[0].energy, 100);
    }

    #[tokio::test]
    async fn metadata_dedup_across_multiple_ticks_for_same_organism() {
        let pool = test_pool().await;
        let archive = OrganismArchiveRowPerOrganism::new(pool, Arc::new(CodecRegistry::standard(3, 6)), "zstd");
        archive.create_tables().await.unwrap();
        archive.add_organism_tick(&sample_organism(10, 1)).await.unwrap();
        archive.add_organism_tick(&sample_organism(11, 1)).await.unwrap();
        archive.commit_organism_writes().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organisms")
            .fetch_one(&archive.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn total_organisms_created_uses_max_id() {
        let pool = test_pool().await;
        let archive = OrganismArchiveRowPerOrganism::new(pool, Arc::new(CodecRegistry::standard(3, 6)), "zstd");
        archive.create_tables().await.unwrap();
        archive.add_organism_tick(&sample_organism(0, 0)).await.unwrap();
        archive.add_organism_tick(&sample_organism(0, 4)).await.unwrap();
        archive.commit_organism_writes().await.unwrap();

        assert_eq!(archive.read_total_organisms_created(0).await.unwrap(), 4);
    }
}
