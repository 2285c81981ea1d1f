// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Environment Chunk Store (C4)
//!
//! Writes chunk blobs under `<chunk_directory>/<run_namespace>/<bucket>/` and
//! indexes each chunk's `[first_tick, last_tick]` range in the
//! `environment_chunks` table. The write path never opens a second
//! connection per request — `sqlx::SqlitePool` already caches prepared
//! statements per pooled connection, so there is no per-request "purge
//! closed connections" step to perform.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tick_archive_domain::repositories::{ChunkMetaStore, EnvironmentChunkStore};
use tick_archive_domain::services::{decode_environment_chunk, encode_chunk_message, CodecRegistry};
use tick_archive_domain::value_objects::{RunNamespace, TickDataChunk};
use tick_archive_domain::ArchiveError;
use tracing::{debug, instrument};

/// SQLite- and filesystem-backed [`EnvironmentChunkStore`] for a single run
/// namespace.
pub struct ChunkStoreSqlite {
    pool: sqlx::SqlitePool,
    chunk_directory: PathBuf,
    run_namespace: RunNamespace,
    codec_registry: Arc<CodecRegistry>,
    codec_name: String,
    chunk_meta_store: Arc<dyn ChunkMetaStore>,
    max_files_per_directory: u64,
    pending_batch: Mutex<Vec<(u64, u64)>>,
}

impl ChunkStoreSqlite {
    pub fn new(
        pool: sqlx::SqlitePool,
        chunk_directory: impl Into<PathBuf>,
        run_namespace: RunNamespace,
        codec_registry: Arc<CodecRegistry>,
        codec_name: impl Into<String>,
        chunk_meta_store: Arc<dyn ChunkMetaStore>,
        max_files_per_directory: u64,
    ) -> Self {
        Self {
            pool,
            chunk_directory: chunk_directory.into(),
            run_namespace,
            codec_registry,
            codec_name: codec_name.into(),
            chunk_meta_store,
            max_files_per_directory,
            pending_batch: Mutex::new(Vec::new()),
        }
    }

    fn run_dir(&self) -> PathBuf {
        self.chunk_directory.join(self.run_namespace.as_str())
    }

    async fn ensure_chunk_meta(&self, first_tick: u64, last_tick: u64, tick_count: u32) -> Result<tick_archive_domain::value_objects::ChunkMetaRecord, ArchiveError> {
        if let Some(cached) = self.chunk_meta_store.cached(&self.run_namespace).await {
            return Ok(cached);
        }
        if let Some(loaded) = self.chunk_meta_store.load(&self.run_namespace).await? {
            return Ok(loaded);
        }
        self.chunk_meta_store
            .compute_and_persist(&self.run_namespace, first_tick, last_tick, tick_count as u64, self.max_files_per_directory)
            .await
    }
}

#[async_trait]
impl EnvironmentChunkStore for ChunkStoreSqlite {
    #[instrument(skip(self, protobuf_bytes), fields(run_namespace = %self.run_namespace, first_tick, last_tick))]
    async fn write_raw_chunk(
        &self,
        first_tick: u64,
        last_tick: u64,
        tick_count: u32,
        protobuf_bytes: Vec<u8>,
    ) -> Result<(), ArchiveError> {
        let run_dir = self.run_dir();
        tokio::fs::create_dir_all(&run_dir).await?;

        let meta = self.ensure_chunk_meta(first_tick, last_tick, tick_count).await?;

        let compressed = self
            .codec_registry
            .compress(&self.codec_name, &protobuf_bytes)
            .map_err(|e| ArchiveError::write_error(format!("compress chunk [{first_tick}, {last_tick}]: {e}")))?;

        let bucket = meta.bucket_for(first_tick);
        let bucket_dir = run_dir.join(&bucket);
        tokio::fs::create_dir_all(&bucket_dir).await?;

        let extension = self.codec_registry.by_name(&self.codec_name).map(|c| c.file_extension()).unwrap_or("");
        let file_name = if extension.is_empty() {
            format!("chunk_{first_tick}.pb")
        } else {
            format!("chunk_{first_tick}.pb.{extension}")
        };
        let final_path = bucket_dir.join(&file_name);
        let tmp_path = bucket_dir.join(format!(".{file_name}.tmp-{}", std::process::id()));
        tokio::fs::write(&tmp_path, &compressed).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        self.pending_batch.lock().push((first_tick, last_tick));
        debug!(bucket = %bucket, bytes = compressed.len(), "queued chunk for index commit");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit_raw_chunks(&self) -> Result<(), ArchiveError> {
        let batch = std::mem::take(&mut *self.pending_batch.lock());
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ArchiveError::write_error(format!("begin index transaction: {e}")))?;
        for (first_tick, last_tick) in &batch {
            sqlx::query("INSERT INTO environment_chunks (first_tick, last_tick) VALUES (?, ?)")
                .bind(*first_tick as i64)
                .bind(*last_tick as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| ArchiveError::write_error(format!("insert chunk index row: {e}")))?;
        }
        tx.commit().await.map_err(|e| ArchiveError::write_error(format!("commit index transaction: {e}")))?;
        Ok(())
    }

    async fn reset_streaming_state(&self) -> Result<(), ArchiveError> {
        self.pending_batch.lock().clear();
        Ok(())
    }

    #[instrument(skip(self), fields(run_namespace = %self.run_namespace, tick))]
    async fn read_chunk_containing(&self, tick: u64) -> Result<TickDataChunk, ArchiveError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT first_tick, last_tick FROM environment_chunks WHERE first_tick <= ? AND last_tick >= ?",
        )
        .bind(tick as i64)
        .bind(tick as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ArchiveError::io_error(format!("lookup chunk covering tick {tick}: {e}")))?;
        let (first_tick, last_tick) = row.map(|(f, l)| (f as u64, l as u64)).ok_or_else(|| ArchiveError::tick_not_found(tick))?;

        let meta = match self.chunk_meta_store.cached(&self.run_namespace).await {
            Some(meta) => meta,
            None => self.chunk_meta_store.load(&self.run_namespace).await?.ok_or_else(|| {
                ArchiveError::MetadataMissing {
                    namespace: self.run_namespace.to_string(),
                }
            })?,
        };
        let bucket_dir = self.run_dir().join(meta.bucket_for(first_tick));

        let prefix = format!("chunk_{first_tick}.pb");
        let mut entries = tokio::fs::read_dir(&bucket_dir)
            .await
            .map_err(|e| ArchiveError::io_error(format!("read bucket directory {}: {e}", bucket_dir.display())))?;
        let mut found = None;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                found = Some(entry.path());
                break;
            }
        }
        let path = found.ok_or_else(|| {
            ArchiveError::io_error(format!("no chunk file for [{first_tick}, {last_tick}] under {}", bucket_dir.display()))
        })?;

        let compressed = tokio::fs::read(&path).await?;
        let raw = self
            .codec_registry
            .decompress(&compressed)
            .map_err(|e| ArchiveError::io_error(format!("decompress chunk {}: {e}", path.display())))?;
        decode_environment_chunk(&raw)
    }
}

/// Serializes a fully-materialized chunk to the on-disk wire format. Exposed
/// alongside the store so callers assembling a chunk via the delta codec (C3)
/// can hand `write_raw_chunk` its `protobuf_bytes` argument directly.
pub fn chunk_to_wire_bytes(chunk: &TickDataChunk) -> Vec<u8> {
    encode_chunk_message(chunk)
}
