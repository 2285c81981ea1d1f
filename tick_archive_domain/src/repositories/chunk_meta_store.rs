// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Port for the subdirectory partitioner's persisted `.chunk_meta` record
//! (C8).

use crate::value_objects::{ChunkMetaRecord, RunNamespace};
use crate::ArchiveError;
use async_trait::async_trait;

/// Loads or lazily computes the per-run-namespace [`ChunkMetaRecord`].
///
/// Implementations cache the record in memory keyed by run namespace after
/// the first successful load or compute — this is a build-once value, never
/// reloaded once a writer has successfully persisted it.
#[async_trait]
pub trait ChunkMetaStore: Send + Sync {
    /// Returns the cached record for `namespace` if present, without
    /// touching the filesystem.
    async fn cached(&self, namespace: &RunNamespace) -> Option<ChunkMetaRecord>;

    /// Loads `<namespace>/.chunk_meta` from disk if it exists, caching the
    /// result. Returns `Ok(None)` (not an error) if the file is absent —
    /// callers that require it for legacy-run reads should translate that
    /// into [`ArchiveError::MetadataMissing`] themselves.
    async fn load(&self, namespace: &RunNamespace) -> Result<Option<ChunkMetaRecord>, ArchiveError>;

    /// Computes `ticks_per_subdirectory` from the first chunk ever written
    /// in `namespace` and persists it atomically (temp-file + rename). If a
    /// concurrent writer already created the file, this call discovers the
    /// rename failure, re-reads the winner's record, and returns that one
    /// instead — first successful writer wins, never two truths on disk.
    async fn compute_and_persist(
        &self,
        namespace: &RunNamespace,
        first_tick: u64,
        last_tick: u64,
        tick_count: u64,
        max_files_per_directory: u64,
    ) -> Result<ChunkMetaRecord, ArchiveError>;
}
