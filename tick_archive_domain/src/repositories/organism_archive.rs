// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Port for the organism archive (C5): both the row-per-organism and
//! single-blob-per-tick layouts implement this same trait, selected once at
//! construction by [`crate::value_objects::OrganismStrategy`].

use crate::value_objects::{OrganismState, OrganismStrategy, OrganismTickSummary};
use crate::ArchiveError;
use async_trait::async_trait;

/// Persists and retrieves per-organism state at arbitrary ticks, regardless
/// of the underlying physical layout.
///
/// Metadata-row deduplication invariant: within a single commit window, each
/// `organism_id` is merged into the run-wide `organisms` table at most once
/// even if it appears in multiple ticks of the batch; across commit windows
/// the merge is idempotent on `organism_id`.
#[async_trait]
pub trait OrganismArchive: Send + Sync {
    /// Which physical layout this implementation backs.
    fn strategy(&self) -> OrganismStrategy;

    /// Idempotent, race-safe table creation (`CREATE TABLE IF NOT EXISTS`).
    /// Commits on success.
    async fn create_tables(&self) -> Result<(), ArchiveError>;

    /// Appends `organism` to the per-connection prepared-statement batch,
    /// and — unless its id was already seen in this commit window —
    /// queues a metadata-table merge. Does not execute.
    async fn add_organism_tick(&self, organism: &OrganismState) -> Result<(), ArchiveError>;

    /// Executes the accumulated batches and resets the per-commit dedup set.
    /// Leaves prepared statements open for reuse.
    async fn commit_organism_writes(&self) -> Result<(), ArchiveError>;

    /// Closes and drops cached statements, best-effort.
    async fn reset_streaming_state(&self) -> Result<(), ArchiveError>;

    /// Returns per-organism summaries at `tick`, joining run-wide metadata
    /// where needed. Never decompresses a full [`OrganismState`]'s runtime
    /// blob to answer this.
    async fn read_organisms_at_tick(&self, tick: u64) -> Result<Vec<OrganismTickSummary>, ArchiveError>;

    /// Returns the full reconstructed state (row columns merged with the
    /// decompressed runtime blob) for one organism at one tick, or `None` if
    /// absent.
    async fn read_single_organism_state(
        &self,
        tick: u64,
        organism_id: u32,
    ) -> Result<Option<OrganismState>, ArchiveError>;

    /// Returns `(min_tick, max_tick)` over all committed per-tick rows, or
    /// `None` if the archive is empty.
    async fn get_available_tick_range(&self) -> Result<Option<(u64, u64)>, ArchiveError>;

    /// `MAX(organism_id) WHERE birth_tick <= tick`, relying on the
    /// sequential-organism-id invariant to stand in for a count.
    async fn read_total_organisms_created(&self, tick: u64) -> Result<u64, ArchiveError>;
}
