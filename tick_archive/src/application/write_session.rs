// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Write Session (C6)
//!
//! Batches ticks for one environment chunk store and one organism archive
//! under a shared commit window, and advertises the phase a shutdown
//! coordinator needs to decide whether an interrupt is safe right now.
//!
//! A session never begins or commits a database transaction itself — each
//! repository adapter owns that around its own `commit_*` call. What the
//! session owns is strictly its own state machine (`Uninitialized`/`Open`)
//! and phase bookkeeping; a caller that wants rollback-on-error semantics
//! calls [`WriteSession::reset`] after a failed commit, matching the
//! "outer caller rolls back and resets" discipline from the concurrency
//! model.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tick_archive_domain::repositories::{EnvironmentChunkStore, OrganismArchive};
use tick_archive_domain::value_objects::OrganismState;
use tick_archive_domain::ArchiveError;

const STATE_UNINITIALIZED: u8 = 0;
const STATE_OPEN: u8 = 1;

/// Where a session sits in its per-connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No batch accumulated since construction or the last reset.
    Uninitialized,
    /// At least one `add_*` call has staged work since the last commit or
    /// reset.
    Open,
}

/// Whether this session is currently safe to interrupt.
///
/// Mirrors the bootstrap layer's shutdown-coordinator phase type without
/// this crate depending on the bootstrap crate; a caller there reads this
/// value through [`WriteSession::phase`] when deciding whether to force an
/// interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Processing,
}

const PHASE_WAITING: u8 = 0;
const PHASE_PROCESSING: u8 = 1;

/// Batches chunk and organism-tick writes for one `(chunk_store,
/// organism_archive)` pair across a commit window.
///
/// Two sessions over two distinct store/archive pairs are fully independent:
/// nothing here is process-global, so concurrent ingest workers each own
/// their own `WriteSession`.
pub struct WriteSession {
    chunk_store: Arc<dyn EnvironmentChunkStore>,
    organism_archive: Arc<dyn OrganismArchive>,
    state: AtomicU8,
    phase: AtomicU8,
    /// Set by a shutdown signaler that observed `Processing` and had to
    /// defer; cleared the next time the session enters `Processing`, closing
    /// the race between "shutdown requested" and "session about to start a
    /// file write" (§4.6).
    interrupt_requested: AtomicBool,
}

impl WriteSession {
    pub fn new(chunk_store: Arc<dyn EnvironmentChunkStore>, organism_archive: Arc<dyn OrganismArchive>) -> Self {
        Self {
            chunk_store,
            organism_archive,
            state: AtomicU8::new(STATE_UNINITIALIZED),
            phase: AtomicU8::new(PHASE_WAITING),
            interrupt_requested: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::SeqCst) {
            STATE_OPEN => SessionState::Open,
            _ => SessionState::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.phase.load(Ordering::SeqCst) {
            PHASE_PROCESSING => Phase::Processing,
            _ => Phase::Waiting,
        }
    }

    /// Transitions `Waiting -> Processing` before a file write begins. Idle
    /// if already `Processing` — nested calls within the same commit window
    /// (one per chunk write) must not bounce the phase back to `Waiting`
    /// between writes.
    fn enter_processing(&self) {
        self.state.store(STATE_OPEN, Ordering::SeqCst);
        self.phase.store(PHASE_PROCESSING, Ordering::SeqCst);
        self.interrupt_requested.store(false, Ordering::SeqCst);
    }

    /// Called by a shutdown signaler. Interrupts immediately if the session
    /// is currently `Waiting`; otherwise records the request so the pending
    /// interrupt survives until this session next enters `Processing` (which
    /// clears it) or the coordinator's grace-timeout escalation path reads
    /// it back via [`WriteSession::interrupt_requested`].
    ///
    /// Returns `true` if the interrupt took effect immediately.
    pub fn request_interrupt(&self) -> bool {
        if self.phase() == Phase::Waiting {
            return true;
        }
        self.interrupt_requested.store(true, Ordering::SeqCst);
        false
    }

    /// Whether a shutdown signaler has a pending interrupt request recorded
    /// against this session.
    pub fn interrupt_requested(&self) -> bool {
        self.interrupt_requested.load(Ordering::SeqCst)
    }

    /// Stages a fully-assembled chunk's wire bytes for the next commit.
    /// Transitions the session to `Open`/`Processing` since this performs
    /// the chunk's file write immediately; the relational index row is only
    /// staged until [`WriteSession::commit`].
    pub async fn add_environment_chunk(
        &self,
        first_tick: u64,
        last_tick: u64,
        tick_count: u32,
        protobuf_bytes: Vec<u8>,
    ) -> Result<(), ArchiveError> {
        self.enter_processing();
        self.chunk_store.write_raw_chunk(first_tick, last_tick, tick_count, protobuf_bytes).await
    }

    /// Stages one organism's tick state for the next commit. Does not write
    /// through to storage — the organism archive only batches until
    /// `commit_organism_writes` executes.
    pub async fn add_organism_tick(&self, organism: &OrganismState) -> Result<(), ArchiveError> {
        self.state.store(STATE_OPEN, Ordering::SeqCst);
        self.organism_archive.add_organism_tick(organism).await
    }

    /// Executes both repositories' batched writes for the current commit
    /// window, then returns the session to `Waiting` — mirroring "`OPEN` on
    /// `commit_*`: statements retained, dedup sets cleared" from the state
    /// machine.
    pub async fn commit(&self) -> Result<(), ArchiveError> {
        self.chunk_store.commit_raw_chunks().await?;
        self.organism_archive.commit_organism_writes().await?;
        self.phase.store(PHASE_WAITING, Ordering::SeqCst);
        Ok(())
    }

    /// Discards any pending batch and returns the session to
    /// `Uninitialized`. Callers invoke this after rolling back the outer
    /// transaction on a failed commit, per the transaction-discipline
    /// contract: the next `add_*` lazily reopens the session.
    pub async fn reset(&self) -> Result<(), ArchiveError> {
        self.chunk_store.reset_streaming_state().await?;
        self.organism_archive.reset_streaming_state().await?;
        self.state.store(STATE_UNINITIALIZED, Ordering::SeqCst);
        self.phase.store(PHASE_WAITING, Ordering::SeqCst);
        Ok(())
    }

    pub fn chunk_store(&self) -> &Arc<dyn EnvironmentChunkStore> {
        &self.chunk_store
    }

    pub fn organism_archive(&self) -> &Arc<dyn OrganismArchive> {
        &self.organism_archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tick_archive_domain::services::CodecRegistry;
    use tick_archive_domain::value_objects::RunNamespace;

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
            genome_hash: 1,
            tick_number: tick,
            energy: 10,
            ip: vec![0, 0],
            dv: vec![1, 0],
            data_pointers: vec![vec![0, 0]],
            active_dp_index: 0,
            entropy: 0.0,
            molecule_marker: 0,
            runtime_blob: Default::default(),
        }
    }

    async fn build_session() -> WriteSession {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let meta_store = Arc::new(crate::infrastructure::adapters::chunk_meta_store_fs::ChunkMetaStoreFs::new(dir.path()));
        let chunk_store = Arc::new(crate::infrastructure::adapters::chunk_store_sqlite::ChunkStoreSqlite::new(
            pool.clone(),
            dir.path(),
            RunNamespace::new("run-a").unwrap(),
            Arc::new(CodecRegistry::standard(3, 6)),
            "zstd",
            meta_store,
            10_000,
        ));
        let organism_archive = Arc::new(crate::infrastructure::adapters::organism_archive_row_per_organism::OrganismArchiveRowPerOrganism::new(
            pool,
            Arc::new(CodecRegistry::standard(3, 6)),
            "zstd",
        ));
        organism_archive.create_tables().await.unwrap();
        WriteSession::new(chunk_store, organism_archive)
    }

    #[tokio::test]
    async fn starts_uninitialized_and_waiting() {
        let session = build_session().await;
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.phase(), Phase::Waiting);
    }

    #[tokio::test]
    async fn adding_organism_tick_opens_session() {
        let session = build_session().await;
        session.add_organism_tick(&sample_organism(0, 1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn adding_chunk_enters_processing_and_commit_returns_to_waiting() {
        use tick_archive_domain::services::encode_chunk_message;
        use tick_archive_domain::value_objects::{CellGrid, TickData, TickDataChunk};

        let session = build_session().await;
        let chunk = TickDataChunk {
            first_tick: 0,
            last_tick: 0,
            tick_count: 1,
            snapshot: TickData {
                tick_number: 0,
                capture_time_ms: 0,
                cell_grid: CellGrid::from_sorted(vec![0], vec![1]),
                organisms: Vec::new(),
                total_organisms_created: 0,
                total_unique_genomes: 0,
            },
            deltas: Vec::new(),
        };
        let bytes = encode_chunk_message(&chunk);
        session.add_environment_chunk(0, 0, 1, bytes).await.unwrap();
        assert_eq!(session.phase(), Phase::Processing);

        session.commit().await.unwrap();
        assert_eq!(session.phase(), Phase::Waiting);
    }

    #[tokio::test]
    async fn reset_returns_to_uninitialized() {
        let session = build_session().await;
        session.add_organism_tick(&sample_organism(0, 1)).await.unwrap();
        session.reset().await.unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.phase(), Phase::Waiting);
    }

    #[tokio::test]
    async fn request_interrupt_takes_effect_immediately_while_waiting() {
        let session = build_session().await;
        assert!(session.request_interrupt());
        assert!(!session.interrupt_requested(), "an immediate interrupt has nothing pending to record");
    }

    #[tokio::test]
    async fn request_interrupt_is_deferred_while_processing_and_cleared_on_next_processing() {
        use tick_archive_domain::services::encode_chunk_message;
        use tick_archive_domain::value_objects::{CellGrid, TickData, TickDataChunk};

        let session = build_session().await;
        let chunk = TickDataChunk {
            first_tick: 0,
            last_tick: 0,
            tick_count: 1,
            snapshot: TickData {
                tick_number: 0,
                capture_time_ms: 0,
                cell_grid: CellGrid::from_sorted(vec![0], vec![1]),
                organisms: Vec::new(),
                total_organisms_created: 0,
                total_unique_genomes: 0,
            },
            deltas: Vec::new(),
        };
        let bytes = encode_chunk_message(&chunk);
        session.add_environment_chunk(0, 0, 1, bytes).await.unwrap();
        assert_eq!(session.phase(), Phase::Processing);

        assert!(!session.request_interrupt(), "processing sessions defer the interrupt");
        assert!(session.interrupt_requested());

        // The next commit window's first write closes the race by clearing
        // the stale request rather than leaving it to be re-observed later.
        let bytes = encode_chunk_message(&chunk);
        session.commit().await.unwrap();
        session.add_environment_chunk(0, 0, 1, bytes).await.unwrap();
        assert!(!session.interrupt_requested());
    }
}
