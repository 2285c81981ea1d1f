// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Port for the environment chunk store (C4), backing the tick-range index
//! and lookup (C7).

use crate::value_objects::TickDataChunk;
use crate::ArchiveError;
use async_trait::async_trait;

/// Persists and retrieves environment chunks for one run namespace.
///
/// A single implementation owns one relational connection's worth of
/// streaming write state (cached prepared statement, pending batch); the
/// write path never calls `commit()` on the outer transaction itself — that
/// remains the caller's responsibility, per the streaming write session
/// contract (C6).
#[async_trait]
pub trait EnvironmentChunkStore: Send + Sync {
    /// Compresses and persists `protobuf_bytes` as the chunk
    /// `[first_tick, last_tick]`, writing the blob to disk and queuing the
    /// `(first_tick, last_tick)` index row for the next commit. Does not
    /// execute the relational write.
    async fn write_raw_chunk(
        &self,
        first_tick: u64,
        last_tick: u64,
        tick_count: u32,
        protobuf_bytes: Vec<u8>,
    ) -> Result<(), ArchiveError>;

    /// Executes the accumulated index batch. Leaves the prepared statement
    /// open for reuse; the outer caller commits the surrounding transaction.
    async fn commit_raw_chunks(&self) -> Result<(), ArchiveError>;

    /// Closes and drops any cached prepared statement for this store,
    /// returning it to `UNINITIALIZED`. Best-effort: close failures are
    /// swallowed.
    async fn reset_streaming_state(&self) -> Result<(), ArchiveError>;

    /// Looks up the chunk covering `tick`, reads its blob through the codec
    /// registry, and partially decodes it with the environment accept set
    /// (organisms, RNG state, plugin states, and genome hashes are skipped
    /// at the wire level and never allocated).
    ///
    /// # Errors
    ///
    /// [`ArchiveError::TickNotFound`] if no chunk covers `tick`;
    /// [`ArchiveError::IoError`] on filesystem faults;
    /// [`ArchiveError::DecodeError`] on corrupt bytes. Never returns an
    /// empty chunk in place of an error.
    async fn read_chunk_containing(&self, tick: u64) -> Result<TickDataChunk, ArchiveError>;
}
