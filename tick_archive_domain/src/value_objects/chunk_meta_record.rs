// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-run metadata that bounds the number of chunk files in any one
//! subdirectory (C8).

use serde::{Deserialize, Serialize};

/// Default cap on files per bucket directory, chosen to keep a single
/// directory listing cheap on common filesystems.
pub const DEFAULT_MAX_FILES_PER_DIRECTORY: u64 = 10_000;

/// Immutable, once-computed-per-run metadata: how many ticks' worth of
/// chunks share one bucket subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetaRecord {
    pub ticks_per_subdirectory: u64,
}

impl ChunkMetaRecord {
    /// Computes `ticks_per_subdirectory` from the first chunk ever written
    /// in a run namespace.
    ///
    /// `chunk_tick_step` approximates the tick span one chunk covers:
    /// `tick_count * max(1, (last_tick - first_tick) / (tick_count - 1))`,
    /// which collapses to `tick_count` itself when the sampling interval is
    /// `1` and degenerates gracefully for a single-tick chunk
    /// (`tick_count == 1`).
    pub fn compute(
        first_tick: u64,
        last_tick: u64,
        tick_count: u64,
        max_files_per_directory: u64,
    ) -> Self {
        let chunk_tick_step = if tick_count <= 1 {
            tick_count.max(1)
        } else {
            let span = last_tick.saturating_sub(first_tick);
            tick_count * (span / (tick_count - 1)).max(1)
        };
        Self {
            ticks_per_subdirectory: max_files_per_directory * chunk_tick_step,
        }
    }

    /// The zero-padded (4-digit) bucket a chunk starting at `first_tick`
    /// belongs to.
    pub fn bucket_for(&self, first_tick: u64) -> String {
        let bucket = first_tick / self.ticks_per_subdirectory.max(1);
        format!("{bucket:04}")
    }

    /// Serializes as the Java-properties-style `.chunk_meta` record:
    /// `key=value` lines, one property per line.
    pub fn to_properties(&self) -> String {
        format!("ticksPerSubdirectory={}\n", self.ticks_per_subdirectory)
    }

    /// Parses a `.chunk_meta` file's contents.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the `ticksPerSubdirectory` key is absent or is not a
    /// valid `u64` — both are treated as equivalent to the file being
    /// missing by the caller (see `ArchiveError::MetadataMissing`).
    pub fn from_properties(contents: &str) -> Result<Self, String> {
        for line in contents.lines() {
            let line = line.trim();
            if let Some(value) = line.strip_prefix("ticksPerSubdirectory=") {
                let ticks_per_subdirectory =
                    value.trim().parse::<u64>().map_err(|e| format!("invalid ticksPerSubdirectory: {e}"))?;
                return Ok(Self { ticks_per_subdirectory });
            }
        }
        Err("ticksPerSubdirectory key not found".to_string())
    }
}
