// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::value_objects::{CellGrid, DeltaType, OrganismState};
use serde::{Deserialize, Serialize};

/// One fully-materialized sampled tick.
///
/// The anchor (`first_tick`) record of every [`crate::value_objects::TickDataChunk`]
/// is always a `TickData` with an empty implicit delta history — it is
/// self-sufficient for reconstruction. `decompress_tick` also produces a
/// `TickData` for any other tick in a chunk, after replaying its delta chain
/// on top of the anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickData {
    pub tick_number: u64,
    pub capture_time_ms: i64,
    pub cell_grid: CellGrid,
    pub organisms: Vec<OrganismState>,
    pub total_organisms_created: u64,
    pub total_unique_genomes: u64,
}

/// A sparse (or, rarely, full) tick reconstructed against an anchor
/// snapshot within the same chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickDelta {
    pub tick_number: u64,
    pub capture_time_ms: i64,
    pub delta_type: DeltaType,
    pub changed_cells: CellGrid,
    pub organisms: Vec<OrganismState>,
    pub total_organisms_created: u64,
    pub total_unique_genomes: u64,
}

impl TickDelta {
    /// Replays this delta on top of a previously reconstructed tick,
    /// producing the next reconstructed [`TickData`]. For a `Full` delta,
    /// `changed_cells` already holds the complete grid, so `apply_changes`
    /// degenerates into a full replacement — `CellGrid::apply_changes`
    /// handles both forms identically.
    pub fn apply_to(&self, previous: &TickData) -> TickData {
        TickData {
            tick_number: self.tick_number,
            capture_time_ms: self.capture_time_ms,
            cell_grid: previous.cell_grid.apply_changes(&self.changed_cells),
            organisms: self.organisms.clone(),
            total_organisms_created: self.total_organisms_created,
            total_unique_genomes: self.total_unique_genomes,
        }
    }
}
