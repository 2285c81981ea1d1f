// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use crate::value_objects::{TickData, TickDelta};
use crate::ArchiveError;
use serde::{Deserialize, Serialize};

/// One archive unit: a single anchor snapshot plus the deltas sampled after
/// it, up to `last_tick`.
///
/// Invariants (enforced by [`TickDataChunk::validate`], never by the
/// constructor alone — callers that build a chunk from wire bytes must
/// validate explicitly):
///
/// - `first_tick <= every_delta.tick_number <= last_tick`
/// - delta tick numbers are strictly ascending
/// - `tick_count == 1 + deltas.len()`
/// - the anchor snapshot's `tick_number == first_tick`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickDataChunk {
    pub first_tick: u64,
    pub last_tick: u64,
    pub tick_count: u32,
    pub snapshot: TickData,
    pub deltas: Vec<TickDelta>,
}

impl TickDataChunk {
    pub fn validate(&self) -> Result<(), String> {
        if self.snapshot.tick_number != self.first_tick {
            return Err(format!(
                "chunk snapshot tick {} does not match first_tick {}",
                self.snapshot.tick_number, self.first_tick
            ));
        }
        if self.tick_count as usize != 1 + self.deltas.len() {
            return Err(format!(
                "chunk tick_count {} does not match 1 + {} deltas",
                self.tick_count,
                self.deltas.len()
            ));
        }
        let mut previous_tick = self.first_tick;
        for delta in &self.deltas {
            if delta.tick_number <= previous_tick || delta.tick_number > self.last_tick {
                return Err(format!(
                    "delta tick {} out of range ({}, {}]",
                    delta.tick_number, previous_tick, self.last_tick
                ));
            }
            previous_tick = delta.tick_number;
        }
        if let Some(last) = self.deltas.last() {
            if last.tick_number != self.last_tick {
                return Err(format!(
                    "chunk last delta tick {} does not match last_tick {}",
                    last.tick_number, self.last_tick
                ));
            }
        } else if self.first_tick != self.last_tick {
            return Err("chunk has no deltas but first_tick != last_tick".to_string());
        }
        Ok(())
    }

    /// Whether this chunk covers the given tick.
    pub fn covers(&self, tick: u64) -> bool {
        self.first_tick <= tick && tick <= self.last_tick
    }

    /// Returns whether two chunks' tick ranges overlap — used by writers to
    /// assert the non-overlap invariant (§7 `IndexInvariantViolated`,
    /// §9 Open Question on disjointness) before ever trusting `LIMIT 1`
    /// semantics on the index.
    pub fn overlaps(&self, other: &TickDataChunk) -> bool {
        self.first_tick <= other.last_tick && other.first_tick <= self.last_tick
    }

    /// Reconstructs the [`TickData`] for any tick covered by this chunk by
    /// replaying `snapshot ⊕ delta₁ ⊕ … ⊕ delta_t`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::TickNotFound`] if `tick` is outside
    /// `[first_tick, last_tick]`.
    pub fn decompress_tick(&self, tick: u64) -> Result<TickData, ArchiveError> {
        if !self.covers(tick) {
            return Err(ArchiveError::tick_not_found(tick));
        }
        if tick == self.first_tick {
            return Ok(self.snapshot.clone());
        }
        let mut reconstructed = self.snapshot.clone();
        for delta in &self.deltas {
            reconstructed = delta.apply_to(&reconstructed);
            if delta.tick_number == tick {
                return Ok(reconstructed);
            }
        }
        Err(ArchiveError::tick_not_found(tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{CellGrid, DeltaType};

    fn tick(n: u64, grid: CellGrid) -> TickData {
        TickData {
            tick_number: n,
            capture_time_ms: n as i64 * 10,
            cell_grid: grid,
            organisms: Vec::new(),
            total_organisms_created: 0,
            total_unique_genomes: 0,
        }
    }

    fn delta(n: u64, changed: CellGrid) -> TickDelta {
        TickDelta {
            tick_number: n,
            capture_time_ms: n as i64 * 10,
            delta_type: DeltaType::Sparse,
            changed_cells: changed,
            organisms: Vec::new(),
            total_organisms_created: 0,
            total_unique_genomes: 0,
        }
    }

    #[test]
    fn validate_accepts_well_formed_chunk() {
        let snapshot = tick(10, CellGrid::from_sorted(vec![0], vec![1]));
        let d1 = delta(11, CellGrid::from_sorted(vec![0], vec![2]));
        let d2 = delta(12, CellGrid::from_sorted(vec![0], vec![3]));
        let chunk = TickDataChunk {
            first_tick: 10,
            last_tick: 12,
            tick_count: 3,
            snapshot,
            deltas: vec![d1, d2],
        };
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn decompress_tick_reconstructs_via_delta_chain() {
        let snapshot = tick(10, CellGrid::from_sorted(vec![0], vec![1]));
        let d1 = delta(11, CellGrid::from_sorted(vec![0], vec![2]));
        let d2 = delta(12, CellGrid::from_sorted(vec![0], vec![3]));
        let chunk = TickDataChunk {
            first_tick: 10,
            last_tick: 12,
            tick_count: 3,
            snapshot,
            deltas: vec![d1, d2],
        };
        assert_eq!(chunk.decompress_tick(10).unwrap().cell_grid.get(0).unwrap().value, 1);
        assert_eq!(chunk.decompress_tick(11).unwrap().cell_grid.get(0).unwrap().value, 2);
        assert_eq!(chunk.decompress_tick(12).unwrap().cell_grid.get(0).unwrap().value, 3);
    }

    #[test]
    fn decompress_tick_outside_range_fails() {
        let snapshot = tick(10, CellGrid::empty());
        let chunk = TickDataChunk {
            first_tick: 10,
            last_tick: 10,
            tick_count: 1,
            snapshot,
            deltas: vec![],
        };
        assert!(matches!(
            chunk.decompress_tick(9),
            Err(ArchiveError::TickNotFound { tick: 9 })
        ));
    }

    #[test]
    fn overlaps_detects_shared_range() {
        let a = TickDataChunk {
            first_tick: 0,
            last_tick: 9,
            tick_count: 1,
            snapshot: tick(0, CellGrid::empty()),
            deltas: vec![],
        };
        let b = TickDataChunk {
            first_tick: 9,
            last_tick: 19,
            tick_count: 1,
            snapshot: tick(9, CellGrid::empty()),
            deltas: vec![],
        };
        let c = TickDataChunk {
            first_tick: 10,
            last_tick: 19,
            tick_count: 1,
            snapshot: tick(10, CellGrid::empty()),
            deltas: vec![],
        };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
