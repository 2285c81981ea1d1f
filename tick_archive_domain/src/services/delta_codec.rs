// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Delta Codec (C3)
//!
//! Builds a [`TickDataChunk`] out of a run of sampled ticks by diffing each
//! tick against the previously reconstructed state, and replays a chunk's
//! delta chain back into any covered tick.

use crate::value_objects::{CellGrid, DeltaType, TickData, TickDataChunk, TickDelta};
use crate::ArchiveError;

/// Once a sparse delta's changed-cell count reaches this fraction of the
/// anchor snapshot's cell count, emitting a `Full` delta is cheaper to
/// decode later than chaining another sparse diff — the sparse
/// representation stops paying for itself.
const FULL_DELTA_THRESHOLD: f64 = 0.8;

/// Builds a chunk from a non-empty run of sampled ticks. The first tick
/// becomes the chunk's anchor snapshot; each subsequent tick is diffed
/// against the immediately preceding *reconstructed* tick (not the anchor),
/// so a long run of sparse deltas still only ever carries what changed since
/// the last sample.
///
/// # Errors
///
/// Returns [`ArchiveError::WriteError`] if `sampled_ticks` is empty — there
/// is no anchor to build a chunk around.
pub fn encode_chunk(sampled_ticks: &[TickData]) -> Result<TickDataChunk, ArchiveError> {
    let (snapshot, rest) = sampled_ticks
        .split_first()
        .ok_or_else(|| ArchiveError::write_error("cannot encode a chunk from zero sampled ticks"))?;

    let mut deltas = Vec::with_capacity(rest.len());
    let mut previous = snapshot.clone();
    for tick in rest {
        let diff = tick.cell_grid.diff_against(&previous.cell_grid);
        let (delta_type, changed_cells) = if is_nearly_full(&diff, &snapshot.cell_grid) {
            (DeltaType::Full, tick.cell_grid.clone())
        } else {
            (DeltaType::Sparse, diff)
        };
        deltas.push(TickDelta {
            tick_number: tick.tick_number,
            capture_time_ms: tick.capture_time_ms,
            delta_type,
            changed_cells,
            organisms: tick.organisms.clone(),
            total_organisms_created: tick.total_organisms_created,
            total_unique_genomes: tick.total_unique_genomes,
        });
        previous = tick.clone();
    }

    let chunk = TickDataChunk {
        first_tick: snapshot.tick_number,
        last_tick: rest.last().map(|t| t.tick_number).unwrap_or(snapshot.tick_number),
        tick_count: sampled_ticks.len() as u32,
        snapshot: snapshot.clone(),
        deltas,
    };
    chunk.validate().map_err(ArchiveError::write_error)?;
    Ok(chunk)
}

/// A diff that touches most of the anchor's cells is no cheaper to store
/// sparsely than storing the whole grid, and costs an extra merge on replay.
fn is_nearly_full(diff: &CellGrid, anchor: &CellGrid) -> bool {
    if anchor.is_empty() {
        return false;
    }
    diff.len() as f64 >= anchor.len() as f64 * FULL_DELTA_THRESHOLD
}

/// Reconstructs the tick at `tick_number` within `chunk` by replaying
/// `snapshot ⊕ delta₁ ⊕ … ⊕ delta_t`. Thin wrapper over
/// [`TickDataChunk::decompress_tick`] kept at the service layer so callers
/// that only know about services (not value-object methods) have a single
/// entry point to call.
pub fn decompress_tick(chunk: &TickDataChunk, tick_number: u64) -> Result<TickData, ArchiveError> {
    chunk.decompress_tick(tick_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::molecule::{Molecule, MoleculeTag};

    fn grid(pairs: &[(u64, i32)]) -> CellGrid {
        let (idx, val): (Vec<_>, Vec<_>) = pairs.iter().copied().unzip();
        CellGrid::from_sorted(idx, val)
    }

    fn tick(n: u64, grid: CellGrid) -> TickData {
        TickData {
            tick_number: n,
            capture_time_ms: n as i64 * 100,
            cell_grid: grid,
            organisms: Vec::new(),
            total_organisms_created: 0,
            total_unique_genomes: 0,
        }
    }

    #[test]
    fn encode_chunk_emits_sparse_deltas_for_small_changes() {
        let m = |v| Molecule::new(MoleculeTag::Code, v).pack();
        let ticks = vec![
            tick(0, grid(&[(0, m(1)), (1, m(2)), (2, m(3)), (3, m(4))])),
            tick(1, grid(&[(0, m(1)), (1, m(9)), (2, m(3)), (3, m(4))])),
            tick(2, grid(&[(0, m(1)), (1, m(9)), (2, m(3)), (3, m(7))])),
        ];
        let chunk = encode_chunk(&ticks).unwrap();
        assert_eq!(chunk.first_tick, 0);
        assert_eq!(chunk.last_tick, 2);
        assert_eq!(chunk.tick_count, 3);
        assert_eq!(chunk.deltas[0].delta_type, DeltaType::Sparse);
        assert_eq!(chunk.deltas[0].changed_cells.len(), 1);
        assert_eq!(chunk.deltas[1].changed_cells.len(), 1);
    }

    #[test]
    fn encode_chunk_falls_back_to_full_delta_when_diff_is_large() {
        let m = |v| Molecule::new(MoleculeTag::Code, v).pack();
        let anchor = grid(&[(0, m(1)), (1, m(2)), (2, m(3)), (3, m(4))]);
        let mostly_changed = grid(&[(0, m(9)), (1, m(9)), (2, m(9)), (3, m(4))]);
        let ticks = vec![tick(0, anchor), tick(1, mostly_changed.clone())];
        let chunk = encode_chunk(&ticks).unwrap();
        assert_eq!(chunk.deltas[0].delta_type, DeltaType::Full);
        assert_eq!(chunk.deltas[0].changed_cells, mostly_changed);
    }

    #[test]
    fn round_trips_every_tick_in_chunk() {
        let m = |v| Molecule::new(MoleculeTag::Code, v).pack();
        let ticks = vec![
            tick(10, grid(&[(0, m(1))])),
            tick(11, grid(&[(0, m(2))])),
            tick(12, grid(&[(0, m(3))])),
        ];
        let chunk = encode_chunk(&ticks).unwrap();
        for (i, original) in ticks.iter().enumerate() {
            let reconstructed = decompress_tick(&chunk, 10 + i as u64).unwrap();
            assert_eq!(reconstructed.cell_grid, original.cell_grid);
        }
    }

    #[test]
    fn encode_chunk_rejects_empty_input() {
        assert!(encode_chunk(&[]).is_err());
    }

    #[test]
    fn single_tick_chunk_has_no_deltas() {
        let m = Molecule::new(MoleculeTag::Code, 5).pack();
        let chunk = encode_chunk(&[tick(0, grid(&[(0, m)]))]).unwrap();
        assert!(chunk.deltas.is_empty());
        assert_eq!(chunk.first_tick, chunk.last_tick);
    }
}
