// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-tick columnar snapshot of the simulated environment.

use crate::value_objects::molecule::Molecule;
use serde::{Deserialize, Serialize};

/// A dense, columnar view of environment cells at one tick.
///
/// `flat_indices` is the row-major linearization of an N-dimensional grid;
/// `molecule_data` is the packed 32-bit integer for the cell at the
/// corresponding index. Both columns always have identical length, and
/// indices are strictly ascending — callers that build a `CellGrid` by hand
/// (rather than through [`CellGrid::from_sorted`]) must uphold this
/// themselves; [`CellGrid::validate`] checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CellGrid {
    flat_indices: Vec<u64>,
    molecule_data: Vec<i32>,
}

impl CellGrid {
    /// Builds a grid from already-sorted, deduplicated columns without
    /// re-validating them. Use [`CellGrid::validate`] afterward if the
    /// columns did not originate from a trusted source (e.g. wire decode).
    pub fn from_sorted(flat_indices: Vec<u64>, molecule_data: Vec<i32>) -> Self {
        Self {
            flat_indices,
            molecule_data,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flat_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat_indices.is_empty()
    }

    pub fn flat_indices(&self) -> &[u64] {
        &self.flat_indices
    }

    pub fn molecule_data(&self) -> &[i32] {
        &self.molecule_data
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, i32)> + '_ {
        self.flat_indices.iter().copied().zip(self.molecule_data.iter().copied())
    }

    /// Checks the two core invariants: equal column length and strictly
    /// ascending indices.
    pub fn validate(&self) -> Result<(), String> {
        if self.flat_indices.len() != self.molecule_data.len() {
            return Err(format!(
                "cell grid column length mismatch: {} indices vs {} values",
                self.flat_indices.len(),
                self.molecule_data.len()
            ));
        }
        if !self.flat_indices.windows(2).all(|w| w[0] < w[1]) {
            return Err("cell grid indices are not strictly ascending".to_string());
        }
        Ok(())
    }

    /// Returns the decoded molecule at a given flat index, if present.
    pub fn get(&self, flat_index: u64) -> Option<Molecule> {
        let pos = self.flat_indices.binary_search(&flat_index).ok()?;
        Molecule::unpack(self.molecule_data[pos])
    }

    /// Applies a sparse set of changed cells on top of `self`, returning the
    /// merged grid. Cells present in `changes` override the corresponding
    /// cell in `self`; cells absent from `changes` are carried forward
    /// unchanged. Used by the delta codec to replay `snapshot ⊕ delta`.
    pub fn apply_changes(&self, changes: &CellGrid) -> CellGrid {
        if changes.is_empty() {
            return self.clone();
        }
        let mut merged: std::collections::BTreeMap<u64, i32> =
            self.flat_indices.iter().copied().zip(self.molecule_data.iter().copied()).collect();
        for (idx, value) in changes.iter() {
            merged.insert(idx, value);
        }
        let (flat_indices, molecule_data) = merged.into_iter().unzip();
        CellGrid::from_sorted(flat_indices, molecule_data)
    }

    /// Computes the sparse set-difference of `self` (the new state) against
    /// `previous` (the last reconstructed state): cells whose value changed,
    /// or that are new in `self`. Cells that only existed in `previous` and
    /// no longer exist in `self` are represented in the evochora cell model
    /// as a cell returning to its default (tag `CODE`, value `0`) molecule,
    /// so a vanished cell shows up here as a changed cell, never a removal.
    pub fn diff_against(&self, previous: &CellGrid) -> CellGrid {
        let previous_map: std::collections::HashMap<u64, i32> =
            previous.flat_indices.iter().copied().zip(previous.molecule_data.iter().copied()).collect();
        let mut changed_indices = Vec::new();
        let mut changed_values = Vec::new();
        for (idx, value) in self.iter() {
            if previous_map.get(&idx) != Some(&value) {
                changed_indices.push(idx);
                changed_values.push(value);
            }
        }
        CellGrid::from_sorted(changed_indices, changed_values)
    }

    /// Serializes the two columns as a dense byte string: an 8-byte
    /// little-endian cell count, then that many 8-byte indices, then that
    /// many 4-byte molecule values. This is the payload the wire partial
    /// decoder (C2) stores behind the `cell_columns`/`changed_cells` field.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.flat_indices.len() * 12);
        out.extend_from_slice(&(self.flat_indices.len() as u64).to_le_bytes());
        for idx in &self.flat_indices {
            out.extend_from_slice(&idx.to_le_bytes());
        }
        for value in &self.molecule_data {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Inverse of [`CellGrid::to_wire_bytes`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if `bytes` is too short for its own declared count.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < 8 {
            return Err("cell grid wire payload shorter than its length prefix".to_string());
        }
        let count = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
        let indices_end = 8 + count * 8;
        let values_end = indices_end + count * 4;
        if bytes.len() < values_end {
            return Err("cell grid wire payload truncated".to_string());
        }
        let flat_indices = bytes[8..indices_end]
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        let molecule_data = bytes[indices_end..values_end]
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(CellGrid::from_sorted(flat_indices, molecule_data))
    }
}
