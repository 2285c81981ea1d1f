// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! One simulated agent's full state at a given tick.

use serde::{Deserialize, Serialize};

/// One register/stack/trace bundle that does not need to be queried by a
/// single-organism read hot path, but must round-trip exactly.
///
/// Stored compressed as `runtime_state_blob` by the organism archive (C5).
/// Carries exactly the fields named by the runtime-blob contract in §4.5:
/// death bookkeeping, the entropy/molecule-marker registers, register banks,
/// stacks, and the last-executed instruction trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeBlob {
    pub is_dead: bool,
    pub death_tick: Option<u64>,
    pub entropy_register: f64,
    pub molecule_marker_register: i32,
    pub register_banks: Vec<Vec<i64>>,
    pub stacks: Vec<Vec<i64>>,
    pub last_instruction_trace: Option<InstructionTrace>,
}

impl Default for RuntimeBlob {
    fn default() -> Self {
        Self {
            is_dead: false,
            death_tick: None,
            entropy_register: 0.0,
            molecule_marker_register: 0,
            register_banks: Vec::new(),
            stacks: Vec::new(),
            last_instruction_trace: None,
        }
    }
}

/// The last instruction an organism executed before this tick was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionTrace {
    pub opcode_id: u32,
    pub raw_arguments: Vec<i64>,
    pub energy_cost: i64,
    pub entropy_delta: f64,
    pub ip_before: Vec<i64>,
    pub dv_before: Vec<i64>,
    pub registers_before: Vec<i64>,
}

/// A data-pointer: a position vector plus the active-index bookkeeping lives
/// alongside it in [`OrganismState::active_dp_index`].
pub type DataPointer = Vec<i64>;

/// Full per-organism state at one tick.
///
/// Combines the hot columns that the row-per-organism strategy (C5 Strategy
/// A) extracts into dedicated table columns with the cold
/// [`RuntimeBlob`] that both strategies carry compressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismState {
    pub organism_id: u32,
    pub parent_id: Option<u32>,
    pub birth_tick: u64,
    pub program_id: String,
    pub initial_position: Vec<i64>,
    pub genome_hash: u64,

    pub tick_number: u64,
    pub energy: i64,
    pub ip: Vec<i64>,
    pub dv: Vec<i64>,
    pub data_pointers: Vec<DataPointer>,
    pub active_dp_index: u32,
    pub entropy: f64,
    pub molecule_marker: i32,

    pub runtime_blob: RuntimeBlob,
}

/// The projection returned by `read_organisms_at_tick` — deliberately does
/// not include the full runtime blob, since summary reads exist precisely to
/// avoid decompressing it for every organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismTickSummary {
    pub organism_id: u32,
    pub energy: i64,
    pub ip: Vec<i64>,
    pub dv: Vec<i64>,
    pub data_pointers: Vec<DataPointer>,
    pub active_dp_index: u32,
    pub parent_id: Option<u32>,
    pub birth_tick: u64,
    pub entropy: f64,
    pub genome_hash: u64,
    pub is_dead: bool,
    pub death_tick: Option<u64>,
}

impl OrganismState {
    /// Projects the full state down to the summary shape, discarding the
    /// runtime blob fields that the summary read path never needs.
    pub fn to_summary(&self) -> OrganismTickSummary {
        OrganismTickSummary {
            organism_id: self.organism_id,
            energy: self.energy,
            ip: self.ip.clone(),
            dv: self.dv.clone(),
            data_pointers: self.data_pointers.clone(),
            active_dp_index: self.active_dp_index,
            parent_id: self.parent_id,
            birth_tick: self.birth_tick,
            entropy: self.entropy,
            genome_hash: self.genome_hash,
            is_dead: self.runtime_blob.is_dead,
            death_tick: self.runtime_blob.death_tick,
        }
    }
}
