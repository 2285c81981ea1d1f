// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Value Objects
//!
//! Immutable types with no identity of their own, compared by value:
//! `TickNumber`, `CellGrid`, `OrganismState`, `TickData`, `TickDelta`,
//! `TickDataChunk`, `ChunkMetaRecord`, `MoleculeTag`/`Molecule`,
//! `RunNamespace`, and `OrganismStrategy`.

pub mod cell_grid;
pub mod chunk_meta_record;
pub mod delta_type;
pub mod molecule;
pub mod organism_state;
pub mod organism_strategy;
pub mod run_namespace;
pub mod tick_data;
pub mod tick_data_chunk;
pub mod tick_number;

pub use cell_grid::CellGrid;
pub use chunk_meta_record::{ChunkMetaRecord, DEFAULT_MAX_FILES_PER_DIRECTORY};
pub use delta_type::DeltaType;
pub use molecule::{Molecule, MoleculeTag};
pub use organism_state::{DataPointer, InstructionTrace, OrganismState, OrganismTickSummary, RuntimeBlob};
pub use organism_strategy::OrganismStrategy;
pub use run_namespace::RunNamespace;
pub use tick_data::{TickData, TickDelta};
pub use tick_data_chunk::TickDataChunk;
pub use tick_number::TickNumber;
