// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Repository Ports
//!
//! Async traits the infrastructure layer implements against SQLite and the
//! filesystem. The domain crate defines only the contracts; no `sqlx` or
//! runtime dependency lives here.

pub mod chunk_meta_store;
pub mod chunk_store;
pub mod organism_archive;

pub use chunk_meta_store::ChunkMetaStore;
pub use chunk_store::EnvironmentChunkStore;
pub use organism_archive::OrganismArchive;
