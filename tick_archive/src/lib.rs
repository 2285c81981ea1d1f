// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Tick Archive
//!
//! A chunk-based environment archive with delta compression, filesystem-
//! backed blobs, and a streaming partial-decode reader, paired with a
//! pluggable per-tick organism-state archive and the streaming write
//! session that batches ticks under a single transaction.
//!
//! ## Architecture Overview
//!
//! The crate follows Clean Architecture and Domain-Driven Design
//! principles, split across two crates in this workspace:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer (this crate)              │
//! │  (Streaming write session, ingest writer façade)             │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Domain Layer (tick_archive_domain)              │
//! │  (Value objects, repository ports, codec/wire/delta services)│
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer (this crate)             │
//! │  (SQLite/filesystem adapters, config, logging, metrics)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Process wiring (CLI, signal handling, platform abstraction) lives in the
//! separate `tick-archive-bootstrap` crate, outside these layers.
//!
//! ## Core Components
//!
//! | Component | Module |
//! |-----------|--------|
//! | Compression codec registry | `tick_archive_domain::services::codec` |
//! | Wire partial decoder | `tick_archive_domain::services::wire` |
//! | Delta codec | `tick_archive_domain::services::delta_codec` |
//! | Environment chunk store | `infrastructure::adapters::chunk_store_sqlite` |
//! | Organism archive (both strategies) | `infrastructure::adapters::organism_archive_*` |
//! | Streaming write session | `application::write_session` |
//! | Subdirectory partitioner | `infrastructure::adapters::chunk_meta_store_fs` |
//! | Ingest writer wrapper | `application::ingest_writer` |
//!
//! ## Testing
//!
//! Unit tests live alongside their source in `#[cfg(test)]` modules;
//! cross-component scenarios live under `tests/`.

pub mod application;
pub mod infrastructure;

pub use tick_archive_domain::value_objects::{
    CellGrid, ChunkMetaRecord, OrganismState, OrganismStrategy, OrganismTickSummary, RunNamespace, TickData,
    TickDataChunk, TickDelta, TickNumber,
};
pub use tick_archive_domain::ArchiveError;
