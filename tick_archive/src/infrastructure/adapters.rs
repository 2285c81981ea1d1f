// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Concrete, SQLite- and filesystem-backed implementations of the domain's
//! repository ports.

pub mod chunk_meta_store_fs;
pub mod chunk_store_sqlite;
pub mod organism_archive_row_per_organism;
pub mod organism_archive_single_blob;
