// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Orchestrates the domain's repository ports without itself touching a
//! database connection or the filesystem: the streaming write session (C6)
//! and the ingest writer façade (C9) that producers actually call.

pub mod ingest_writer;
pub mod write_session;
