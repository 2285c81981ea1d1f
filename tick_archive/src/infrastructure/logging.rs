// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logging
//!
//! Initializes `tracing` with an env-filter subscriber. Every write/read span
//! on the chunk store and organism archive carries `first_tick`/`last_tick`/
//! `run_namespace`/`tick_number` fields (A3), set via `#[tracing::instrument]`
//! at the call sites in `infrastructure::adapters`.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber. Reads `RUST_LOG` for filter
/// directives, defaulting to `info` when unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed — callers
/// should invoke this exactly once, at process start.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}

/// Like [`init_logging`] but returns `Err` instead of panicking if a
/// subscriber is already installed, so tests can call it from multiple
/// threads without aborting the test binary.
pub fn try_init_logging() -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| e.to_string())
}
