// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete adapters for the domain's repository ports, plus the ambient
//! concerns every adapter depends on: configuration, logging, and metrics.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod repositories;
