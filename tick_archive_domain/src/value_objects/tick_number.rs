// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The primary key across every archive: a monotonically increasing,
//! non-negative 64-bit tick number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single sampled simulation time point.
///
/// Ticks are produced at a fixed sampling interval (`>= 1`); the archive only
/// stores sampled ticks but preserves their original numbering, so gaps
/// between consecutive stored ticks are expected and meaningful (they encode
/// the sampling interval), not corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TickNumber(pub u64);

impl TickNumber {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TickNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<TickNumber> for u64 {
    fn from(value: TickNumber) -> Self {
        value.0
    }
}
