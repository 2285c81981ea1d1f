// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

/// Whether a [`crate::value_objects::TickDelta`] carries a sparse
/// cell-diff or a complete snapshot.
///
/// The delta codec (C3) emits `Full` instead of `Sparse` whenever the sparse
/// diff would approach the size of a full snapshot, trading a little disk
/// space for a cheaper decode at that tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaType {
    Full,
    Sparse,
}
