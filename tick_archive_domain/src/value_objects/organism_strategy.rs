// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

/// Which physical layout the organism archive (C5) uses for per-tick state.
///
/// Configuration picks the variant once, at construction; both variants
/// implement the same [`crate::repositories::OrganismArchive`] trait, so
/// callers never branch on strategy themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganismStrategy {
    /// One row per `(tick_number, organism_id)`, with hot columns extracted
    /// for fast single-organism queries.
    RowPerOrganism,
    /// One row per `tick_number`, with all organisms serialized into a
    /// single compressed blob.
    SingleBlobPerTick,
}
