// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Schema management shared by the repository adapters under
//! `infrastructure::adapters`.

pub mod schema;
