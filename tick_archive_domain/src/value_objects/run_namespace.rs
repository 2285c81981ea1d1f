// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! A per-simulation directory name and relational schema name, derived from a
//! timestamped run identifier. Every chunk, organism row, and `.chunk_meta`
//! file is keyed off exactly one run namespace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype around a run-scoped namespace string.
///
/// Kept as a validated newtype (rather than a bare `String`) because it is
/// used directly as a filesystem path segment: it must not contain path
/// separators or be empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunNamespace(String);

impl RunNamespace {
    /// Validates and wraps a run namespace string.
    ///
    /// # Errors
    ///
    /// Rejects empty namespaces and namespaces containing `/` or `\\`, since
    /// the namespace becomes a single filesystem path component under
    /// `chunk_directory`.
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("run namespace must not be empty".to_string());
        }
        if value.contains('/') || value.contains('\\') {
            return Err(format!("run namespace {value:?} must not contain path separators"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
