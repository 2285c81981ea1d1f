// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Archive Error System
//!
//! A single, hierarchical error type for the tick archive domain. Every
//! fallible domain and infrastructure operation returns `Result<T,
//! ArchiveError>`, so callers have exactly one error type to match on at the
//! crate boundary.
//!
//! ## Error Categories
//!
//! - **Lookup failures**: [`ArchiveError::TickNotFound`] — no chunk or
//!   organism row covers the requested tick.
//! - **Decode failures**: [`ArchiveError::DecodeError`] — corrupt wire bytes,
//!   truncated stream, or nested sub-message overflow.
//! - **Infrastructure failures**: [`ArchiveError::IoError`] — filesystem or
//!   relational-driver faults (sqlx errors are stringified into this
//!   variant rather than kept as a boxed source, since no caller in this
//!   crate downcasts past the message).
//! - **Write-path failures**: [`ArchiveError::WriteError`] — the transient
//!   reclassification of a failed batch write; never stops the session.
//! - **Run metadata**: [`ArchiveError::MetadataMissing`] — `.chunk_meta`
//!   absent for a legacy run namespace.
//! - **Programming bugs**: [`ArchiveError::IndexInvariantViolated`] — two
//!   chunks overlap; this must never happen and is fatal when it does.
//! - **Shutdown**: [`ArchiveError::ShutdownForced`] — the coordinator
//!   interrupted a session that did not exit within its grace window.

use thiserror::Error;

/// The reason a [`ArchiveError::DecodeError`] occurred.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The stream ended before the expected value was fully read.
    #[error("truncated stream")]
    Truncated,
    /// A tag byte did not encode a known wire type.
    #[error("invalid tag")]
    InvalidTag,
    /// A nested length-delimited field read past its own sub-stream limit.
    #[error("nested sub-message overflow")]
    NestedOverflow,
}

/// Domain-wide error type for the tick archive storage engine.
///
/// Variants carry enough context to log and to decide retry policy without
/// downcasting.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No chunk (or organism row) covers the requested tick.
    #[error("tick {tick} not found")]
    TickNotFound {
        /// The tick number that was requested.
        tick: u64,
    },

    /// Corrupt wire bytes, a truncated stream, or a nested-limit overflow.
    #[error("decode error: {kind}")]
    DecodeError {
        /// The specific decode failure.
        kind: DecodeErrorKind,
    },

    /// A filesystem or relational-driver fault surfaced to a reader.
    #[error("io error: {0}")]
    IoError(String),

    /// A write-path fault, reclassified as transient so the session can
    /// continue accepting new ticks after a reset.
    #[error("write error: {0}")]
    WriteError(String),

    /// `.chunk_meta` is absent for a run namespace (legacy run).
    #[error("run metadata missing for namespace {namespace}")]
    MetadataMissing {
        /// The run namespace whose `.chunk_meta` could not be found.
        namespace: String,
    },

    /// Two persisted chunks overlap in `[first_tick, last_tick]`. This is a
    /// programming bug in the writer, never an operator-recoverable
    /// condition.
    #[error("index invariant violated: chunks [{a_first}, {a_last}] and [{b_first}, {b_last}] overlap")]
    IndexInvariantViolated {
        a_first: u64,
        a_last: u64,
        b_first: u64,
        b_last: u64,
    },

    /// The shutdown coordinator forced an interrupt on a session that did
    /// not exit `PROCESSING` within its grace window. The session is now in
    /// a terminal error state; further operations must refuse with this
    /// kind.
    #[error("session shutdown forced after grace period")]
    ShutdownForced,
}

impl ArchiveError {
    pub fn tick_not_found(tick: u64) -> Self {
        Self::TickNotFound { tick }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    pub fn write_error(msg: impl Into<String>) -> Self {
        Self::WriteError(msg.into())
    }

    /// Errors that indicate a transient condition a caller may retry after
    /// resetting streaming state.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::IoError(_) | Self::WriteError(_))
    }

    /// Programming-bug errors that must never be swallowed.
    pub fn is_fatal_invariant(&self) -> bool {
        matches!(self, Self::IndexInvariantViolated { .. })
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
