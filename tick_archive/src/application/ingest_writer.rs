// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Ingest Writer Wrapper (C9)
//!
//! A thin façade producers talk to: it hides the [`WriteSession`] state
//! machine behind four calls, guards table creation exactly once per
//! instance, and classifies every failure as transient (error-counted,
//! swallowed) or fatal (rethrown), per the error taxonomy in
//! `tick_archive_domain::ArchiveError`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tick_archive_domain::value_objects::OrganismState;
use tick_archive_domain::ArchiveError;
use tracing::warn;

use crate::application::write_session::WriteSession;
use crate::infrastructure::metrics::{ArchiveMetrics, MetricsSnapshot};

/// Producer-facing wrapper over a [`WriteSession`] and an [`ArchiveMetrics`]
/// instance.
///
/// `create_organism_tables` uses a double-checked guard: an `AtomicBool`
/// fast path avoids the `tokio::sync::Mutex` entirely once tables are known
/// to exist, and the mutex itself re-checks the flag after acquiring it so
/// two producers racing on first use only issue one `CREATE TABLE IF NOT
/// EXISTS` round-trip between them (the second racer's acquire simply finds
/// the flag already set).
pub struct IngestWriter {
    session: WriteSession,
    metrics: Arc<ArchiveMetrics>,
    tables_created: AtomicBool,
    create_guard: tokio::sync::Mutex<()>,
}

impl IngestWriter {
    pub fn new(session: WriteSession, metrics: Arc<ArchiveMetrics>) -> Self {
        Self {
            session,
            metrics,
            tables_created: AtomicBool::new(false),
            create_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Idempotently ensures the organism archive's backing tables exist.
    pub async fn create_organism_tables(&self) -> Result<(), ArchiveError> {
        if self.tables_created.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = self.create_guard.lock().await;
        if self.tables_created.load(Ordering::Acquire) {
            return Ok(());
        }
        self.session.organism_archive().create_tables().await?;
        self.tables_created.store(true, Ordering::Release);
        Ok(())
    }

    /// Stages one organism's tick state. Transient failures are logged and
    /// error-counted rather than propagated, so a producer's ingest loop
    /// does not have to special-case retryable faults; fatal invariant
    /// violations are always rethrown.
    pub async fn write_organism_tick(&self, organism: &OrganismState) -> Result<(), ArchiveError> {
        let start = Instant::now();
        match self.session.add_organism_tick(organism).await {
            Ok(()) => {
                self.metrics.record_organism_write(start.elapsed());
                Ok(())
            }
            Err(e) if e.is_fatal_invariant() => Err(e),
            Err(e) if e.is_transient() => {
                self.metrics.record_write_error();
                warn!(error = %e, organism_id = organism.organism_id, "transient organism write error");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Executes the current commit window's batched writes.
    pub async fn commit_organism_writes(&self) -> Result<(), ArchiveError> {
        match self.session.commit().await {
            Ok(()) => {
                self.metrics.record_batch();
                Ok(())
            }
            Err(e) if e.is_fatal_invariant() => Err(e),
            Err(e) if e.is_transient() => {
                self.metrics.record_write_error();
                warn!(error = %e, "transient commit error");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Discards the current commit window. Producers call this after a
    /// non-transient commit error to reopen the session cleanly.
    pub async fn reset(&self) -> Result<(), ArchiveError> {
        self.session.reset().await
    }

    /// Point-in-time counters and sliding-window throughput/latency figures.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn session(&self) -> &WriteSession {
        &self.session
    }
}
