// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Archive Metrics (A4)
//!
//! `prometheus` counters for O(1) lifetime totals, plus an in-process
//! ring-buffer percentile estimator for the sliding-window throughput and
//! latency figures the ingest writer (C9) exposes.

use parking_lot::Mutex;
use prometheus::{IntCounter, Registry};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// One timestamped observation: an event count (ticks or batches) and a
/// latency, recorded at `at`.
#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    latency: Duration,
}

/// A fixed-duration sliding window of samples, used to compute throughput
/// (events / window width) and latency percentiles without retaining
/// unbounded history. Old samples are evicted lazily, on the next
/// observation or read, rather than by a background timer.
struct SlidingWindow {
    window: Duration,
    samples: VecDeque<Sample>,
}

impl SlidingWindow {
    fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(front) = self.samples.front() {
            if now.duration_since(front.at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, latency: Duration, now: Instant) {
        self.evict_expired(now);
        self.samples.push_back(Sample { at: now, latency });
    }

    fn rate_per_second(&mut self, now: Instant) -> f64 {
        self.evict_expired(now);
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.len() as f64 / self.window.as_secs_f64()
    }

    /// Linear-interpolation-free percentile: nearest-rank over the current
    /// window's latencies. `p` is in `[0.0, 1.0]`.
    fn percentile(&mut self, p: f64, now: Instant) -> Duration {
        self.evict_expired(now);
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let mut latencies: Vec<Duration> = self.samples.iter().map(|s| s.latency).collect();
        latencies.sort_unstable();
        let rank = ((latencies.len() as f64) * p).ceil() as usize;
        let idx = rank.saturating_sub(1).min(latencies.len() - 1);
        latencies[idx]
    }
}

/// A snapshot of the metrics the ingest writer (C9) exposes via
/// `get_metrics()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub organisms_written: u64,
    pub batches_written: u64,
    pub write_errors: u64,
    pub organisms_per_second: f64,
    pub batches_per_second: f64,
    pub organism_latency_p50: Duration,
    pub organism_latency_p95: Duration,
    pub organism_latency_p99: Duration,
}

/// Default width of the throughput/percentile sliding window.
pub const DEFAULT_METRICS_WINDOW: Duration = Duration::from_secs(5);

/// Thread-safe metrics for one ingest writer instance. Counters are
/// lock-free `prometheus::IntCounter`s; the sliding windows share one mutex
/// since they are always read and written together.
pub struct ArchiveMetrics {
    organisms_written: IntCounter,
    batches_written: IntCounter,
    write_errors: IntCounter,
    windows: Mutex<SlidingWindow>,
}

impl ArchiveMetrics {
    /// Registers this instance's counters with `registry` and returns it.
    /// Panics if a counter with the same name is already registered — call
    /// once per process per `registry`.
    pub fn new(registry: &Registry, window: Duration) -> Self {
        let organisms_written =
            IntCounter::new("tick_archive_organisms_written_total", "total organism rows written").unwrap();
        let batches_written =
            IntCounter::new("tick_archive_batches_written_total", "total commit batches executed").unwrap();
        let write_errors =
            IntCounter::new("tick_archive_write_errors_total", "total transient write errors observed").unwrap();
        registry.register(Box::new(organisms_written.clone())).ok();
        registry.register(Box::new(batches_written.clone())).ok();
        registry.register(Box::new(write_errors.clone())).ok();
        Self {
            organisms_written,
            batches_written,
            write_errors,
            windows: Mutex::new(SlidingWindow::new(window)),
        }
    }

    /// Records one organism write with its end-to-end latency.
    pub fn record_organism_write(&self, latency: Duration) {
        self.organisms_written.inc();
        self.windows.lock().record(latency, Instant::now());
    }

    /// Records one successful commit batch.
    pub fn record_batch(&self) {
        self.batches_written.inc();
    }

    /// Records one transient write error (see
    /// [`tick_archive_domain::ArchiveError::is_transient`]).
    pub fn record_write_error(&self) {
        self.write_errors.inc();
    }

    /// Produces a point-in-time snapshot of all counters and sliding-window
    /// derived figures.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        MetricsSnapshot {
            organisms_written: self.organisms_written.get(),
            batches_written: self.batches_written.get(),
            write_errors: self.write_errors.get(),
            organisms_per_second: windows.rate_per_second(now),
            batches_per_second: self.batches_written.get() as f64 / windows.window.as_secs_f64().max(1.0),
            organism_latency_p50: windows.percentile(0.50, now),
            organism_latency_p95: windows.percentile(0.95, now),
            organism_latency_p99: windows.percentile(0.99, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let registry = Registry::new();
        let metrics = ArchiveMetrics::new(&registry, Duration::from_secs(5));
        metrics.record_organism_write(Duration::from_millis(10));
        metrics.record_organism_write(Duration::from_millis(20));
        metrics.record_batch();
        metrics.record_write_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.organisms_written, 2);
        assert_eq!(snap.batches_written, 1);
        assert_eq!(snap.write_errors, 1);
    }

    #[test]
    fn percentiles_reflect_recorded_latencies() {
        let window = SlidingWindow::new(Duration::from_secs(60));
        let mut window = window;
        let now = Instant::now();
        for ms in [10, 20, 30, 40, 50, 60, 70, 80, 90, 100] {
            window.record(Duration::from_millis(ms), now);
        }
        assert_eq!(window.percentile(0.50, now), Duration::from_millis(50));
        assert_eq!(window.percentile(0.99, now), Duration::from_millis(100));
    }

    #[test]
    fn empty_window_reports_zero() {
        let mut window = SlidingWindow::new(Duration::from_secs(5));
        let now = Instant::now();
        assert_eq!(window.rate_per_second(now), 0.0);
        assert_eq!(window.percentile(0.5, now), Duration::ZERO);
    }
}
