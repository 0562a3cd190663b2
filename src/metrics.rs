// src/metrics.rs
//
// Watcher observability. Counters accumulate across cycles and are
// summarized to the log at a fixed cadence by the watcher driver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct WatcherMetrics {
    pub cycles: Arc<AtomicU64>,
    pub records_scanned: Arc<AtomicU64>,
    pub violations_recorded: Arc<AtomicU64>,
    pub parse_errors: Arc<AtomicU64>,
    pub store_errors: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl WatcherMetrics {
    pub fn new() -> Self {
        Self {
            cycles: Arc::new(AtomicU64::new(0)),
            records_scanned: Arc::new(AtomicU64::new(0)),
            violations_recorded: Arc::new(AtomicU64::new(0)),
            parse_errors: Arc::new(AtomicU64::new(0)),
            store_errors: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cycles: self.cycles.load(Ordering::Relaxed),
            records_scanned: self.records_scanned.load(Ordering::Relaxed),
            violations_recorded: self.violations_recorded.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for WatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSummary {
    pub cycles: u64,
    pub records_scanned: u64,
    pub violations_recorded: u64,
    pub parse_errors: u64,
    pub store_errors: u64,
    pub uptime_secs: u64,
}
