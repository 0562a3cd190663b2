// src/watcher/mod.rs
//
// The two detection strategies behind one trigger interface. Each
// watcher is a timer-driven task: the driver arms an interval, runs one
// cycle per tick, and stops when the shutdown channel fires. A failed
// cycle is logged and retried on the next tick; it never kills the
// task.

pub mod containment;
pub mod dwell;

pub use containment::ContainmentWatcher;
pub use dwell::DwellWatcher;

use crate::error::StoreError;
use crate::metrics::WatcherMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Cycles between metrics summaries in the log.
const SUMMARY_EVERY_CYCLES: u64 = 60;

/// What one cycle did, for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    pub scanned: u64,
    pub violations: u64,
    pub skipped: u64,
}

#[async_trait]
pub trait ViolationTrigger: Send + Sync {
    fn name(&self) -> &'static str;

    fn period(&self) -> Duration;

    /// One full pass over the watched collections. A `StoreError`
    /// aborts the remaining work of this cycle only.
    async fn run_cycle(&self) -> Result<CycleReport, StoreError>;
}

/// Drive a trigger until shutdown. Re-arms the interval each tick;
/// ticks missed while a slow cycle runs are delayed, not bursted.
pub async fn run_watcher(
    trigger: Arc<dyn ViolationTrigger>,
    metrics: Arc<WatcherMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(trigger.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "{} watcher started (period {:?})",
        trigger.name(),
        trigger.period()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match trigger.run_cycle().await {
                    Ok(report) => {
                        metrics.add(&metrics.records_scanned, report.scanned);
                        metrics.add(&metrics.violations_recorded, report.violations);
                        metrics.add(&metrics.parse_errors, report.skipped);
                        if report.violations > 0 {
                            debug!(
                                "{} cycle: {} scanned, {} violations, {} skipped",
                                trigger.name(), report.scanned, report.violations, report.skipped
                            );
                        }
                    }
                    Err(err) => {
                        metrics.inc(&metrics.store_errors);
                        error!("{} cycle aborted: {err}; retrying next tick", trigger.name());
                    }
                }
                metrics.inc(&metrics.cycles);
                let summary = metrics.summary();
                if summary.cycles % SUMMARY_EVERY_CYCLES == 0 {
                    info!(
                        "{} after {} cycles: {} scanned, {} violations, {} parse errors, {} store errors ({}s up)",
                        trigger.name(),
                        summary.cycles,
                        summary.records_scanned,
                        summary.violations_recorded,
                        summary.parse_errors,
                        summary.store_errors,
                        summary.uptime_secs,
                    );
                }
            }
            _ = shutdown.changed() => {
                info!("{} watcher shutting down", trigger.name());
                return;
            }
        }
    }
}
