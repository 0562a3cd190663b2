// src/watcher/dwell.rs
//
// Dwell-time strategy: a presence older than the threshold is a
// violation. The presence record is deleted before the violation is
// recorded, so a crash between the two can lose a notification but can
// never double-record the same presence.

use crate::error::StoreError;
use crate::recorder::{ViolationFacts, ViolationRecorder};
use crate::store::PresenceStore;
use crate::timefmt::{self, ExitTime};
use crate::types::DwellConfig;
use crate::watcher::{CycleReport, ViolationTrigger};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct DwellWatcher {
    presences: Arc<dyn PresenceStore>,
    recorder: Arc<ViolationRecorder>,
    threshold: ChronoDuration,
    period: Duration,
}

impl DwellWatcher {
    pub fn new(
        presences: Arc<dyn PresenceStore>,
        recorder: Arc<ViolationRecorder>,
        config: &DwellConfig,
    ) -> Self {
        Self {
            presences,
            recorder,
            threshold: ChronoDuration::seconds(config.threshold_secs as i64),
            period: Duration::from_secs(config.period_secs),
        }
    }

    /// One pass over every active presence, judged against `now`.
    pub async fn sweep(&self, now: DateTime<FixedOffset>) -> Result<CycleReport, StoreError> {
        let mut report = CycleReport::default();
        for (doc_id, presence) in self.presences.list_presences().await? {
            report.scanned += 1;

            let entry = match timefmt::parse_wire(&presence.entry_timestamp) {
                Ok(entry) => entry,
                Err(err) => {
                    // One bad record never aborts the cycle.
                    warn!(
                        "presence for {} in {} skipped: {err}",
                        presence.vehicle_plate, presence.zone_name
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            if entry > now {
                // Clock skew or a malformed future entry; leave it be.
                debug!(
                    "presence for {} has future entry {}, ignoring",
                    presence.vehicle_plate, presence.entry_timestamp
                );
                continue;
            }

            if now - entry <= self.threshold {
                continue;
            }

            // Judged: the presence goes away first, then the violation
            // is recorded with no observed exit.
            self.presences.delete_presence(&doc_id).await?;
            self.recorder
                .record(ViolationFacts {
                    zone_name: presence.zone_name,
                    vehicle_plate: presence.vehicle_plate,
                    entry_timestamp: presence.entry_timestamp,
                    exit_timestamp: ExitTime::StillActive,
                    contact_address: None,
                })
                .await?;
            report.violations += 1;
        }
        Ok(report)
    }
}

#[async_trait]
impl ViolationTrigger for DwellWatcher {
    fn name(&self) -> &'static str {
        "dwell"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        self.sweep(timefmt::now_ist()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::notifier::Notifier;
    use crate::store::MemoryStore;
    use crate::types::ActivePresence;

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(&self, _address: &str, _body: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn watcher_over(store: Arc<MemoryStore>) -> DwellWatcher {
        let recorder = Arc::new(ViolationRecorder::new(
            store.clone(),
            store.clone(),
            Arc::new(SilentNotifier),
        ));
        DwellWatcher::new(store, recorder, &DwellConfig::default())
    }

    fn presence(entry: &str) -> ActivePresence {
        ActivePresence {
            zone_name: "MallLot".to_string(),
            vehicle_plate: "KA01AB1234".to_string(),
            entry_timestamp: entry.to_string(),
            latitude: None,
            longitude: None,
        }
    }

    #[tokio::test]
    async fn test_overstayed_presence_becomes_violation() {
        let store = Arc::new(MemoryStore::new());
        store.insert_presence(presence("2024-01-01 10:00 AM")).await;
        let watcher = watcher_over(store.clone());

        // 3 minutes elapsed against a 2 minute threshold.
        let now = timefmt::parse_wire("2024-01-01 10:03 AM").unwrap();
        let report = watcher.sweep(now).await.unwrap();

        assert_eq!(report.violations, 1);
        assert_eq!(store.presence_count().await, 0);
        let violations = store.violations().await;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entry_timestamp, "2024-01-01 10:00 AM");
        assert_eq!(violations[0].exit_timestamp, ExitTime::StillActive);
        assert_eq!(violations[0].zone_name, "MallLot");
    }

    #[tokio::test]
    async fn test_short_dwell_leaves_presence_alone() {
        let store = Arc::new(MemoryStore::new());
        store.insert_presence(presence("2024-01-01 10:00 AM")).await;
        let watcher = watcher_over(store.clone());

        // Only 1 minute elapsed.
        let now = timefmt::parse_wire("2024-01-01 10:01 AM").unwrap();
        let report = watcher.sweep(now).await.unwrap();

        assert_eq!(report.violations, 0);
        assert_eq!(store.presence_count().await, 1);
        assert!(store.violations().await.is_empty());
    }

    #[tokio::test]
    async fn test_future_entry_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.insert_presence(presence("2024-01-01 11:00 AM")).await;
        let watcher = watcher_over(store.clone());

        let now = timefmt::parse_wire("2024-01-01 10:00 AM").unwrap();
        let report = watcher.sweep(now).await.unwrap();

        assert_eq!(report.violations, 0);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.presence_count().await, 1);
        assert!(store.violations().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_timestamp_skips_only_that_record() {
        let store = Arc::new(MemoryStore::new());
        store.insert_presence(presence("not a timestamp")).await;
        store.insert_presence(presence("2024-01-01 10:00 AM")).await;
        let watcher = watcher_over(store.clone());

        let now = timefmt::parse_wire("2024-01-01 10:10 AM").unwrap();
        let report = watcher.sweep(now).await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.violations, 1);
        // The malformed record stays for a later fix; the judged one is gone.
        assert_eq!(store.presence_count().await, 1);
    }

    #[tokio::test]
    async fn test_judged_presence_is_not_judged_twice() {
        let store = Arc::new(MemoryStore::new());
        store.insert_presence(presence("2024-01-01 10:00 AM")).await;
        let watcher = watcher_over(store.clone());

        let now = timefmt::parse_wire("2024-01-01 10:05 AM").unwrap();
        watcher.sweep(now).await.unwrap();
        let second = watcher.sweep(now).await.unwrap();

        assert_eq!(second.scanned, 0);
        assert_eq!(store.violations().await.len(), 1);
    }
}
